use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::catalog::{files, models, tags};
use crate::error::{AppResult, OptionExt};
use crate::merge;
use crate::middleware::validation::sanitize_for_logging;
use crate::state::AppState;
use crate::types::{
    CandidateQuery, MergeOutcome, MergeRequest, Model, ModelDetail, PathUpdate, UpdatePathRequest,
};

const MAX_CANDIDATES: i64 = 20;

pub async fn get_model(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<Json<ModelDetail>> {
    let model = models::get(&state.db, id).await?.ok_or_not_found("model")?;
    let files = files::list_by_model(&state.db, id).await?;
    let tags = tags::list_for_model(&state.db, id).await?;
    Ok(Json(ModelDetail { model, files, tags }))
}

/// POST /api/models/{id}/merge: folds `source_id` into `id`.
pub async fn merge_model(
    State(state): State<AppState>,
    Path(target_id): Path<i64>,
    Json(req): Json<MergeRequest>,
) -> AppResult<Json<MergeOutcome>> {
    tracing::info!("Merge request: {} -> {}", req.source_id, target_id);
    match merge::merge_models(&state.db, &state.library_root(), target_id, req.source_id).await {
        Ok(outcome) => {
            state.metrics.inc_merges_completed();
            Ok(Json(outcome))
        }
        Err(e) => {
            state.metrics.inc_merges_failed();
            tracing::error!("Merge {} -> {} failed: {}", req.source_id, target_id, e);
            Err(e.into())
        }
    }
}

pub async fn merge_candidates(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(q): Query<CandidateQuery>,
) -> AppResult<Json<Vec<Model>>> {
    models::get(&state.db, id).await?.ok_or_not_found("model")?;
    let list = models::merge_candidates(&state.db, id, q.q.as_deref(), MAX_CANDIDATES).await?;
    Ok(Json(list))
}

/// PUT /api/models/{id}/path: moves the model folder; onto another model's path it merges.
pub async fn update_model_path(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdatePathRequest>,
) -> AppResult<Json<PathUpdate>> {
    tracing::info!("Path update for model {}: '{}'", id, sanitize_for_logging(&req.path));
    match merge::update_path(&state.db, &state.library_root(), id, &req.path).await {
        Ok(update) => {
            if matches!(update, PathUpdate::Merged { .. }) {
                state.metrics.inc_merges_completed();
            }
            Ok(Json(update))
        }
        Err(e) => {
            tracing::warn!("Path update for model {} failed: {}", id, e);
            Err(e.into())
        }
    }
}

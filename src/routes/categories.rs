use axum::{
    extract::{Path, State},
    Json,
};

use crate::catalog::categories;
use crate::error::{AppResult, OptionExt};
use crate::state::AppState;
use crate::types::Category;

pub async fn list_roots(State(state): State<AppState>) -> AppResult<Json<Vec<Category>>> {
    Ok(Json(categories::list_roots(&state.db).await?))
}

pub async fn list_children(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<Json<Vec<Category>>> {
    categories::get(&state.db, id).await?.ok_or_not_found("category")?;
    Ok(Json(categories::list_children(&state.db, id).await?))
}

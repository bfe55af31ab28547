//! HTTP route handlers for the Modellwald API.
//!
//! - `health`: health, readiness, metrics and version
//! - `scan`: trigger a scan, read or stream its status
//! - `models`: model detail, merge, merge candidates, path update
//! - `categories`: browse the category tree

pub mod categories;
pub mod health;
pub mod models;
pub mod scan;

use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::middleware::validation::{validate_request_middleware, MAX_BODY_SIZE};
use crate::state::AppState;

/// Builds the full router; used by main and by the API tests.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .route("/metrics", get(health::metrics))
        .route("/metrics/prometheus", get(health::metrics_prometheus))
        .route("/version", get(health::version))
        .route("/api/scan", post(scan::trigger_scan))
        .route("/api/scan/status", get(scan::scan_status))
        .route("/api/scan/events", get(scan::scan_events))
        .route("/api/models/{id}", get(models::get_model))
        .route("/api/models/{id}/merge", post(models::merge_model))
        .route("/api/models/{id}/merge-candidates", get(models::merge_candidates))
        .route("/api/models/{id}/path", put(models::update_model_path))
        .route("/api/categories", get(categories::list_roots))
        .route("/api/categories/{id}/children", get(categories::list_children))
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(from_fn(validate_request_middleware))
        .layer(TraceLayer::new_for_http())
}

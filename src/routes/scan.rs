use std::{convert::Infallible, time::Duration};

use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    Json,
};
use futures::Stream;
use tokio_stream::{wrappers::WatchStream, StreamExt};

use crate::state::AppState;
use crate::types::{ScanStatus, TriggerScanResponse};

/// POST /api/scan. Always 202; `started` is false if a pass was already running.
pub async fn trigger_scan(State(state): State<AppState>) -> impl IntoResponse {
    let started = state.scanner.trigger_scan();
    if started {
        tracing::info!("Scan triggered via API");
    }
    let status = state.scanner.status();
    (StatusCode::ACCEPTED, Json(TriggerScanResponse { started, status }))
}

pub async fn scan_status(State(state): State<AppState>) -> Json<ScanStatus> {
    Json(state.scanner.status())
}

/// GET /api/scan/events: the current status, then every change.
pub async fn scan_events(State(state): State<AppState>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = WatchStream::new(state.scanner.subscribe()).map(|status| {
        let data = serde_json::to_string(&status).unwrap_or_else(|_| "{}".to_string());
        Ok::<Event, Infallible>(Event::default().event("status").data(data))
    });
    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(10)).text("keep-alive"))
}

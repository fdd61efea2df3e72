// HTTP request handlers for server mode
//
// Health, readiness, status snapshot and manual archive trigger

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use metrics::counter;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::{AppError, AppState};

/// GET /health - Basic health check
pub(crate) async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "healthy"})))
}

/// GET /ready - Readiness check (sink reachable)
pub(crate) async fn ready_check(State(state): State<AppState>) -> impl IntoResponse {
    let status = state.service.get_status().await;
    if status.sink_connected {
        (
            StatusCode::OK,
            Json(json!({"status": "ready", "storage": "connected"})),
        )
    } else {
        let error = status.error.map(|e| e.message).unwrap_or_default();
        warn!("Storage readiness check failed: {}", error);
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"status": "not ready", "storage": "disconnected", "error": error})),
        )
    }
}

/// GET /status - Archive status snapshot
pub(crate) async fn status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.service.get_status().await)
}

#[derive(Debug, Deserialize)]
pub(crate) struct ArchiveParams {
    #[serde(default = "default_hours_back")]
    hours_back: i64,
}

fn default_hours_back() -> i64 {
    1
}

/// POST /archive?hours_back=N - Run one archive job now
pub(crate) async fn trigger_archive(
    State(state): State<AppState>,
    Query(params): Query<ArchiveParams>,
) -> Result<impl IntoResponse, AppError> {
    counter!("sensorvault.http.archive_requests", 1);
    let result = state.service.manual_trigger(params.hours_back).await?;

    info!(
        window = %result.window,
        state = ?result.state,
        payloads_written = result.payloads_written,
        "Manual archive request finished"
    );
    Ok((StatusCode::OK, Json(result)))
}

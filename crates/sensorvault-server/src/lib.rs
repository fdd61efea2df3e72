// Server mode - long-running archive service with an HTTP control surface
//
// Runs the periodic archive loop and exposes:
// - GET  /health  - liveness
// - GET  /ready   - sink reachability
// - GET  /status  - ArchiveStatus snapshot
// - POST /archive - manual trigger for the trailing `hours_back` hours
//
// Ctrl+C / SIGTERM stops the HTTP listener, then the archive loop.

use anyhow::{Context, Result};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use sensorvault_config::RuntimeConfig;
use sensorvault_pipeline::{ArchiveJobResult, ArchiveService, ServiceError};
use serde_json::json;
use std::sync::Arc;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

mod handlers;
mod init;

use handlers::{health_check, ready_check, status, trigger_archive};
pub use init::{init_service, init_tracing};

/// Application state shared across all requests
#[derive(Clone)]
pub(crate) struct AppState {
    pub service: Arc<ArchiveService>,
}

/// Error type that implements IntoResponse
#[derive(Debug)]
pub(crate) struct AppError {
    status: StatusCode,
    error_type: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(error_type = self.error_type, "Request error: {}", self.message);
        } else {
            warn!(error_type = self.error_type, "Request rejected: {}", self.message);
        }
        (
            self.status,
            Json(json!({
                "error_type": self.error_type,
                "error": self.message,
            })),
        )
            .into_response()
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        let status = match &err {
            ServiceError::JobInProgress | ServiceError::AlreadyRunning => StatusCode::CONFLICT,
            ServiceError::InvalidHoursBack { .. } => StatusCode::BAD_REQUEST,
            ServiceError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        Self {
            status,
            error_type: err.error_type(),
            message: err.to_string(),
        }
    }
}

/// Routes for the control surface, without starting the archive loop.
pub fn router(service: Arc<ArchiveService>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
        .route("/status", get(status))
        .route("/archive", post(trigger_archive))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(AppState { service })
}

/// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}

/// Entry point for server mode with a resolved configuration
pub async fn run_with_config(config: RuntimeConfig) -> Result<()> {
    init_tracing(&config.server);

    let service = init_service(&config)?;
    service
        .start()
        .await
        .context("Failed to start archive service")?;

    let addr = config.server.listen_addr.clone();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Archive control surface listening on http://{}", addr);
    info!("Routes:");
    info!("  GET  http://{}/health  - Health check", addr);
    info!("  GET  http://{}/ready   - Sink reachability", addr);
    info!("  GET  http://{}/status  - Archive status", addr);
    info!("  POST http://{}/archive - Manual archive (?hours_back=N)", addr);
    info!("Press Ctrl+C or send SIGTERM to stop");

    let served = axum::serve(listener, router(Arc::clone(&service)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error");

    if !service.stop().await {
        warn!("Archive job still running at shutdown; exiting without waiting further");
    }
    served?;

    info!("Server shutdown complete");
    Ok(())
}

/// One-shot batch mode: archive the trailing `hours_back` hours once.
///
/// Returns an error if the job did not reach DONE.
pub async fn run_once(config: RuntimeConfig, hours_back: i64) -> Result<ArchiveJobResult> {
    init_tracing(&config.server);

    let service = init_service(&config)?;
    let result = service
        .manual_trigger(hours_back)
        .await
        .context("Archive run rejected")?;

    if !result.is_done() {
        let reason = result
            .error
            .as_ref()
            .map(|e| format!("{}: {}", e.error_type, e.message))
            .unwrap_or_else(|| "unknown error".to_string());
        anyhow::bail!("Archive job for {} failed ({})", result.window, reason);
    }

    info!(
        window = %result.window,
        records = result.record_count,
        payloads_written = result.payloads_written,
        "One-shot archive complete"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensorvault_storage::StorageError;

    #[test]
    fn test_service_errors_map_to_status_codes() {
        let cases = [
            (ServiceError::JobInProgress, StatusCode::CONFLICT),
            (ServiceError::AlreadyRunning, StatusCode::CONFLICT),
            (
                ServiceError::InvalidHoursBack {
                    hours_back: 0,
                    max: 10,
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                ServiceError::StorageUnavailable(StorageError::Unavailable {
                    container: "archive".to_string(),
                    reason: "refused".to_string(),
                }),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];

        for (err, expected) in cases {
            let error_type = err.error_type();
            let app_error = AppError::from(err);
            assert_eq!(app_error.status, expected);
            assert_eq!(app_error.error_type, error_type);
        }
    }
}

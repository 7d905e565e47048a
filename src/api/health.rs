//! Health endpoints.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::error;

use super::handlers::AppState;
use crate::health::HealthStatus;

/// Handler for GET /healthCheck
///
/// Runs the in-process checks. 503 when any check is unhealthy.
pub async fn health_check(State(state): State<AppState>) -> Response {
    let (status, report) = state.health.run().await;
    let code = match status {
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
    };
    (code, Json(report)).into_response()
}

/// Handler for GET /health
///
/// Probes `/healthCheck` over HTTP. 204 when the probe fails in any way.
pub async fn health(State(state): State<AppState>) -> Response {
    match state.health_client.fetch_report().await {
        Ok(report) => Json(report).into_response(),
        Err(e) => {
            error!(error = %e, "An error occurred while checking health");
            StatusCode::NO_CONTENT.into_response()
        }
    }
}

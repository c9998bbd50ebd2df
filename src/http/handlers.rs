use super::state::AppState;
use crate::capture::PermissionState;
use crate::session::StartOutcome;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Serialize;
use tracing::info;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct PrimeResponse {
    pub permission: PermissionState,
    pub status_text: String,
}

#[derive(Debug, Serialize)]
pub struct StartResponse {
    pub outcome: StartOutcome,
    pub message: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /permission/prime
/// Resolve the camera permission prompt
pub async fn prime_permission(State(state): State<AppState>) -> impl IntoResponse {
    let permission = state.session.prime_permission().await;

    info!("Permission primed: {:?}", permission);

    (
        StatusCode::OK,
        Json(PrimeResponse {
            permission,
            status_text: permission.label().to_string(),
        }),
    )
}

/// POST /session/start
/// Start a capture session
pub async fn start_session(State(state): State<AppState>) -> impl IntoResponse {
    let outcome = state.session.start().await;

    let (status, message) = match outcome {
        StartOutcome::Started => (StatusCode::OK, "Capture session started"),
        StartOutcome::NotReady => (
            StatusCode::PRECONDITION_FAILED,
            "Camera permission has not been primed",
        ),
        StartOutcome::AlreadyActive => (
            StatusCode::CONFLICT,
            "A capture session is already active",
        ),
        StartOutcome::AcquisitionFailed => (
            StatusCode::SERVICE_UNAVAILABLE,
            "Camera stream could not be opened",
        ),
        StartOutcome::Interrupted => (
            StatusCode::CONFLICT,
            "Capture session was torn down before capture began",
        ),
    };

    (
        status,
        Json(StartResponse {
            outcome,
            message: message.to_string(),
        }),
    )
}

/// GET /session/status
/// Get status of the capture session
pub async fn get_session_status(State(state): State<AppState>) -> impl IntoResponse {
    let stats = state.session.stats().await;
    (StatusCode::OK, Json(stats))
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

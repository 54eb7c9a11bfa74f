//! Health checks.
//!
//! `/health` and `/health/ready` are plain-text checks for the platform;
//! `/api/health` is the JSON variant used by the front end.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;

use crate::state::AppState;

async fn database_reachable(state: &AppState) -> bool {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => true,
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            false
        }
    }
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    if database_reachable(&state).await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// JSON health check: `{"ok": true}` or 503 `{"ok": false}`.
pub async fn api_health(State(state): State<AppState>) -> impl IntoResponse {
    if database_reachable(&state).await {
        (StatusCode::OK, Json(json!({ "ok": true })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "ok": false, "error": "DB unreachable" })),
        )
    }
}

//! Health check handlers.

use axum::{Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::state::AppState;

/// Health check response body.
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
}

impl HealthStatus {
    fn now(status: &'static str) -> Json<Self> {
        Json(Self {
            status,
            timestamp: Utc::now(),
        })
    }
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> Json<HealthStatus> {
    HealthStatus::now("ok")
}

/// Readiness health check endpoint.
///
/// Verifies cart store connectivity before returning OK.
/// Returns 503 Service Unavailable if the store is not reachable.
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<HealthStatus>) {
    match state.carts().ping().await {
        Ok(()) => (StatusCode::OK, HealthStatus::now("ready")),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (StatusCode::SERVICE_UNAVAILABLE, HealthStatus::now("unavailable"))
        }
    }
}

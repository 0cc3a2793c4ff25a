//! Health check handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
}

/// Health check endpoint handler
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    // Check storage connectivity
    let (status, db_status) = match state.storage.health_check().await {
        Ok(()) => (StatusCode::OK, "OK"),
        Err(err) => {
            tracing::warn!("Storage health check failed: {}", err);
            (StatusCode::SERVICE_UNAVAILABLE, "ERROR")
        }
    };

    let overall = if status == StatusCode::OK { "OK" } else { "ERROR" };

    (
        status,
        Json(HealthResponse {
            status: overall.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database: db_status.to_string(),
        }),
    )
}

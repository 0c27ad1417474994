//! Liveness and fallback handlers.

use axum::{http::StatusCode, response::IntoResponse, Json};

use super::types::{ErrorBody, HealthStatus};

/// Health check endpoint for container orchestration.
pub async fn health() -> impl IntoResponse {
    Json(HealthStatus {
        status: "healthy".to_string(),
    })
}

pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(ErrorBody::new("Not found")))
}

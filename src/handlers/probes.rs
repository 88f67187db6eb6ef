// src/handlers/probes.rs

use axum::{Json, response::IntoResponse};

/// Liveness probe.
pub async fn health() -> impl IntoResponse {
    tracing::debug!("service is live");
    Json(serde_json::json!({ "status": "ok" }))
}

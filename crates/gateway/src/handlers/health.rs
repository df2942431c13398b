//! Health check handlers

use axum::{extract::State, Json};
use serde::Serialize;
use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub resolver: String,
    pub link_counting: String,
}

/// Liveness probe - always returns healthy if server is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: refdisp_common::VERSION.to_string(),
    })
}

/// Readiness probe - reports how dispersion is being computed
pub async fn ready(State(state): State<AppState>) -> Json<ReadyResponse> {
    let link_counting = serde_json::to_value(state.calculator.options().link_counting)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();

    Json(ReadyResponse {
        status: "ready".to_string(),
        resolver: state.resolver_name.clone(),
        link_counting,
    })
}

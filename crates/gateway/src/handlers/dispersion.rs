//! Dispersion handlers

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use refdisp_common::{
    errors::{AppError, Result},
    metrics::RequestMetrics,
    LogEntry, MemoryLog, TracingLog,
};
use refdisp_dispersion::DispersionResult;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;

/// Single-DOI query
#[derive(Debug, Deserialize)]
pub struct DispersionQuery {
    pub doi: String,
}

/// Batch request
#[derive(Debug, Deserialize)]
pub struct BatchDispersionRequest {
    pub dois: Vec<String>,
}

/// Batch response
#[derive(Serialize)]
pub struct BatchDispersionResponse {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub computed: usize,
    pub unavailable: usize,
    pub results: Vec<DispersionResult>,
    pub log: Vec<LogEntry>,
}

/// Compute the dispersion of one DOI
pub async fn get_dispersion(
    State(state): State<AppState>,
    Query(query): Query<DispersionQuery>,
) -> Result<Json<DispersionResult>> {
    let doi = query.doi.trim();
    if doi.is_empty() {
        return Err(AppError::Validation {
            message: "doi must not be empty".to_string(),
            field: Some("doi".to_string()),
        });
    }

    let metrics = RequestMetrics::start("GET", "/v1/dispersion");
    let result = state.calculator.compute(doi, &TracingLog).await;
    metrics.finish(200);

    Ok(Json(result))
}

/// Compute the dispersion of every DOI in the body, in order
pub async fn batch_dispersion(
    State(state): State<AppState>,
    Json(request): Json<BatchDispersionRequest>,
) -> Result<Json<BatchDispersionResponse>> {
    let dois: Vec<String> = request
        .dois
        .iter()
        .map(|doi| doi.trim())
        .filter(|doi| !doi.is_empty())
        .map(str::to_string)
        .collect();

    if dois.is_empty() {
        return Err(AppError::MissingField {
            field: "dois".to_string(),
        });
    }

    let limit = state.config.server.max_batch_size;
    if dois.len() > limit {
        return Err(AppError::BatchTooLarge {
            size: dois.len(),
            limit,
        });
    }

    let metrics = RequestMetrics::start("POST", "/v1/dispersion");
    let log = MemoryLog::new();
    let report = state.runner.run(&dois, &log).await;
    metrics.finish(200);

    tracing::info!(
        run_id = %report.run_id,
        total = dois.len(),
        computed = report.computed(),
        "Batch dispersion served"
    );

    Ok(Json(BatchDispersionResponse {
        run_id: report.run_id,
        started_at: report.started_at,
        finished_at: report.finished_at,
        computed: report.computed(),
        unavailable: report.unavailable(),
        results: report.results,
        log: log.snapshot(),
    }))
}

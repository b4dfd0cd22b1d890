//! Handlers for `/`, `/health`, `/predict` and `/metrics`

use super::{ApiError, AppState, ModelState};
use crate::metrics::MetricsSnapshot;
use crate::types::prediction::PredictionResponse;
use crate::types::record::HeartRecord;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Instant;
use tracing::{info, warn};

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: &'static str,
}

/// `GET /`
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Heart disease risk API - POST a patient record to /predict",
    })
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub version: &'static str,
    pub checked_at: DateTime<Utc>,
}

/// `GET /health`
///
/// 200 `healthy` when the artifacts are loaded, 503 `ERROR` otherwise.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let version = env!("CARGO_PKG_VERSION");
    let checked_at = Utc::now();

    match &state.model {
        ModelState::Ready(engine) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy",
                model: Some(engine.model_name().to_string()),
                features: Some(engine.feature_count()),
                detail: None,
                version,
                checked_at,
            }),
        ),
        ModelState::Unavailable(reason) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "ERROR",
                model: None,
                features: None,
                detail: Some(reason.clone()),
                version,
                checked_at,
            }),
        ),
    }
}

/// `POST /predict`
pub async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<HeartRecord>, JsonRejection>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let start_time = Instant::now();

    let result = payload
        .map_err(ApiError::from)
        .and_then(|Json(record)| {
            let engine = state.engine()?;
            let result = engine.predict(&record)?;
            Ok(result.to_response(engine.model_name()))
        });

    match result {
        Ok(response) => {
            let latency = start_time.elapsed();
            state
                .metrics
                .record_prediction(latency, response.probability, response.prediction);
            info!(
                model = %response.model,
                probability = response.probability,
                prediction = response.prediction,
                risk_level = response.risk_level.as_str(),
                latency_us = latency.as_micros() as u64,
                "Prediction served"
            );
            Ok(Json(response))
        }
        Err(e) => {
            state.metrics.record_failure(e.kind());
            warn!(kind = e.kind(), error = %e, "Prediction failed");
            Err(e)
        }
    }
}

/// `GET /metrics`
pub async fn metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

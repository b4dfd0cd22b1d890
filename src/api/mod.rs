//! HTTP surface: `/`, `/health`, `/predict` and `/metrics`

pub mod error;
mod handlers;

pub use error::ApiError;

use crate::metrics::ServiceMetrics;
use crate::models::inference::InferenceEngine;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Outcome of loading the startup artifacts
#[derive(Clone)]
pub enum ModelState {
    Ready(Arc<InferenceEngine>),
    /// Artifacts failed to load; holds the load error
    Unavailable(String),
}

/// Shared, read-only state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub model: ModelState,
    pub metrics: Arc<ServiceMetrics>,
}

impl AppState {
    pub fn ready(engine: InferenceEngine) -> Self {
        Self {
            model: ModelState::Ready(Arc::new(engine)),
            metrics: Arc::new(ServiceMetrics::new()),
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            model: ModelState::Unavailable(reason.into()),
            metrics: Arc::new(ServiceMetrics::new()),
        }
    }

    pub fn engine(&self) -> Result<&InferenceEngine, ApiError> {
        match &self.model {
            ModelState::Ready(engine) => Ok(engine),
            ModelState::Unavailable(reason) => Err(ApiError::ModelUnavailable(reason.clone())),
        }
    }
}

/// Build the service router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/predict", post(handlers::predict))
        .route("/metrics", get(handlers::metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

//! Heart Risk Service Library
//!
//! Serves a pre-trained heart-disease classifier over HTTP: a patient record
//! is normalized to the training-time feature layout, scored, and returned
//! as a prediction with its probability.

pub mod api;
pub mod config;
pub mod feature_normalizer;
pub mod metrics;
pub mod models;
pub mod types;

pub use api::{router, AppState};
pub use config::AppConfig;
pub use feature_normalizer::{FeatureNormalizer, FeatureRow};
pub use models::inference::InferenceEngine;
pub use types::{prediction::PredictionResponse, record::HeartRecord};

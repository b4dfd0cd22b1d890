//! Type definitions for the heart risk service

pub mod prediction;
pub mod record;

pub use prediction::{PredictionResponse, RiskLevel};
pub use record::{HeartRecord, RawRecord, Scalar};

//! Inference engine for heart disease risk

use crate::config::{AppConfig, DetectionConfig};
use crate::feature_normalizer::{FeatureNormalizer, NormalizeError};
use crate::models::classifier::{Classifier, InferenceError};
use crate::models::loader::{ArtifactError, LoadedArtifacts, ModelLoader};
use crate::types::prediction::{PredictionResponse, RiskLevel, RiskLevelThresholds};
use crate::types::record::HeartRecord;
use thiserror::Error;
use tracing::{debug, info};

/// Failure while scoring a record
#[derive(Debug, Error, PartialEq)]
pub enum PredictError {
    #[error("preprocessing failed: {0}")]
    Preprocessing(#[from] NormalizeError),

    #[error("inference failed: {0}")]
    Inference(#[from] InferenceError),
}

/// Result of model inference
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    /// Probability of the positive class (0.0 - 1.0)
    pub probability: f64,
    /// 1 when `probability` exceeds the decision threshold
    pub prediction: u8,
    /// Risk level classification
    pub risk_level: RiskLevel,
}

impl PredictionResult {
    /// Convert prediction result to the HTTP response body
    pub fn to_response(&self, model_name: &str) -> PredictionResponse {
        PredictionResponse {
            prediction: self.prediction,
            probability: self.probability,
            risk_level: self.risk_level,
            model: model_name.to_string(),
        }
    }
}

/// Normalizer plus classifier, immutable after construction
pub struct InferenceEngine {
    normalizer: FeatureNormalizer,
    model: Box<dyn Classifier>,
    threshold: f64,
    risk_levels: RiskLevelThresholds,
}

impl InferenceEngine {
    /// Create a new inference engine from configuration
    pub fn new(config: &AppConfig) -> Result<Self, ArtifactError> {
        let artifacts = ModelLoader::new().load_all(
            &config.artifacts.model_path,
            &config.artifacts.columns_path,
        )?;
        Ok(Self::from_artifacts(artifacts, &config.detection))
    }

    /// Create inference engine from already loaded artifacts
    pub fn from_artifacts(artifacts: LoadedArtifacts, detection: &DetectionConfig) -> Self {
        let LoadedArtifacts { model, columns } = artifacts;
        let normalizer = FeatureNormalizer::new(columns);

        info!(
            model = %model.name(),
            features = normalizer.feature_count(),
            threshold = detection.threshold,
            "Inference engine initialized"
        );

        Self {
            normalizer,
            model,
            threshold: detection.threshold,
            risk_levels: detection.risk_levels.clone(),
        }
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    pub fn feature_count(&self) -> usize {
        self.normalizer.feature_count()
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Run inference on a single record
    pub fn predict(&self, record: &HeartRecord) -> Result<PredictionResult, PredictError> {
        let row = self.normalizer.normalize(&record.to_raw())?;
        let probability = self.model.predict_proba(&row)?;
        let prediction = u8::from(probability > self.threshold);
        let risk_level = RiskLevel::from_score(probability, &self.risk_levels);

        debug!(
            model = %self.model.name(),
            probability,
            prediction,
            risk_level = risk_level.as_str(),
            "Inference complete"
        );

        Ok(PredictionResult {
            probability,
            prediction,
            risk_level,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::classifier::ModelArtifact;
    use crate::types::record::example_record;

    fn engine(threshold: f64) -> InferenceEngine {
        let columns: Vec<String> = ["Age", "MaxHR", "Sex_M", "ExerciseAngina_Y", "ST_Slope_Up"]
            .iter()
            .map(|c| c.to_string())
            .collect();
        let model = serde_json::from_str::<ModelArtifact>(
            r#"{"kind": "logistic_regression", "name": "heart_lr",
                "coefficients": [0.05, -0.03, 0.8, 1.2, -1.5], "intercept": 1.0}"#,
        )
        .unwrap()
        .into_classifier();

        let detection = DetectionConfig {
            threshold,
            ..DetectionConfig::default()
        };
        InferenceEngine::from_artifacts(LoadedArtifacts { model, columns }, &detection)
    }

    #[test]
    fn test_predict_example_record() {
        let engine = engine(0.5);
        let result = engine.predict(&example_record()).unwrap();

        // z = 1.0 + 2.0 - 5.16 + 0.8 - 1.5 = -2.86
        assert!((result.probability - 0.054).abs() < 0.001);
        assert_eq!(result.prediction, 0);
        assert_eq!(result.risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_prediction_follows_threshold() {
        let mut record = example_record();
        record.exercise_angina = "Y".to_string();
        record.st_slope = "Flat".to_string();
        record.max_hr = 100;
        record.age = 70;

        let result = engine(0.5).predict(&record).unwrap();
        // z = 1.0 + 3.5 - 3.0 + 0.8 + 1.2 = 3.5
        assert!(result.probability > 0.5);
        assert_eq!(result.prediction, 1);

        let strict = engine(0.99).predict(&record).unwrap();
        assert_eq!(strict.probability, result.probability);
        assert_eq!(strict.prediction, 0);
    }

    #[test]
    fn test_to_response() {
        let engine = engine(0.5);
        let response = engine
            .predict(&example_record())
            .unwrap()
            .to_response(engine.model_name());

        assert_eq!(response.model, "heart_lr");
        assert!((0.0..=1.0).contains(&response.probability));
    }
}

//! Prediction response structures

use serde::{Deserialize, Serialize};

/// Risk level classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Determine risk level from probability and thresholds
    pub fn from_score(score: f64, thresholds: &RiskLevelThresholds) -> Self {
        if score >= thresholds.critical {
            RiskLevel::Critical
        } else if score >= thresholds.high {
            RiskLevel::High
        } else if score >= thresholds.medium {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

/// Configurable risk level thresholds
///
/// Each bound is the lowest probability of its level. Scores below `medium`
/// are `low`, so there is no separate bound for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskLevelThresholds {
    pub medium: f64,
    pub high: f64,
    pub critical: f64,
}

impl Default for RiskLevelThresholds {
    fn default() -> Self {
        Self {
            medium: 0.5,
            high: 0.7,
            critical: 0.9,
        }
    }
}

/// Body returned by `POST /predict`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResponse {
    /// 1 when the probability exceeds the decision threshold
    pub prediction: u8,

    /// Probability of heart disease (0.0 - 1.0)
    pub probability: f64,

    /// Risk level classification of the probability
    pub risk_level: RiskLevel,

    /// Name of the model that produced the score
    pub model: String,
}

//! Pre-trained binary classifiers

use crate::feature_normalizer::FeatureRow;
use serde::Deserialize;
use thiserror::Error;

/// Failure while scoring a feature row
#[derive(Debug, Error, PartialEq)]
pub enum InferenceError {
    #[error("model `{model}` expects {expected} features, got {actual}")]
    FeatureWidth {
        model: String,
        expected: usize,
        actual: usize,
    },

    #[error("model `{model}` produced a non-finite score")]
    NonFiniteScore { model: String },
}

/// Structural problem in a model artifact
#[derive(Debug, Error, PartialEq)]
#[error("{0}")]
pub struct InvalidModel(pub String);

/// Binary classifier scoring one feature row at a time
pub trait Classifier: Send + Sync {
    /// Model name reported in responses and logs
    fn name(&self) -> &str;

    /// Width of the feature rows the model accepts
    fn n_features(&self) -> usize;

    /// Probability of the positive class
    fn predict_proba(&self, row: &FeatureRow) -> Result<f64, InferenceError>;

    /// Class label at the given decision threshold
    fn predict(&self, row: &FeatureRow, threshold: f64) -> Result<u8, InferenceError> {
        Ok(u8::from(self.predict_proba(row)? > threshold))
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Serialized classifier, tagged by `kind`
///
/// Each model is validated while it is deserialized, so a parsed artifact is
/// always safe to score.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    LogisticRegression(LogisticRegression),
    GradientBoosting(GradientBoosting),
}

impl ModelArtifact {
    /// Turn the artifact into a shareable classifier
    pub fn into_classifier(self) -> Box<dyn Classifier> {
        match self {
            ModelArtifact::LogisticRegression(model) => Box::new(model),
            ModelArtifact::GradientBoosting(model) => Box::new(model),
        }
    }
}

fn check_row(model: &str, expected: usize, row: &FeatureRow) -> Result<(), InferenceError> {
    if row.len() != expected {
        return Err(InferenceError::FeatureWidth {
            model: model.to_string(),
            expected,
            actual: row.len(),
        });
    }
    Ok(())
}

fn finite_probability(model: &str, margin: f64) -> Result<f64, InferenceError> {
    let probability = sigmoid(margin);
    if probability.is_finite() {
        Ok(probability)
    } else {
        Err(InferenceError::NonFiniteScore {
            model: model.to_string(),
        })
    }
}

/// Standardization applied before the linear model
#[derive(Debug, Clone, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

#[derive(Deserialize)]
struct LogisticRegressionFields {
    #[serde(default = "default_logistic_name")]
    name: String,
    coefficients: Vec<f64>,
    intercept: f64,
    #[serde(default)]
    scaler: Option<StandardScaler>,
}

fn default_logistic_name() -> String {
    "logistic_regression".to_string()
}

/// Logistic regression with optional standard scaling
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "LogisticRegressionFields")]
pub struct LogisticRegression {
    name: String,
    coefficients: Vec<f64>,
    intercept: f64,
    scaler: Option<StandardScaler>,
}

impl TryFrom<LogisticRegressionFields> for LogisticRegression {
    type Error = InvalidModel;

    fn try_from(fields: LogisticRegressionFields) -> Result<Self, Self::Error> {
        if fields.coefficients.is_empty() {
            return Err(InvalidModel("logistic regression has no coefficients".into()));
        }
        if let Some(scaler) = &fields.scaler {
            let n = fields.coefficients.len();
            if scaler.mean.len() != n || scaler.scale.len() != n {
                return Err(InvalidModel(format!(
                    "scaler has {} means and {} scales for {} coefficients",
                    scaler.mean.len(),
                    scaler.scale.len(),
                    n
                )));
            }
            if scaler.scale.iter().any(|&s| s == 0.0 || !s.is_finite()) {
                return Err(InvalidModel("scaler scales must be finite and non-zero".into()));
            }
        }

        Ok(Self {
            name: fields.name,
            coefficients: fields.coefficients,
            intercept: fields.intercept,
            scaler: fields.scaler,
        })
    }
}

impl LogisticRegression {
    fn decision_function(&self, values: &[f64]) -> f64 {
        let dot: f64 = match &self.scaler {
            Some(scaler) => values
                .iter()
                .zip(&self.coefficients)
                .zip(scaler.mean.iter().zip(&scaler.scale))
                .map(|((x, w), (m, s))| w * (x - m) / s)
                .sum(),
            None => values.iter().zip(&self.coefficients).map(|(x, w)| w * x).sum(),
        };
        self.intercept + dot
    }
}

impl Classifier for LogisticRegression {
    fn name(&self) -> &str {
        &self.name
    }

    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn predict_proba(&self, row: &FeatureRow) -> Result<f64, InferenceError> {
        check_row(&self.name, self.n_features(), row)?;
        finite_probability(&self.name, self.decision_function(row.values()))
    }
}

/// A node of a regression tree
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    /// Go `left` when `x[feature] <= threshold`, else `right`
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        leaf: f64,
    },
}

/// Regression tree stored as a flat node list rooted at index 0
#[derive(Debug, Clone, Deserialize)]
pub struct Tree {
    nodes: Vec<TreeNode>,
}

impl Tree {
    fn validate(&self, index: usize, n_features: usize) -> Result<(), InvalidModel> {
        if self.nodes.is_empty() {
            return Err(InvalidModel(format!("tree {index} has no nodes")));
        }
        for (i, node) in self.nodes.iter().enumerate() {
            if let TreeNode::Split {
                feature,
                left,
                right,
                ..
            } = *node
            {
                if feature >= n_features {
                    return Err(InvalidModel(format!(
                        "tree {index} node {i} splits on feature {feature} of {n_features}"
                    )));
                }
                // Children must point forward so traversal always terminates.
                for child in [left, right] {
                    if child <= i || child >= self.nodes.len() {
                        return Err(InvalidModel(format!(
                            "tree {index} node {i} has invalid child {child}"
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Only called on trees checked by `validate` against the row width.
    fn evaluate(&self, values: &[f64]) -> f64 {
        let mut i = 0;
        loop {
            match self.nodes[i] {
                TreeNode::Leaf { leaf } => return leaf,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    i = if values[feature] <= threshold { left } else { right };
                }
            }
        }
    }
}

#[derive(Deserialize)]
struct GradientBoostingFields {
    #[serde(default = "default_boosting_name")]
    name: String,
    n_features: usize,
    #[serde(default)]
    base_score: f64,
    trees: Vec<Tree>,
}

fn default_boosting_name() -> String {
    "gradient_boosting".to_string()
}

/// Gradient boosted trees with a logistic link
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "GradientBoostingFields")]
pub struct GradientBoosting {
    name: String,
    n_features: usize,
    base_score: f64,
    trees: Vec<Tree>,
}

impl TryFrom<GradientBoostingFields> for GradientBoosting {
    type Error = InvalidModel;

    fn try_from(fields: GradientBoostingFields) -> Result<Self, Self::Error> {
        if fields.n_features == 0 {
            return Err(InvalidModel("gradient boosting declares zero features".into()));
        }
        if fields.trees.is_empty() {
            return Err(InvalidModel("gradient boosting has no trees".into()));
        }
        for (i, tree) in fields.trees.iter().enumerate() {
            tree.validate(i, fields.n_features)?;
        }

        Ok(Self {
            name: fields.name,
            n_features: fields.n_features,
            base_score: fields.base_score,
            trees: fields.trees,
        })
    }
}

impl Classifier for GradientBoosting {
    fn name(&self) -> &str {
        &self.name
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_proba(&self, row: &FeatureRow) -> Result<f64, InferenceError> {
        check_row(&self.name, self.n_features, row)?;
        let margin = self.base_score
            + self
                .trees
                .iter()
                .map(|tree| tree.evaluate(row.values()))
                .sum::<f64>();
        finite_probability(&self.name, margin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier(json: &str) -> Box<dyn Classifier> {
        serde_json::from_str::<ModelArtifact>(json)
            .unwrap()
            .into_classifier()
    }

    #[test]
    fn test_logistic_regression_probability() {
        let model = classifier(
            r#"{"kind": "logistic_regression", "name": "lr", "coefficients": [1.0, -2.0], "intercept": 0.5}"#,
        );
        let row = FeatureRow::new(vec![1.0, 0.75]);

        // z = 0.5 + 1.0 - 1.5 = 0.0
        assert_eq!(model.name(), "lr");
        assert!((model.predict_proba(&row).unwrap() - 0.5).abs() < 1e-12);
        assert_eq!(model.predict(&row, 0.5).unwrap(), 0);
    }

    #[test]
    fn test_logistic_regression_with_scaler() {
        let model = classifier(
            r#"{"kind": "logistic_regression", "coefficients": [2.0], "intercept": 0.0,
                "scaler": {"mean": [10.0], "scale": [5.0]}}"#,
        );

        let at_mean = model.predict_proba(&FeatureRow::new(vec![10.0])).unwrap();
        let above = model.predict_proba(&FeatureRow::new(vec![15.0])).unwrap();
        assert!((at_mean - 0.5).abs() < 1e-12);
        assert!((above - sigmoid(2.0)).abs() < 1e-12);
        assert_eq!(model.name(), "logistic_regression");
    }

    #[test]
    fn test_extreme_margin_stays_in_unit_interval() {
        let model = classifier(r#"{"kind": "logistic_regression", "coefficients": [1000.0], "intercept": 0.0}"#);

        let high = model.predict_proba(&FeatureRow::new(vec![10.0])).unwrap();
        let low = model.predict_proba(&FeatureRow::new(vec![-10.0])).unwrap();
        assert!((0.0..=1.0).contains(&high));
        assert!((0.0..=1.0).contains(&low));
        assert_eq!(model.predict(&FeatureRow::new(vec![10.0]), 0.5).unwrap(), 1);
    }

    #[test]
    fn test_feature_width_mismatch() {
        let model = classifier(r#"{"kind": "logistic_regression", "coefficients": [1.0, 1.0], "intercept": 0.0}"#);

        assert_eq!(
            model.predict_proba(&FeatureRow::new(vec![1.0])),
            Err(InferenceError::FeatureWidth {
                model: "logistic_regression".to_string(),
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn test_zero_scale_is_invalid() {
        let parsed = serde_json::from_str::<ModelArtifact>(
            r#"{"kind": "logistic_regression", "coefficients": [1.0], "intercept": 0.0,
                "scaler": {"mean": [0.0], "scale": [0.0]}}"#,
        );

        let err = parsed.err().unwrap();
        assert!(err.to_string().contains("finite and non-zero"));
    }

    #[test]
    fn test_gradient_boosting_traversal() {
        let model = classifier(
            r#"{
                "kind": "gradient_boosting", "name": "gb", "n_features": 2, "base_score": -0.5,
                "trees": [
                    {"nodes": [
                        {"feature": 0, "threshold": 50.0, "left": 1, "right": 2},
                        {"leaf": -1.0},
                        {"leaf": 1.0}
                    ]},
                    {"nodes": [{"leaf": 0.5}]}
                ]
            }"#,
        );

        let young = model.predict_proba(&FeatureRow::new(vec![40.0, 0.0])).unwrap();
        let old = model.predict_proba(&FeatureRow::new(vec![60.0, 0.0])).unwrap();
        assert!((young - sigmoid(-1.0)).abs() < 1e-12);
        assert!((old - sigmoid(1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_backward_child_is_invalid() {
        let parsed = serde_json::from_str::<ModelArtifact>(
            r#"{"kind": "gradient_boosting", "n_features": 1, "trees": [
                {"nodes": [{"feature": 0, "threshold": 1.0, "left": 0, "right": 1}, {"leaf": 1.0}]}
            ]}"#,
        );

        let err = parsed.err().unwrap();
        assert!(err.to_string().contains("invalid child 0"));
    }

    #[test]
    fn test_gradient_boosting_validated_when_parsed_directly() {
        let out_of_range = serde_json::from_str::<GradientBoosting>(
            r#"{"n_features": 1, "trees": [
                {"nodes": [{"feature": 5, "threshold": 1.0, "left": 1, "right": 1}, {"leaf": 1.0}]}
            ]}"#,
        );
        let err = out_of_range.err().unwrap();
        assert!(err.to_string().contains("splits on feature 5 of 1"));

        let self_loop = serde_json::from_str::<GradientBoosting>(
            r#"{"n_features": 1, "trees": [
                {"nodes": [{"feature": 0, "threshold": 1.0, "left": 0, "right": 0}]}
            ]}"#,
        );
        assert!(self_loop.is_err());

        let dangling = serde_json::from_str::<GradientBoosting>(
            r#"{"n_features": 1, "trees": [
                {"nodes": [{"feature": 0, "threshold": 1.0, "left": 1, "right": 2}, {"leaf": 1.0}]}
            ]}"#,
        );
        assert!(dangling.is_err());
    }

    #[test]
    fn test_logistic_regression_validated_when_parsed_directly() {
        let parsed = serde_json::from_str::<LogisticRegression>(
            r#"{"coefficients": [1.0, 2.0], "intercept": 0.0,
                "scaler": {"mean": [0.0], "scale": [1.0]}}"#,
        );

        let err = parsed.err().unwrap();
        assert!(err.to_string().contains("1 means and 1 scales for 2 coefficients"));
    }

    #[test]
    fn test_unknown_kind_fails_to_parse() {
        let parsed = serde_json::from_str::<ModelArtifact>(r#"{"kind": "svm"}"#);
        assert!(parsed.is_err());
    }
}

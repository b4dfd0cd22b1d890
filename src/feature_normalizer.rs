//! Feature normalization for heart risk model inference.
//!
//! Turns a raw record into the numeric row the classifier was trained on:
//! categorical fields are one-hot encoded as `<field>_<value>` indicators and
//! the result is reindexed to the training column list. Columns the record
//! does not produce are zero-filled, cells with no training column are dropped.

use crate::types::record::{RawRecord, CATEGORICAL_FIELDS};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Failure while building a feature row
#[derive(Debug, Error, PartialEq)]
pub enum NormalizeError {
    #[error("field `{field}` is not categorical and must be numeric")]
    NonNumeric { field: String },

    #[error("field `{field}` is not a finite number")]
    NonFinite { field: String },
}

/// A single numeric row aligned to the training column list
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    values: Vec<f64>,
}

impl FeatureRow {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Feature normalizer that transforms raw records into model input rows.
///
/// The training column list is the single source of truth for the output
/// shape: every row it produces has exactly `feature_count()` values.
#[derive(Debug, Clone)]
pub struct FeatureNormalizer {
    columns: Arc<[String]>,
    positions: HashMap<String, usize>,
    categorical: Vec<String>,
}

impl FeatureNormalizer {
    /// Create a normalizer with the default categorical fields.
    pub fn new(columns: Vec<String>) -> Self {
        Self::with_categorical(columns, CATEGORICAL_FIELDS.iter().map(|f| f.to_string()))
    }

    /// Create a normalizer with an explicit set of categorical fields.
    pub(crate) fn with_categorical<I>(columns: Vec<String>, categorical: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut positions = HashMap::with_capacity(columns.len());
        for (i, name) in columns.iter().enumerate() {
            positions.entry(name.clone()).or_insert(i);
        }

        Self {
            columns: columns.into(),
            positions,
            categorical: categorical.into_iter().collect(),
        }
    }

    /// Build the feature row for a record.
    pub fn normalize(&self, record: &RawRecord) -> Result<FeatureRow, NormalizeError> {
        let mut values = vec![0.0; self.columns.len()];

        for (field, value) in record.iter() {
            if self.is_categorical(field) {
                let indicator = format!("{}_{}", field, value.category_label());
                match self.positions.get(&indicator) {
                    Some(&i) => values[i] = 1.0,
                    // Either the drop-first baseline or a category never seen in training.
                    None => debug!(field = %field, indicator = %indicator, "No training column for category"),
                }
                continue;
            }

            let number = value.as_f64().ok_or_else(|| NormalizeError::NonNumeric {
                field: field.to_string(),
            })?;
            if !number.is_finite() {
                return Err(NormalizeError::NonFinite {
                    field: field.to_string(),
                });
            }

            if let Some(&i) = self.positions.get(field) {
                values[i] = number;
            }
        }

        Ok(FeatureRow::new(values))
    }

    fn is_categorical(&self, field: &str) -> bool {
        self.categorical.iter().any(|c| c == field)
    }

    /// Get the number of features produced.
    pub fn feature_count(&self) -> usize {
        self.columns.len()
    }

    /// Get feature names in training order.
    pub fn feature_names(&self) -> &[String] {
        &self.columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::record::{example_record, Scalar};

    fn training_columns() -> Vec<String> {
        [
            "Age",
            "RestingBP",
            "Cholesterol",
            "FastingBS",
            "MaxHR",
            "Oldpeak",
            "Sex_M",
            "ChestPainType_ATA",
            "ChestPainType_NAP",
            "ChestPainType_TA",
            "RestingECG_Normal",
            "RestingECG_ST",
            "ExerciseAngina_Y",
            "ST_Slope_Flat",
            "ST_Slope_Up",
        ]
        .iter()
        .map(|c| c.to_string())
        .collect()
    }

    #[test]
    fn test_example_record_layout() {
        let normalizer = FeatureNormalizer::new(training_columns());
        let row = normalizer.normalize(&example_record().to_raw()).unwrap();

        assert_eq!(row.len(), normalizer.feature_count());
        assert_eq!(
            row.values(),
            &[40.0, 140.0, 289.0, 0.0, 172.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]
        );
    }

    #[test]
    fn test_baseline_category_is_all_zero() {
        let normalizer = FeatureNormalizer::new(training_columns());
        let mut record = example_record();
        record.chest_pain_type = "ASY".to_string();

        let row = normalizer.normalize(&record.to_raw()).unwrap();
        assert_eq!(&row.values()[7..10], &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_unseen_categories_collapse_to_same_row() {
        let normalizer = FeatureNormalizer::new(training_columns());
        let mut first = example_record();
        first.resting_ecg = "LVH".to_string();
        let mut second = example_record();
        second.resting_ecg = "Unknown".to_string();

        let a = normalizer.normalize(&first.to_raw()).unwrap();
        let b = normalizer.normalize(&second.to_raw()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_extra_fields_dropped_and_missing_zero_filled() {
        let normalizer = FeatureNormalizer::new(training_columns());
        let record = RawRecord::new()
            .with("Age", 55_i64)
            .with("NotATrainingColumn", 3.5);

        let row = normalizer.normalize(&record).unwrap();
        assert_eq!(row.len(), 15);
        assert_eq!(row.values()[0], 55.0);
        assert!(row.values()[1..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let normalizer = FeatureNormalizer::new(training_columns());
        let raw = example_record().to_raw();

        let first = normalizer.normalize(&raw).unwrap();
        let second = normalizer.normalize(&raw).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_text_in_numeric_field_is_rejected() {
        let normalizer = FeatureNormalizer::new(training_columns());
        let record = RawRecord::new().with("Age", "forty");

        assert_eq!(
            normalizer.normalize(&record),
            Err(NormalizeError::NonNumeric {
                field: "Age".to_string()
            })
        );
    }

    #[test]
    fn test_non_finite_value_is_rejected() {
        let normalizer = FeatureNormalizer::new(training_columns());
        let record = RawRecord::new().with("Oldpeak", f64::NAN);

        assert!(matches!(
            normalizer.normalize(&record),
            Err(NormalizeError::NonFinite { .. })
        ));
    }

    #[test]
    fn test_pre_encoded_categorical_values() {
        let columns = vec!["age".to_string(), "cp_1".to_string(), "cp_2".to_string()];
        let normalizer = FeatureNormalizer::with_categorical(columns, vec!["cp".to_string()]);
        let record = RawRecord::new()
            .with("age", 52_i64)
            .with("cp", Scalar::Int(2));

        let row = normalizer.normalize(&record).unwrap();
        assert_eq!(row.values(), &[52.0, 0.0, 1.0]);
    }
}

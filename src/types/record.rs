//! Patient record structures accepted by the prediction endpoint

use serde::{Deserialize, Serialize};

/// Fields one-hot encoded before inference
pub const CATEGORICAL_FIELDS: [&str; 5] = [
    "Sex",
    "ChestPainType",
    "RestingECG",
    "ExerciseAngina",
    "ST_Slope",
];

/// A single scalar cell of a raw record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    /// Numeric value of the cell; text has none
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Scalar::Int(i) => Some(*i as f64),
            Scalar::Float(f) => Some(*f),
            Scalar::Text(_) => None,
        }
    }

    /// Label used for the one-hot indicator column (`<field>_<label>`)
    pub fn category_label(&self) -> String {
        match self {
            Scalar::Bool(b) => b.to_string(),
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::Text(s) => s.clone(),
        }
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

/// One row of named scalars, in field declaration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    cells: Vec<(String, Scalar)>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a cell, replacing any earlier cell with the same name
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Scalar>) {
        let name = name.into();
        let value = value.into();
        match self.cells.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.cells.push((name, value)),
        }
    }

    /// Builder form of [`RawRecord::insert`]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Scalar> {
        self.cells.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.cells.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Clinical record for a single patient
///
/// Field names follow the training dataset; snake_case aliases are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartRecord {
    /// Age in years
    #[serde(rename = "Age", alias = "age")]
    pub age: i64,

    /// Sex (M, F)
    #[serde(rename = "Sex", alias = "sex")]
    pub sex: String,

    /// Chest pain type (TA, ATA, NAP, ASY)
    #[serde(rename = "ChestPainType", alias = "chest_pain_type")]
    pub chest_pain_type: String,

    /// Resting blood pressure (mm Hg)
    #[serde(rename = "RestingBP", alias = "resting_bp")]
    pub resting_bp: i64,

    /// Serum cholesterol (mm/dl)
    #[serde(rename = "Cholesterol", alias = "cholesterol")]
    pub cholesterol: i64,

    /// Fasting blood sugar > 120 mg/dl (1 = true, 0 = false)
    #[serde(rename = "FastingBS", alias = "fasting_bs")]
    pub fasting_bs: i64,

    /// Resting ECG result (Normal, ST, LVH)
    #[serde(rename = "RestingECG", alias = "resting_ecg")]
    pub resting_ecg: String,

    /// Maximum heart rate achieved
    #[serde(rename = "MaxHR", alias = "max_hr")]
    pub max_hr: i64,

    /// Exercise-induced angina (Y, N)
    #[serde(rename = "ExerciseAngina", alias = "exercise_angina")]
    pub exercise_angina: String,

    /// ST depression induced by exercise relative to rest
    #[serde(rename = "Oldpeak", alias = "oldpeak")]
    pub oldpeak: f64,

    /// Slope of the peak exercise ST segment (Up, Flat, Down)
    #[serde(rename = "ST_Slope", alias = "st_slope")]
    pub st_slope: String,
}

impl HeartRecord {
    /// Flatten into a raw record keyed by training column names
    pub fn to_raw(&self) -> RawRecord {
        RawRecord::new()
            .with("Age", self.age)
            .with("Sex", self.sex.as_str())
            .with("ChestPainType", self.chest_pain_type.as_str())
            .with("RestingBP", self.resting_bp)
            .with("Cholesterol", self.cholesterol)
            .with("FastingBS", self.fasting_bs)
            .with("RestingECG", self.resting_ecg.as_str())
            .with("MaxHR", self.max_hr)
            .with("ExerciseAngina", self.exercise_angina.as_str())
            .with("Oldpeak", self.oldpeak)
            .with("ST_Slope", self.st_slope.as_str())
    }
}

#[cfg(test)]
pub(crate) fn example_record() -> HeartRecord {
    HeartRecord {
        age: 40,
        sex: "M".to_string(),
        chest_pain_type: "ATA".to_string(),
        resting_bp: 140,
        cholesterol: 289,
        fasting_bs: 0,
        resting_ecg: "Normal".to_string(),
        max_hr: 172,
        exercise_angina: "N".to_string(),
        oldpeak: 0.0,
        st_slope: "Up".to_string(),
    }
}

//! Model artifact loader

use crate::models::classifier::{Classifier, ModelArtifact};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Failure while reading the startup artifacts
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact not found: {}", path.display())]
    Missing { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid training columns in {}: {reason}", path.display())]
    InvalidColumns { path: PathBuf, reason: String },

    #[error("model expects {model_features} features but the training column list has {columns}")]
    ShapeMismatch {
        model_features: usize,
        columns: usize,
    },
}

/// Classifier and training column list, loaded together
pub struct LoadedArtifacts {
    pub model: Box<dyn Classifier>,
    pub columns: Vec<String>,
}

/// Loader for the model and training column artifacts
#[derive(Debug, Default)]
pub struct ModelLoader;

impl ModelLoader {
    pub fn new() -> Self {
        Self
    }

    fn read(path: &Path) -> Result<Vec<u8>, ArtifactError> {
        fs::read(path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => ArtifactError::Missing {
                path: path.to_path_buf(),
            },
            _ => ArtifactError::Io {
                path: path.to_path_buf(),
                source,
            },
        })
    }

    /// Load a serialized classifier from file
    pub fn load_model<P: AsRef<Path>>(&self, path: P) -> Result<Box<dyn Classifier>, ArtifactError> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading model");

        let bytes = Self::read(path)?;
        // Structural checks run during deserialization and surface as parse errors.
        let artifact: ModelArtifact =
            serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        let model = artifact.into_classifier();

        info!(
            model = %model.name(),
            features = model.n_features(),
            "Model loaded successfully"
        );
        Ok(model)
    }

    /// Load the ordered training column list from a JSON array
    pub fn load_columns<P: AsRef<Path>>(&self, path: P) -> Result<Vec<String>, ArtifactError> {
        let path = path.as_ref();
        let bytes = Self::read(path)?;
        let columns: Vec<String> =
            serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        if columns.is_empty() {
            return Err(ArtifactError::InvalidColumns {
                path: path.to_path_buf(),
                reason: "column list is empty".to_string(),
            });
        }
        let mut seen = HashSet::with_capacity(columns.len());
        if let Some(duplicate) = columns.iter().find(|c| !seen.insert(c.as_str())) {
            return Err(ArtifactError::InvalidColumns {
                path: path.to_path_buf(),
                reason: format!("duplicate column `{duplicate}`"),
            });
        }

        info!(path = %path.display(), count = columns.len(), "Training columns loaded");
        Ok(columns)
    }

    /// Load both artifacts and check that their shapes agree
    pub fn load_all<P, Q>(&self, model_path: P, columns_path: Q) -> Result<LoadedArtifacts, ArtifactError>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let model = self.load_model(model_path)?;
        let columns = self.load_columns(columns_path)?;

        if model.n_features() != columns.len() {
            return Err(ArtifactError::ShapeMismatch {
                model_features: model.n_features(),
                columns: columns.len(),
            });
        }

        Ok(LoadedArtifacts { model, columns })
    }
}

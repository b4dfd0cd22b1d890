//! Model loading and inference components

pub mod classifier;
pub mod inference;
pub mod loader;

pub use classifier::{Classifier, ModelArtifact};
pub use inference::InferenceEngine;
pub use loader::ModelLoader;

//! Disaster Inference Engine
//!
//! Consults a trained tree-ensemble model when one is loaded and falls back
//! to the rule cascade on absence or any model failure.

mod engine;
mod model;

pub use engine::{ClassProbability, Prediction, PredictionSource, Predictor};
pub use model::{load_model, load_optional, DisasterModel, ModelOutput, Tree, TreeEnsemble, TreeNode};

use thiserror::Error;

/// Errors during model loading or inference
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Model load failed: {0}")]
    ModelLoadError(String),
    #[error("Inference failed: {0}")]
    InferenceFailed(String),
    #[error("Invalid input shape: expected {expected}, got {actual}")]
    InvalidInputShape { expected: String, actual: String },
    #[error("Model class index {index} outside label set of {labels}")]
    UnknownClass { index: usize, labels: usize },
}

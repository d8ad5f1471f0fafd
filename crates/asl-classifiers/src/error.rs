use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AslError>;

/// Failures raised by partitioning, training, persistence and routing.
#[derive(Debug, Error)]
pub enum AslError {
    /// The letter range selected no classes from the dataset.
    #[error("no classes found in the range {start} to {end}; check the dataset labels")]
    EmptyPartition { start: char, end: char },

    #[error("training failed: {0}")]
    Training(String),

    #[error("failed to load model from {path}: {reason}")]
    ModelLoad { path: PathBuf, reason: String },

    #[error("model has not been trained or loaded yet")]
    NotTrained,

    #[error("no model available for request (requested: {})", .requested.as_deref().unwrap_or("general"))]
    NoModelAvailable { requested: Option<String> },

    #[error("invalid letter range: {0}")]
    InvalidLetterRange(String),

    #[error("invalid label mapping: {0}")]
    InvalidLabelMapping(String),

    #[error("invalid hand landmarks: {0}")]
    InvalidLandmarks(String),

    #[error("feature vector has length {got}, model expects {expected}")]
    FeatureLength { expected: usize, got: usize },

    #[error("predicted label index {0} is not in the model's label mapping")]
    UnknownLabel(usize),

    #[error("invalid dataset: {0}")]
    Dataset(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl AslError {
    pub(crate) fn model_load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        AslError::ModelLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

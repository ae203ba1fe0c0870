//! Error types for the assignment pipeline

use thiserror::Error;

/// Errors raised while fitting, loading or querying the pipeline
#[derive(Error, Debug)]
pub enum AssignerError {
    /// Training corpus has no documents or yields no tokens
    #[error("Empty corpus: {0}")]
    EmptyCorpus(String),

    /// Not enough examples or label diversity to train
    #[error("Insufficient training data: {0}")]
    InsufficientData(String),

    /// Prediction or scoring attempted before fit/load
    #[error("Model has not been trained or loaded")]
    UntrainedModel,

    /// Request payload has the wrong shape
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Persisted model failed structural validation
    #[error("Invalid model: {0}")]
    InvalidModel(String),

    /// Persisted model content does not match its recorded hash
    #[error("Model hash mismatch: expected {expected}, computed {actual}")]
    HashMismatch { expected: String, actual: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, AssignerError>;

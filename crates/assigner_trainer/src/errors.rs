use thiserror::Error;
use ticket_assigner_core::AssignerError;

/// Errors returned by the assignee trainer.
#[derive(Debug, Error)]
pub enum TrainerError {
    #[error("dataset error: {0}")]
    Dataset(String),

    #[error("dataset row {row}: {message}")]
    InvalidRow { row: usize, message: String },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("training error: {0}")]
    Training(#[from] AssignerError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

use thiserror::Error;
use ticket_assigner_core::AssignerError;

/// Errors raised while configuring or starting the service
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to load model: {0}")]
    ModelLoad(#[from] AssignerError),
}

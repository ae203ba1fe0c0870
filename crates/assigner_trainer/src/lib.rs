//! Ticket Assigner Trainer - offline model training
//!
//! Loads labelled tickets from CSV, fits the TF-IDF + random-forest pipeline
//! reproducibly for a fixed seed, reports validation accuracy and writes the
//! model artifact together with its content hash.

pub mod dataset;
pub mod errors;
pub mod trainer;

use std::path::Path;

pub use dataset::{Dataset, TicketRecord};
pub use errors::TrainerError;
pub use trainer::{save_artifact, AssigneeTrainer, SavedArtifact, TrainingParams, TrainingReport};

/// Train directly from a CSV file using the provided parameters.
pub fn train_model_from_csv(
    path: &Path,
    params: TrainingParams,
) -> Result<TrainingReport, TrainerError> {
    let dataset = Dataset::from_csv(path)?;
    AssigneeTrainer::new(params).train(&dataset)
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Ticket Assignment Core
//!
//! Maps issue-tracker tickets (title, description, labels) to the person
//! responsible for them with a TF-IDF vectorizer feeding a random forest.
//!
//! Modules:
//! - `ticket`: Ticket fields and feature-text normalization
//! - `tokenizer`: Word-level tokenizer shared by fit and transform
//! - `tfidf`: Vocabulary, smoothed IDF weights and sparse feature vectors
//! - `forest`: CART trees and the random-forest classifier
//! - `pipeline`: Vectorizer + forest behind one fit/predict contract
//! - `model`: Persisted artifact with canonical JSON and BLAKE3 content hash
//! - `deterministic`: Seedable RNG and tie-breaking helpers

pub mod deterministic;
pub mod errors;
pub mod forest;
pub mod model;
pub mod pipeline;
pub mod tfidf;
pub mod ticket;
pub mod tokenizer;

pub use errors::{AssignerError, Result};
pub use forest::{Forest, ForestParams, RandomForestClassifier};
pub use model::{ModelMetadata, PersistedModel, TrainingSummary, MODEL_VERSION};
pub use pipeline::{Pipeline, PipelineConfig};
pub use tfidf::{FeatureVector, VectorModel};
pub use ticket::{normalize, Labels, Ticket};

/// Crate version string recorded in model metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// File name of the persisted model inside an output directory
pub const MODEL_FILE_NAME: &str = "ticket_assigner.json";

/// File name of the content-hash sidecar inside an output directory
pub const HASH_FILE_NAME: &str = "ticket_assigner.hash";

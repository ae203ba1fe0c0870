//! Persisted model artifact
//!
//! A [`PersistedModel`] bundles the fitted vectorizer, the forest and
//! descriptive metadata into one canonical-JSON file. The content hash covers
//! only the prediction-relevant part (version, vectorizer, forest), so two
//! runs with identical inputs hash identically even though their timestamps
//! differ.

use crate::errors::{AssignerError, Result};
use crate::forest::Forest;
use crate::tfidf::VectorModel;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Artifact format version
pub const MODEL_VERSION: i32 = 1;

/// Figures from the training run recorded alongside the model
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingSummary {
    /// Unix timestamp (seconds)
    pub trained_at: u64,
    pub training_samples: usize,
    pub test_samples: usize,
    pub accuracy: Option<f64>,
}

/// Descriptive metadata stored in the artifact
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelMetadata {
    pub trained_at: u64,
    pub training_samples: usize,
    pub test_samples: usize,
    pub accuracy: Option<f64>,
    pub model_hash: String,
    pub tree_count: usize,
    pub vocabulary_size: usize,
    pub labels: Vec<String>,
    pub crate_version: String,
}

/// Serialized pipeline: vocabulary, IDF weights, normalization flag, forest
/// and label set
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistedModel {
    pub version: i32,
    pub vectorizer: VectorModel,
    pub forest: Forest,
    pub metadata: ModelMetadata,
}

#[derive(Serialize)]
struct HashedContent<'a> {
    version: i32,
    vectorizer: &'a VectorModel,
    forest: &'a Forest,
}

impl PersistedModel {
    /// Assemble an artifact and stamp it with its content hash
    pub fn new(vectorizer: VectorModel, forest: Forest, summary: TrainingSummary) -> Result<Self> {
        let model_hash = content_hash(MODEL_VERSION, &vectorizer, &forest)?;
        let metadata = ModelMetadata {
            trained_at: summary.trained_at,
            training_samples: summary.training_samples,
            test_samples: summary.test_samples,
            accuracy: summary.accuracy,
            model_hash,
            tree_count: forest.trees.len(),
            vocabulary_size: vectorizer.vocabulary_size(),
            labels: forest.labels.clone(),
            crate_version: crate::VERSION.to_string(),
        };

        Ok(Self {
            version: MODEL_VERSION,
            vectorizer,
            forest,
            metadata,
        })
    }

    /// Hash of version, vectorizer and forest (hex BLAKE3 of canonical JSON)
    pub fn content_hash_hex(&self) -> Result<String> {
        content_hash(self.version, &self.vectorizer, &self.forest)
    }

    /// Validate structure and the embedded content hash
    pub fn validate(&self) -> Result<()> {
        if self.version != MODEL_VERSION {
            return Err(AssignerError::InvalidModel(format!(
                "Unsupported model version: {}",
                self.version
            )));
        }

        self.vectorizer.validate()?;
        self.forest.validate()?;

        if self.forest.feature_count != self.vectorizer.vocabulary_size() {
            return Err(AssignerError::InvalidModel(format!(
                "forest expects {} features but vocabulary has {}",
                self.forest.feature_count,
                self.vectorizer.vocabulary_size()
            )));
        }

        let actual = self.content_hash_hex()?;
        if actual != self.metadata.model_hash {
            return Err(AssignerError::HashMismatch {
                expected: self.metadata.model_hash.clone(),
                actual,
            });
        }

        Ok(())
    }

    /// Serialize to canonical JSON (sorted keys, no whitespace)
    pub fn to_canonical_json(&self) -> Result<String> {
        canonical_json(self)
    }

    /// Save the artifact as canonical JSON
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_canonical_json()?)?;
        Ok(())
    }

    /// Load and validate an artifact
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let model: PersistedModel = serde_json::from_str(&json)?;
        model.validate()?;
        Ok(model)
    }

    /// Write the content hash to a sidecar file
    pub fn write_hash_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, &self.metadata.model_hash)?;
        Ok(())
    }

    /// Check the content hash against a sidecar file
    pub fn verify_hash_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let expected = fs::read_to_string(path)?.trim().to_string();
        let actual = self.content_hash_hex()?;
        if expected != actual {
            return Err(AssignerError::HashMismatch { expected, actual });
        }
        Ok(())
    }
}

/// Compact JSON with object keys in sorted order.
///
/// Going through `serde_json::Value` sorts every object, since its map is a
/// `BTreeMap` (the `preserve_order` feature is not enabled). Struct fields and
/// the vocabulary map therefore serialize identically on every run.
fn canonical_json<T: Serialize>(value: &T) -> Result<String> {
    let tree = serde_json::to_value(value)?;
    Ok(serde_json::to_string(&tree)?)
}

/// Hex BLAKE3 over the canonical form of the prediction-relevant content
fn content_hash(version: i32, vectorizer: &VectorModel, forest: &Forest) -> Result<String> {
    let json = canonical_json(&HashedContent {
        version,
        vectorizer,
        forest,
    })?;
    Ok(hex::encode(blake3::hash(json.as_bytes()).as_bytes()))
}

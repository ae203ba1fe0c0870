//! Assignee model trainer
//!
//! Shuffles and splits the dataset, fits the pipeline on the training part,
//! scores it on the held-out part and packages the result.

use crate::dataset::Dataset;
use crate::errors::TrainerError;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use ticket_assigner_core::{
    AssignerError, ForestParams, PersistedModel, Pipeline, PipelineConfig, TrainingSummary,
    HASH_FILE_NAME, MODEL_FILE_NAME,
};
use tracing::{debug, info};

/// Training configuration
#[derive(Clone, Debug, PartialEq)]
pub struct TrainingParams {
    pub forest: ForestParams,
    pub l2_normalize: bool,
    /// Share of rows held out for validation
    pub test_fraction: f64,
    /// Shuffle rows before splitting
    pub shuffle: bool,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            forest: ForestParams::default(),
            l2_normalize: true,
            test_fraction: 0.2,
            shuffle: true,
        }
    }
}

/// Outcome of a training run
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub pipeline: Pipeline,
    pub training_samples: usize,
    pub test_samples: usize,
    /// Validation accuracy, absent when nothing was held out
    pub accuracy: Option<f64>,
    /// Rows per assignee across the whole dataset
    pub label_counts: BTreeMap<String, usize>,
}

impl TrainingReport {
    /// Package the fitted pipeline with this run's figures
    pub fn to_artifact(&self, trained_at: u64) -> Result<PersistedModel, TrainerError> {
        Ok(self.pipeline.to_artifact(TrainingSummary {
            trained_at,
            training_samples: self.training_samples,
            test_samples: self.test_samples,
            accuracy: self.accuracy,
        })?)
    }
}

/// Paths written by [`save_artifact`]
#[derive(Debug, Clone, PartialEq)]
pub struct SavedArtifact {
    pub model_path: PathBuf,
    pub hash_path: PathBuf,
    pub model_hash: String,
}

/// Assignee trainer
pub struct AssigneeTrainer {
    params: TrainingParams,
}

impl AssigneeTrainer {
    pub fn new(params: TrainingParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &TrainingParams {
        &self.params
    }

    /// Train on `dataset`; the held-out rows are only used for scoring
    pub fn train(&self, dataset: &Dataset) -> Result<TrainingReport, TrainerError> {
        if dataset.len() < 2 {
            return Err(AssignerError::InsufficientData(format!(
                "need at least 2 rows to split, got {}",
                dataset.len()
            ))
            .into());
        }

        let mut rows = dataset.clone();
        if self.params.shuffle {
            debug!(seed = self.params.forest.seed, "Shuffling dataset");
            rows.shuffle(self.params.forest.seed);
        }

        let (train, test) = rows.split(self.params.test_fraction)?;
        info!(train = train.len(), test = test.len(), "Split dataset");

        let mut pipeline = Pipeline::new(PipelineConfig {
            forest: self.params.forest.clone(),
            l2_normalize: self.params.l2_normalize,
        });
        pipeline.fit(&train.texts(), &train.assignees())?;

        let accuracy = if test.is_empty() {
            None
        } else {
            Some(pipeline.score(&test.texts(), &test.assignees())?)
        };

        Ok(TrainingReport {
            pipeline,
            training_samples: train.len(),
            test_samples: test.len(),
            accuracy,
            label_counts: dataset.label_counts(),
        })
    }
}

/// Write `ticket_assigner.json` and `ticket_assigner.hash` into `output_dir`
pub fn save_artifact(
    model: &PersistedModel,
    output_dir: &Path,
) -> Result<SavedArtifact, TrainerError> {
    fs::create_dir_all(output_dir)?;

    let model_path = output_dir.join(MODEL_FILE_NAME);
    let hash_path = output_dir.join(HASH_FILE_NAME);

    model.save_json(&model_path)?;
    model.write_hash_file(&hash_path)?;

    Ok(SavedArtifact {
        model_path,
        hash_path,
        model_hash: model.metadata.model_hash.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::TicketRecord;
    use ticket_assigner_core::{Labels, Ticket};

    fn dataset(per_class: usize) -> Dataset {
        let mut records = Vec::new();
        for i in 0..per_class {
            records.push(TicketRecord {
                ticket: Ticket::new(
                    format!("Fix login bug {i}"),
                    "Users cannot log in",
                    Labels::from(&["bug", "auth"][..]),
                ),
                assignee: "alice".to_string(),
            });
            records.push(TicketRecord {
                ticket: Ticket::new(
                    format!("Add dark mode {i}"),
                    "UI theme request",
                    Labels::from(&["feature", "ui"][..]),
                ),
                assignee: "bob".to_string(),
            });
        }
        Dataset::new(records)
    }

    fn params() -> TrainingParams {
        TrainingParams {
            forest: ForestParams {
                n_trees: 20,
                ..ForestParams::default()
            },
            ..TrainingParams::default()
        }
    }

    #[test]
    fn test_train_reports_split_and_accuracy() {
        let report = AssigneeTrainer::new(params()).train(&dataset(10)).unwrap();

        assert_eq!(report.training_samples, 16);
        assert_eq!(report.test_samples, 4);
        assert!(report.accuracy.unwrap() > 0.5);
        assert_eq!(report.label_counts["alice"], 10);
        assert_eq!(report.pipeline.labels(), ["alice", "bob"]);
    }

    #[test]
    fn test_no_holdout_means_no_accuracy() {
        let params = TrainingParams {
            test_fraction: 0.0,
            ..params()
        };
        let report = AssigneeTrainer::new(params).train(&dataset(3)).unwrap();
        assert_eq!(report.training_samples, 6);
        assert_eq!(report.accuracy, None);
    }

    #[test]
    fn test_single_row_is_insufficient() {
        let mut data = dataset(1);
        data.records.truncate(1);
        let err = AssigneeTrainer::new(params()).train(&data).unwrap_err();
        assert!(matches!(
            err,
            TrainerError::Training(AssignerError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_artifact_carries_report_figures() {
        let report = AssigneeTrainer::new(params()).train(&dataset(5)).unwrap();
        let artifact = report.to_artifact(1_700_000_000).unwrap();

        assert_eq!(artifact.metadata.trained_at, 1_700_000_000);
        assert_eq!(artifact.metadata.training_samples, report.training_samples);
        assert_eq!(artifact.metadata.test_samples, report.test_samples);
        assert_eq!(artifact.metadata.accuracy, report.accuracy);
        assert_eq!(artifact.metadata.tree_count, 20);
    }
}

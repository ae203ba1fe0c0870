//! Vectorizer + forest behind one fit/predict contract

use crate::errors::{AssignerError, Result};
use crate::forest::{ForestParams, RandomForestClassifier};
use crate::model::{PersistedModel, TrainingSummary};
use crate::tfidf::{FeatureVector, VectorModel};
use crate::ticket::Ticket;
use std::path::Path;
use tracing::{debug, info};

/// Pipeline configuration
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    pub forest: ForestParams,
    /// L2-normalize feature vectors
    pub l2_normalize: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            forest: ForestParams::default(),
            l2_normalize: true,
        }
    }
}

/// TF-IDF vectorizer feeding a random forest.
///
/// The vectorizer is only stored once the forest has been fitted as well, so
/// a failed `fit` leaves the pipeline in its previous state.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
    vectorizer: Option<VectorModel>,
    classifier: RandomForestClassifier,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let classifier = RandomForestClassifier::new(config.forest.clone());
        Self {
            config,
            vectorizer: None,
            classifier,
        }
    }

    /// Fit the vectorizer on `corpus`, then the forest on the transformed corpus
    pub fn fit<S, L>(&mut self, corpus: &[S], labels: &[L]) -> Result<()>
    where
        S: AsRef<str>,
        L: AsRef<str>,
    {
        if corpus.len() != labels.len() {
            return Err(AssignerError::InvalidInput(format!(
                "{} documents but {} labels",
                corpus.len(),
                labels.len()
            )));
        }

        let vectorizer = VectorModel::fit(corpus, self.config.l2_normalize)?;
        info!(
            documents = corpus.len(),
            vocabulary = vectorizer.vocabulary_size(),
            "Fitted vectorizer"
        );

        let x = vectorizer.transform_all(corpus);
        let mut classifier = RandomForestClassifier::new(self.config.forest.clone());
        classifier.fit(&x, labels)?;

        self.vectorizer = Some(vectorizer);
        self.classifier = classifier;
        Ok(())
    }

    pub fn is_fitted(&self) -> bool {
        self.vectorizer.is_some() && self.classifier.is_fitted()
    }

    /// Predict the assignee for a feature text
    pub fn predict(&self, text: &str) -> Result<&str> {
        let features = self.vectorize(text)?;
        self.classifier.predict(&features)
    }

    /// Normalize a ticket and predict its assignee
    pub fn predict_ticket(&self, ticket: &Ticket) -> Result<&str> {
        self.predict(&ticket.feature_text())
    }

    /// Per-label fraction of tree votes, in label order
    pub fn vote_fractions(&self, text: &str) -> Result<Vec<(String, f64)>> {
        let features = self.vectorize(text)?;
        let forest = self.classifier.forest().ok_or(AssignerError::UntrainedModel)?;
        Ok(forest.vote_fractions(&features))
    }

    /// Accuracy on a labelled corpus, in `[0, 1]`
    pub fn score<S, L>(&self, corpus: &[S], labels: &[L]) -> Result<f64>
    where
        S: AsRef<str>,
        L: AsRef<str>,
    {
        if !self.is_fitted() {
            return Err(AssignerError::UntrainedModel);
        }
        if corpus.len() != labels.len() {
            return Err(AssignerError::InvalidInput(format!(
                "{} documents but {} labels",
                corpus.len(),
                labels.len()
            )));
        }
        if corpus.is_empty() {
            return Err(AssignerError::InsufficientData(
                "cannot score an empty test set".to_string(),
            ));
        }

        let mut correct = 0usize;
        for (text, expected) in corpus.iter().zip(labels) {
            if self.predict(text.as_ref())? == expected.as_ref() {
                correct += 1;
            }
        }

        let accuracy = correct as f64 / corpus.len() as f64;
        debug!(correct, total = corpus.len(), accuracy, "Scored pipeline");
        Ok(accuracy)
    }

    /// Known assignees in label-index order; empty until fitted
    pub fn labels(&self) -> &[String] {
        self.classifier
            .forest()
            .map(|forest| forest.labels.as_slice())
            .unwrap_or(&[])
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vectorizer
            .as_ref()
            .map(VectorModel::vocabulary_size)
            .unwrap_or(0)
    }

    pub fn tree_count(&self) -> usize {
        self.classifier.forest().map(|f| f.num_trees()).unwrap_or(0)
    }

    pub fn vectorizer(&self) -> Option<&VectorModel> {
        self.vectorizer.as_ref()
    }

    /// Package the fitted state as a persistable artifact
    pub fn to_artifact(&self, summary: TrainingSummary) -> Result<PersistedModel> {
        match (&self.vectorizer, self.classifier.forest()) {
            (Some(vectorizer), Some(forest)) => {
                PersistedModel::new(vectorizer.clone(), forest.clone(), summary)
            }
            _ => Err(AssignerError::UntrainedModel),
        }
    }

    /// Rebuild a pipeline from a validated artifact
    pub fn from_artifact(model: PersistedModel) -> Result<Self> {
        model.validate()?;

        let PersistedModel {
            vectorizer, forest, ..
        } = model;
        let config = PipelineConfig {
            forest: ForestParams {
                n_trees: forest.num_trees(),
                ..ForestParams::default()
            },
            l2_normalize: vectorizer.l2_normalize,
        };

        Ok(Self {
            config,
            vectorizer: Some(vectorizer),
            classifier: RandomForestClassifier::from_forest(forest),
        })
    }

    /// Load an artifact from disk and rebuild the pipeline
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_artifact(PersistedModel::load_json(path)?)
    }

    fn vectorize(&self, text: &str) -> Result<FeatureVector> {
        self.vectorizer
            .as_ref()
            .map(|v| v.transform(text))
            .ok_or(AssignerError::UntrainedModel)
    }
}

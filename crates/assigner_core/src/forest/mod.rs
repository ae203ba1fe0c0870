//! Random-forest classifier
//!
//! - Each tree is grown on a bootstrap resample with per-node feature
//!   subsampling (see [`cart`]).
//! - Tree `t` draws all of its randomness from `derive_seed(seed, t)`, so the
//!   forest is identical whether trees are built in parallel or one by one.
//! - Prediction is a plain majority vote; ties go to the lowest label index,
//!   and labels are indexed in sorted order.

pub mod cart;
pub mod tree;

pub use cart::{CartBuilder, TreeConfig};
pub use tree::{Node, Tree};

use crate::deterministic::{derive_seed, SplitMix64};
use crate::errors::{AssignerError, Result};
use crate::tfidf::FeatureVector;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Forest training configuration
#[derive(Clone, Debug, PartialEq)]
pub struct ForestParams {
    pub n_trees: usize,
    pub seed: u64,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features evaluated per split; `None` means floor(sqrt(feature count))
    pub max_features: Option<usize>,
    pub bootstrap: bool,
    /// Build trees on the rayon thread pool
    pub parallel: bool,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            seed: 42,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            bootstrap: true,
            parallel: true,
        }
    }
}

impl ForestParams {
    fn tree_config(&self, feature_count: usize) -> TreeConfig {
        let default_features = ((feature_count as f64).sqrt().floor() as usize).max(1);
        TreeConfig {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split.max(2),
            min_samples_leaf: self.min_samples_leaf.max(1),
            max_features: self
                .max_features
                .unwrap_or(default_features)
                .clamp(1, feature_count.max(1)),
        }
    }
}

/// A trained forest: label set, input width and trees
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Forest {
    /// Distinct labels in sorted order; leaf counts are indexed by position
    pub labels: Vec<String>,
    /// Expected feature vector length
    pub feature_count: usize,
    pub trees: Vec<Tree>,
}

impl Forest {
    /// Number of trees voting for each label
    pub fn votes(&self, features: &FeatureVector) -> Vec<u32> {
        let mut votes = vec![0u32; self.labels.len()];
        for tree in &self.trees {
            if let Some(label) = tree.predict(features) {
                votes[label] += 1;
            }
        }
        votes
    }

    /// Index of the majority label
    pub fn predict_index(&self, features: &FeatureVector) -> Result<usize> {
        if features.len() != self.feature_count {
            return Err(AssignerError::InvalidInput(format!(
                "expected {} features, got {}",
                self.feature_count,
                features.len()
            )));
        }
        tree::argmax_lowest(&self.votes(features)).ok_or_else(|| {
            AssignerError::InvalidModel("forest has no labels to vote for".to_string())
        })
    }

    /// Majority label
    pub fn predict(&self, features: &FeatureVector) -> Result<&str> {
        let idx = self.predict_index(features)?;
        Ok(self.labels[idx].as_str())
    }

    /// Fraction of trees voting for each label, in label order
    pub fn vote_fractions(&self, features: &FeatureVector) -> Vec<(String, f64)> {
        let total = self.trees.len().max(1) as f64;
        self.labels
            .iter()
            .cloned()
            .zip(self.votes(features))
            .map(|(label, count)| (label, count as f64 / total))
            .collect()
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Validate the forest structure.
    ///
    /// A single-label forest is accepted here even though training refuses to
    /// produce one; it simply always predicts that label.
    pub fn validate(&self) -> Result<()> {
        if self.labels.is_empty() {
            return Err(AssignerError::InvalidModel("forest has no labels".to_string()));
        }
        if self.labels.windows(2).any(|w| w[0] >= w[1]) {
            return Err(AssignerError::InvalidModel(
                "forest labels must be sorted and distinct".to_string(),
            ));
        }
        if self.trees.is_empty() {
            return Err(AssignerError::InvalidModel("forest has no trees".to_string()));
        }

        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.feature_count, self.labels.len())
                .map_err(|e| AssignerError::InvalidModel(format!("tree {i}: {e}")))?;
        }

        Ok(())
    }
}

/// Random-forest classifier; holds its forest once fitted
#[derive(Debug, Clone, Default)]
pub struct RandomForestClassifier {
    params: ForestParams,
    forest: Option<Forest>,
}

impl RandomForestClassifier {
    pub fn new(params: ForestParams) -> Self {
        Self {
            params,
            forest: None,
        }
    }

    /// Wrap an already trained (e.g. deserialized) forest
    pub fn from_forest(forest: Forest) -> Self {
        Self {
            params: ForestParams {
                n_trees: forest.trees.len(),
                ..ForestParams::default()
            },
            forest: Some(forest),
        }
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    pub fn forest(&self) -> Option<&Forest> {
        self.forest.as_ref()
    }

    pub fn is_fitted(&self) -> bool {
        self.forest.is_some()
    }

    /// Train the forest on feature vectors and their labels.
    pub fn fit<S: AsRef<str>>(&mut self, x: &[FeatureVector], y: &[S]) -> Result<&Forest> {
        let forest = train_forest(x, y, &self.params)?;
        Ok(self.forest.insert(forest))
    }

    /// Majority-vote label for one feature vector
    pub fn predict(&self, features: &FeatureVector) -> Result<&str> {
        self.forest
            .as_ref()
            .ok_or(AssignerError::UntrainedModel)?
            .predict(features)
    }
}

fn train_forest<S: AsRef<str>>(
    x: &[FeatureVector],
    y: &[S],
    params: &ForestParams,
) -> Result<Forest> {
    if x.len() != y.len() {
        return Err(AssignerError::InvalidInput(format!(
            "{} feature vectors but {} labels",
            x.len(),
            y.len()
        )));
    }
    if x.is_empty() {
        return Err(AssignerError::InsufficientData(
            "no training examples".to_string(),
        ));
    }
    if params.n_trees == 0 {
        return Err(AssignerError::InvalidInput(
            "tree count must be positive".to_string(),
        ));
    }

    let feature_count = x[0].len();
    if feature_count == 0 || x.iter().any(|v| v.len() != feature_count) {
        return Err(AssignerError::InvalidInput(
            "feature vectors must share one non-zero length".to_string(),
        ));
    }

    let labels: Vec<String> = y
        .iter()
        .map(|label| label.as_ref().to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if labels.len() < 2 {
        return Err(AssignerError::InsufficientData(format!(
            "need at least 2 distinct labels, found {}",
            labels.len()
        )));
    }

    let encoded: Vec<usize> = y
        .iter()
        .map(|label| {
            labels
                .binary_search_by(|known| known.as_str().cmp(label.as_ref()))
                .unwrap_or_default()
        })
        .collect();

    let config = params.tree_config(feature_count);
    info!(
        trees = params.n_trees,
        samples = x.len(),
        features = feature_count,
        labels = labels.len(),
        max_features = config.max_features,
        "training random forest"
    );

    let builder = CartBuilder::new(x, &encoded, labels.len(), config);
    let n_samples = x.len();
    let build_tree = |tree_idx: usize| -> Tree {
        let mut rng = SplitMix64::new(derive_seed(params.seed, tree_idx as u64));
        let sample: Vec<usize> = if params.bootstrap {
            (0..n_samples).map(|_| rng.next_below(n_samples)).collect()
        } else {
            (0..n_samples).collect()
        };
        let tree = builder.build(&sample, &mut rng);
        debug!(
            tree = tree_idx + 1,
            nodes = tree.nodes.len(),
            depth = tree.depth(),
            "built tree"
        );
        tree
    };

    let trees: Vec<Tree> = if params.parallel {
        (0..params.n_trees).into_par_iter().map(build_tree).collect()
    } else {
        (0..params.n_trees).map(build_tree).collect()
    };

    Ok(Forest {
        labels,
        feature_count,
        trees,
    })
}

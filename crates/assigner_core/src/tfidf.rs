//! TF-IDF feature extraction
//!
//! [`VectorModel::fit`] learns a vocabulary and smoothed inverse document
//! frequencies from a corpus; [`VectorModel::transform`] turns any text into a
//! fixed-width sparse vector using only that learned state.

use crate::errors::{AssignerError, Result};
use crate::tokenizer::tokenize;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Sparse feature vector with a fixed logical length.
///
/// `indices` are strictly increasing and every stored value is non-zero.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    len: usize,
    indices: Vec<usize>,
    values: Vec<f64>,
}

impl FeatureVector {
    /// All-zero vector of the given length
    pub fn zeros(len: usize) -> Self {
        Self {
            len,
            indices: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Build from `(index, value)` pairs; zeros are dropped and indices sorted.
    pub fn from_pairs(len: usize, pairs: impl IntoIterator<Item = (usize, f64)>) -> Self {
        let mut entries: Vec<(usize, f64)> = pairs
            .into_iter()
            .filter(|(idx, value)| *idx < len && *value != 0.0)
            .collect();
        entries.sort_by_key(|(idx, _)| *idx);
        entries.dedup_by_key(|(idx, _)| *idx);

        let (indices, values) = entries.into_iter().unzip();
        Self {
            len,
            indices,
            values,
        }
    }

    /// Logical length (vocabulary size)
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of stored non-zero entries
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    /// Value at `idx`, zero when absent or out of range
    pub fn get(&self, idx: usize) -> f64 {
        match self.indices.binary_search(&idx) {
            Ok(pos) => self.values[pos],
            Err(_) => 0.0,
        }
    }

    /// Iterate over non-zero entries in index order
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    /// Euclidean norm
    pub fn norm(&self) -> f64 {
        self.values.iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    /// Dense copy, mostly useful in tests and debugging
    pub fn to_dense(&self) -> Vec<f64> {
        let mut dense = vec![0.0; self.len];
        for (idx, value) in self.iter() {
            dense[idx] = value;
        }
        dense
    }
}

/// Learned TF-IDF state: vocabulary, IDF weights and normalization flag.
///
/// Immutable after [`VectorModel::fit`]; persisted verbatim in the model
/// artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorModel {
    /// Token -> feature index, indices dense and assigned in sorted token order
    pub vocabulary: BTreeMap<String, usize>,
    /// IDF weight per feature index
    pub idf: Vec<f64>,
    /// Whether transform output is L2-normalized
    pub l2_normalize: bool,
    /// Number of documents seen during fit
    pub document_count: usize,
}

impl VectorModel {
    /// Learn vocabulary and IDF weights from a corpus.
    ///
    /// IDF(t) = ln((1 + N) / (1 + df(t))) + 1
    pub fn fit<S: AsRef<str>>(corpus: &[S], l2_normalize: bool) -> Result<Self> {
        if corpus.is_empty() {
            return Err(AssignerError::EmptyCorpus(
                "corpus contains no documents".to_string(),
            ));
        }

        let mut document_frequency: BTreeMap<String, usize> = BTreeMap::new();
        for doc in corpus {
            let unique: BTreeSet<String> = tokenize(doc.as_ref()).into_iter().collect();
            for token in unique {
                *document_frequency.entry(token).or_insert(0) += 1;
            }
        }

        if document_frequency.is_empty() {
            return Err(AssignerError::EmptyCorpus(format!(
                "{} documents produced no tokens",
                corpus.len()
            )));
        }

        let n = corpus.len() as f64;
        let mut vocabulary = BTreeMap::new();
        let mut idf = Vec::with_capacity(document_frequency.len());
        for (idx, (token, df)) in document_frequency.into_iter().enumerate() {
            idf.push(((1.0 + n) / (1.0 + df as f64)).ln() + 1.0);
            vocabulary.insert(token, idx);
        }

        tracing::debug!(
            documents = corpus.len(),
            vocabulary = vocabulary.len(),
            "fitted tf-idf vocabulary"
        );

        Ok(Self {
            vocabulary,
            idf,
            l2_normalize,
            document_count: corpus.len(),
        })
    }

    /// Vectorize text with the learned state.
    ///
    /// Tokens outside the vocabulary are ignored. With normalization enabled
    /// the result has unit norm, or is all-zero when no known token occurs.
    pub fn transform(&self, text: &str) -> FeatureVector {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for token in tokenize(text) {
            if let Some(&idx) = self.vocabulary.get(&token) {
                *counts.entry(idx).or_insert(0.0) += 1.0;
            }
        }

        let mut weighted: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(idx, tf)| (idx, tf * self.idf[idx]))
            .collect();

        if self.l2_normalize {
            let norm = weighted.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
            if norm > 0.0 {
                for (_, value) in &mut weighted {
                    *value /= norm;
                }
            }
        }

        FeatureVector::from_pairs(self.vocabulary.len(), weighted)
    }

    /// Vectorize every document of a corpus
    pub fn transform_all<S: AsRef<str>>(&self, corpus: &[S]) -> Vec<FeatureVector> {
        corpus.iter().map(|doc| self.transform(doc.as_ref())).collect()
    }

    /// Number of features produced by [`VectorModel::transform`]
    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    /// Check the internal consistency of a deserialized model
    pub fn validate(&self) -> Result<()> {
        if self.vocabulary.is_empty() {
            return Err(AssignerError::InvalidModel("empty vocabulary".to_string()));
        }
        if self.idf.len() != self.vocabulary.len() {
            return Err(AssignerError::InvalidModel(format!(
                "vocabulary has {} tokens but {} idf weights",
                self.vocabulary.len(),
                self.idf.len()
            )));
        }

        let mut seen = vec![false; self.idf.len()];
        for (token, &idx) in &self.vocabulary {
            if idx >= seen.len() || seen[idx] {
                return Err(AssignerError::InvalidModel(format!(
                    "token {token:?} has invalid or duplicate index {idx}"
                )));
            }
            seen[idx] = true;
        }

        if let Some(pos) = self.idf.iter().position(|w| !w.is_finite() || *w <= 0.0) {
            return Err(AssignerError::InvalidModel(format!(
                "idf weight {pos} is not a positive finite number"
            )));
        }

        Ok(())
    }
}

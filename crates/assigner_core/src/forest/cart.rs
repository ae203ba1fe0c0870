//! CART (Classification and Regression Tree) builder
//!
//! Grows one classification tree with exact-greedy Gini splits over a random
//! subset of features per node. Every random choice comes from the caller's
//! [`SplitMix64`], so a fixed seed always yields the same tree.

use super::tree::{Node, Tree};
use crate::deterministic::{SplitMix64, SplitTieBreaker};
use crate::tfidf::FeatureVector;

/// Growth limits for a single tree
#[derive(Clone, Debug)]
pub struct TreeConfig {
    /// Maximum depth, `None` grows until leaves are pure
    pub max_depth: Option<usize>,
    /// Minimum samples a node needs before it may split
    pub min_samples_split: usize,
    /// Minimum samples on each side of a split
    pub min_samples_leaf: usize,
    /// Non-constant features evaluated per node
    pub max_features: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: 1,
        }
    }
}

/// Split candidate with impurity decrease and tie-breaker
#[derive(Debug, Clone)]
struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
    tie_breaker: SplitTieBreaker,
}

impl SplitCandidate {
    fn new(feature_idx: usize, threshold: f64, gain: f64) -> Self {
        Self {
            feature_idx,
            threshold,
            gain,
            tie_breaker: SplitTieBreaker::new(feature_idx, threshold),
        }
    }

    fn beats(&self, other: &SplitCandidate) -> bool {
        self.gain > other.gain
            || (self.gain == other.gain && self.tie_breaker.cmp_key(&other.tie_breaker).is_lt())
    }
}

/// Node waiting to be grown: its samples, depth and the parent slot to patch
struct PendingNode {
    indices: Vec<usize>,
    depth: usize,
    parent: Option<(usize, bool)>,
}

/// Build a classification tree using the exact-greedy CART algorithm
pub struct CartBuilder<'a> {
    config: TreeConfig,
    features: &'a [FeatureVector],
    labels: &'a [usize],
    label_count: usize,
}

impl<'a> CartBuilder<'a> {
    /// `labels[i]` is the encoded label of `features[i]`
    pub fn new(
        features: &'a [FeatureVector],
        labels: &'a [usize],
        label_count: usize,
        config: TreeConfig,
    ) -> Self {
        debug_assert_eq!(features.len(), labels.len());

        Self {
            config,
            features,
            labels,
            label_count,
        }
    }

    /// Build a tree over `sample`, a list of row positions that may repeat
    /// (bootstrap draws count once per occurrence).
    ///
    /// Nodes are laid out in pre-order, left subtree first. Growth uses an
    /// explicit work stack, so degenerate chain-shaped trees on sparse text
    /// cannot overflow the thread stack.
    pub fn build(&self, sample: &[usize], rng: &mut SplitMix64) -> Tree {
        let mut nodes: Vec<Node> = Vec::new();
        let mut pending = vec![PendingNode {
            indices: sample.to_vec(),
            depth: 0,
            parent: None,
        }];

        while let Some(PendingNode {
            indices,
            depth,
            parent,
        }) = pending.pop()
        {
            let current_idx = nodes.len();
            match parent {
                Some((p, true)) => nodes[p].left = current_idx as i32,
                Some((p, false)) => nodes[p].right = current_idx as i32,
                None => {}
            }

            let counts = self.class_counts(&indices);
            let is_pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
            let depth_reached = self.config.max_depth.is_some_and(|max| depth >= max);
            if is_pure
                || depth_reached
                || indices.len() < self.config.min_samples_split
                || indices.len() < 2 * self.config.min_samples_leaf
            {
                nodes.push(Node::leaf(current_idx as i32, counts));
                continue;
            }

            let Some(split) = self.find_best_split(&indices, &counts, rng) else {
                nodes.push(Node::leaf(current_idx as i32, counts));
                continue;
            };

            let (left_indices, right_indices) =
                self.split_samples(&indices, split.feature_idx, split.threshold);

            // Children are patched in when they are popped.
            nodes.push(Node::internal(
                current_idx as i32,
                split.feature_idx as i32,
                split.threshold,
                -1,
                -1,
            ));

            pending.push(PendingNode {
                indices: right_indices,
                depth: depth + 1,
                parent: Some((current_idx, false)),
            });
            pending.push(PendingNode {
                indices: left_indices,
                depth: depth + 1,
                parent: Some((current_idx, true)),
            });
        }

        Tree { nodes }
    }

    /// Best split over a random subset of the node's non-constant features.
    ///
    /// Only features with a non-zero value in at least one sample of the node
    /// are candidates; any other feature is constant zero there. Candidates
    /// are drawn without replacement in seed order, and constant ones do not
    /// count toward `max_features`.
    fn find_best_split(
        &self,
        indices: &[usize],
        parent_counts: &[u32],
        rng: &mut SplitMix64,
    ) -> Option<SplitCandidate> {
        let n = indices.len();
        let parent_gini = gini(parent_counts, n);

        // (feature, value, label) for every stored entry, grouped by feature
        let mut entries: Vec<(usize, f64, usize)> = indices
            .iter()
            .flat_map(|&i| {
                let label = self.labels[i];
                self.features[i].iter().map(move |(f, v)| (f, v, label))
            })
            .collect();
        entries.sort_unstable_by_key(|&(f, _, _)| f);

        let mut columns: Vec<(usize, usize, usize)> = Vec::new();
        let mut start = 0;
        while start < entries.len() {
            let feature_idx = entries[start].0;
            let mut end = start + 1;
            while end < entries.len() && entries[end].0 == feature_idx {
                end += 1;
            }
            columns.push((feature_idx, start, end));
            start = end;
        }

        let mut best: Option<SplitCandidate> = None;
        let mut visited = 0usize;
        let mut pos = 0usize;

        while pos < columns.len() && visited < self.config.max_features {
            let pick = pos + rng.next_below(columns.len() - pos);
            columns.swap(pos, pick);
            let (feature_idx, start, end) = columns[pos];
            pos += 1;

            let mut column: Vec<(f64, usize)> =
                entries[start..end].iter().map(|&(_, v, l)| (v, l)).collect();
            column.sort_by(|a, b| a.0.total_cmp(&b.0));

            let zeros = n - column.len();
            let constant = zeros == 0 && column.first().map(|e| e.0) == column.last().map(|e| e.0);
            if constant {
                continue;
            }
            visited += 1;

            if let Some(candidate) =
                self.scan_column(feature_idx, &column, zeros, parent_counts, parent_gini)
            {
                if best.as_ref().map_or(true, |current| candidate.beats(current)) {
                    best = Some(candidate);
                }
            }
        }

        best
    }

    /// Best threshold on one feature. `column` holds the node's non-zero
    /// entries sorted by value; the remaining `zeros` samples sit at 0.0.
    fn scan_column(
        &self,
        feature_idx: usize,
        column: &[(f64, usize)],
        zeros: usize,
        parent_counts: &[u32],
        parent_gini: f64,
    ) -> Option<SplitCandidate> {
        let n = column.len() + zeros;

        let mut zero_counts = parent_counts.to_vec();
        for &(_, label) in column {
            zero_counts[label] -= 1;
        }

        // None marks the block of implicit zeros
        let zero_at = column.partition_point(|e| e.0 < 0.0);
        let mut steps: Vec<(f64, Option<usize>)> = Vec::with_capacity(column.len() + 1);
        steps.extend(column[..zero_at].iter().map(|&(v, l)| (v, Some(l))));
        if zeros > 0 {
            steps.push((0.0, None));
        }
        steps.extend(column[zero_at..].iter().map(|&(v, l)| (v, Some(l))));

        let mut left_counts = vec![0u32; self.label_count];
        let mut right_counts = parent_counts.to_vec();
        let mut n_left = 0usize;
        let mut best: Option<SplitCandidate> = None;

        for i in 0..steps.len() - 1 {
            let (value, label) = steps[i];
            match label {
                Some(label) => {
                    left_counts[label] += 1;
                    right_counts[label] -= 1;
                    n_left += 1;
                }
                None => {
                    for (label, &count) in zero_counts.iter().enumerate() {
                        left_counts[label] += count;
                        right_counts[label] -= count;
                    }
                    n_left += zeros;
                }
            }

            let next_value = steps[i + 1].0;
            if value == next_value {
                continue;
            }

            let n_right = n - n_left;
            if n_left < self.config.min_samples_leaf || n_right < self.config.min_samples_leaf {
                continue;
            }

            let mut threshold = value / 2.0 + next_value / 2.0;
            if threshold >= next_value || !threshold.is_finite() {
                threshold = value;
            }

            let weighted = (n_left as f64 / n as f64) * gini(&left_counts, n_left)
                + (n_right as f64 / n as f64) * gini(&right_counts, n_right);
            let candidate = SplitCandidate::new(feature_idx, threshold, parent_gini - weighted);

            if best.as_ref().map_or(true, |current| candidate.beats(current)) {
                best = Some(candidate);
            }
        }

        best
    }

    fn split_samples(
        &self,
        indices: &[usize],
        feature_idx: usize,
        threshold: f64,
    ) -> (Vec<usize>, Vec<usize>) {
        indices
            .iter()
            .copied()
            .partition(|&i| self.features[i].get(feature_idx) <= threshold)
    }

    fn class_counts(&self, indices: &[usize]) -> Vec<u32> {
        let mut counts = vec![0u32; self.label_count];
        for &i in indices {
            counts[self.labels[i]] += 1;
        }
        counts
    }
}

/// Gini impurity: 1 - sum(p_k^2)
fn gini(counts: &[u32], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / total;
            p * p
        })
        .sum::<f64>()
}

//! Decision tree structures for forest inference
//!
//! Trees are stored as flat node arrays with node 0 as the root, the same
//! shape they take in the persisted artifact.

use crate::tfidf::FeatureVector;
use serde::{Deserialize, Serialize};

/// A decision tree node (internal or leaf)
///
/// For internal nodes:
/// - `feature_idx >= 0`: index into the feature vector
/// - `left` and `right` point to child node indices
/// - `counts` is `None`
///
/// For leaf nodes:
/// - `feature_idx == -1`
/// - `counts` holds the number of training samples per label index
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    /// Node ID (position in the node array)
    pub id: i32,

    /// Left child index (-1 for leaf nodes)
    pub left: i32,

    /// Right child index (-1 for leaf nodes)
    pub right: i32,

    /// Feature index to split on (-1 for leaf nodes)
    pub feature_idx: i32,

    /// Samples with `value <= threshold` go left
    pub threshold: f64,

    /// Per-label sample counts (Some for leaf nodes)
    pub counts: Option<Vec<u32>>,
}

impl Node {
    /// Create a new internal (split) node
    pub fn internal(id: i32, feature_idx: i32, threshold: f64, left: i32, right: i32) -> Self {
        Self {
            id,
            left,
            right,
            feature_idx,
            threshold,
            counts: None,
        }
    }

    /// Create a new leaf node
    pub fn leaf(id: i32, counts: Vec<u32>) -> Self {
        Self {
            id,
            left: -1,
            right: -1,
            feature_idx: -1,
            threshold: 0.0,
            counts: Some(counts),
        }
    }

    /// Check if this node is a leaf
    pub fn is_leaf(&self) -> bool {
        self.feature_idx == -1 || self.counts.is_some()
    }

    /// Label index with the highest count; ties go to the lowest index
    pub fn majority_label(&self) -> Option<usize> {
        self.counts.as_deref().and_then(argmax_lowest)
    }
}

/// Position of the largest value, preferring the lowest index on ties
pub(crate) fn argmax_lowest(counts: &[u32]) -> Option<usize> {
    let mut best: Option<(usize, u32)> = None;
    for (idx, &count) in counts.iter().enumerate() {
        match best {
            Some((_, best_count)) if count <= best_count => {}
            _ => best = Some((idx, count)),
        }
    }
    best.map(|(idx, _)| idx)
}

/// A single classification tree
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tree {
    /// Tree nodes (node 0 is the root)
    pub nodes: Vec<Node>,
}

impl Tree {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// Route a feature vector to its leaf
    pub fn leaf_for(&self, features: &FeatureVector) -> Option<&Node> {
        let mut idx = 0usize;

        // A valid tree reaches a leaf in at most `nodes.len()` steps.
        for _ in 0..=self.nodes.len() {
            let node = self.nodes.get(idx)?;
            if node.is_leaf() {
                return Some(node);
            }

            let value = features.get(node.feature_idx as usize);
            let next = if value <= node.threshold {
                node.left
            } else {
                node.right
            };
            if next < 0 {
                return None;
            }
            idx = next as usize;
        }

        None
    }

    /// The label index this tree votes for
    pub fn predict(&self, features: &FeatureVector) -> Option<usize> {
        self.leaf_for(features).and_then(Node::majority_label)
    }

    /// Depth of the deepest leaf (root-only tree has depth 0)
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((idx, depth)) = stack.pop() {
            match self.nodes.get(idx) {
                Some(node) if !node.is_leaf() => {
                    stack.push((node.left as usize, depth + 1));
                    stack.push((node.right as usize, depth + 1));
                }
                _ => deepest = deepest.max(depth),
            }
        }
        deepest
    }

    /// Validate tree structure against the model's feature and label counts
    pub fn validate(&self, feature_count: usize, label_count: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("Tree has no nodes".to_string());
        }

        for (i, node) in self.nodes.iter().enumerate() {
            if node.is_leaf() {
                match &node.counts {
                    None => return Err(format!("Leaf node {i} has no class counts")),
                    Some(counts) if counts.len() != label_count => {
                        return Err(format!(
                            "Leaf node {i} has {} class counts, expected {label_count}",
                            counts.len()
                        ))
                    }
                    Some(_) => {}
                }
                continue;
            }

            // Children must come after their parent, which also rules out cycles.
            for (side, child) in [("left", node.left), ("right", node.right)] {
                if child <= i as i32 || child as usize >= self.nodes.len() {
                    return Err(format!("Node {i} has invalid {side} child: {child}"));
                }
            }

            if node.feature_idx < 0 || node.feature_idx as usize >= feature_count {
                return Err(format!(
                    "Internal node {i} has invalid feature index: {}",
                    node.feature_idx
                ));
            }

            if !node.threshold.is_finite() {
                return Err(format!("Internal node {i} has a non-finite threshold"));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump() -> Tree {
        // feature 0 <= 0.5 -> label 0, else label 1
        Tree::new(vec![
            Node::internal(0, 0, 0.5, 1, 2),
            Node::leaf(1, vec![3, 1]),
            Node::leaf(2, vec![0, 4]),
        ])
    }

    #[test]
    fn test_node_creation() {
        let internal = Node::internal(0, 3, 0.25, 1, 2);
        assert!(!internal.is_leaf());
        assert_eq!(internal.majority_label(), None);

        let leaf = Node::leaf(1, vec![1, 5, 2]);
        assert!(leaf.is_leaf());
        assert_eq!(leaf.feature_idx, -1);
        assert_eq!(leaf.majority_label(), Some(1));
    }

    #[test]
    fn test_majority_ties_go_to_lowest_label() {
        assert_eq!(argmax_lowest(&[2, 5, 5]), Some(1));
        assert_eq!(argmax_lowest(&[0, 0]), Some(0));
        assert_eq!(argmax_lowest(&[]), None);
    }

    #[test]
    fn test_tree_prediction() {
        let tree = stump();
        let low = FeatureVector::from_pairs(2, vec![(0, 0.2)]);
        let edge = FeatureVector::from_pairs(2, vec![(0, 0.5)]);
        let high = FeatureVector::from_pairs(2, vec![(0, 0.9)]);

        assert_eq!(tree.predict(&low), Some(0));
        assert_eq!(tree.predict(&edge), Some(0)); // Equal goes left
        assert_eq!(tree.predict(&high), Some(1));
        assert_eq!(tree.predict(&FeatureVector::zeros(2)), Some(0));
    }

    #[test]
    fn test_tree_validation() {
        assert!(stump().validate(2, 2).is_ok());
        assert!(stump().validate(2, 3).is_err());
        assert!(stump().validate(0, 2).is_err());

        let bad_child = Tree::new(vec![
            Node::internal(0, 0, 0.5, 5, 2),
            Node::leaf(1, vec![1, 0]),
            Node::leaf(2, vec![0, 1]),
        ]);
        assert!(bad_child.validate(2, 2).is_err());

        let cycle = Tree::new(vec![
            Node::internal(0, 0, 0.5, 1, 2),
            Node::internal(1, 0, 0.2, 0, 2),
            Node::leaf(2, vec![0, 1]),
        ]);
        assert!(cycle.validate(2, 2).is_err());
    }

    #[test]
    fn test_depth() {
        assert_eq!(stump().depth(), 1);
        assert_eq!(Tree::new(vec![Node::leaf(0, vec![1])]).depth(), 0);
    }
}

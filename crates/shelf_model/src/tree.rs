//! Regression tree structures
//!
//! Integer-only tree nodes and traversal. Thresholds and leaf values are
//! fixed-point integers at `SCALE` precision.

use serde::{Deserialize, Serialize};

/// One node of a regression tree, stored flat in [`Tree::nodes`].
///
/// For split nodes `feature_idx >= 0` and `left`/`right` point to child
/// node indices. Leaf nodes carry `feature_idx == -1` and a `leaf` value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Node {
    /// Position in `Tree::nodes` at build time
    pub id: i32,
    pub left: i32,
    pub right: i32,
    /// Column of `FEATURE_NAMES`; -1 on leaves
    pub feature_idx: i32,

    /// Split threshold; samples with `feature <= threshold` go left
    pub threshold: i64,

    /// Fixed-point output on leaves
    pub leaf: Option<i64>,
}

impl Node {
    pub fn internal(id: i32, feature_idx: i32, threshold: i64, left: i32, right: i32) -> Self {
        Self {
            id,
            left,
            right,
            feature_idx,
            threshold,
            leaf: None,
        }
    }

    pub fn leaf(id: i32, value: i64) -> Self {
        Self {
            id,
            left: -1,
            right: -1,
            feature_idx: -1,
            threshold: 0,
            leaf: Some(value),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.feature_idx == -1 || self.leaf.is_some()
    }
}

/// A single regression tree
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Tree {
    /// Root first; children always follow their parent
    pub nodes: Vec<Node>,

    /// Shrinkage applied to this tree's output (fixed-point, SCALE = 1.0)
    pub weight: i64,
}

impl Tree {
    pub fn new(nodes: Vec<Node>, weight: i64) -> Self {
        Self { nodes, weight }
    }

    /// Evaluate this tree on a fixed-point feature vector.
    ///
    /// Malformed structure (dangling child, bad feature index) yields 0.
    pub fn evaluate(&self, features: &[i64]) -> i64 {
        let mut idx = 0usize;

        loop {
            let Some(node) = self.nodes.get(idx) else {
                return 0;
            };

            if node.is_leaf() {
                return node.leaf.unwrap_or(0);
            }

            let Some(&value) = usize::try_from(node.feature_idx)
                .ok()
                .and_then(|f| features.get(f))
            else {
                return 0;
            };

            let next = if value <= node.threshold {
                node.left
            } else {
                node.right
            };
            match usize::try_from(next) {
                Ok(next) if next < self.nodes.len() => idx = next,
                _ => return 0,
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match nodes.get(idx) {
                Some(node) if !node.is_leaf() => {
                    1 + walk(nodes, node.left as usize).max(walk(nodes, node.right as usize))
                }
                _ => 0,
            }
        }
        walk(&self.nodes, 0)
    }

    /// Reject dangling or backward child links and split nodes without a feature
    pub fn validate(&self) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }

        for (i, node) in self.nodes.iter().enumerate() {
            if node.is_leaf() {
                if node.leaf.is_none() {
                    return Err(format!("leaf node {i} has no leaf value"));
                }
                continue;
            }

            // Children are always appended after their parent
            for child in [node.left, node.right] {
                if child <= i as i32 || child as usize >= self.nodes.len() {
                    return Err(format!("node {i} has invalid child: {child}"));
                }
            }
            if node.feature_idx < 0 {
                return Err(format!(
                    "internal node {i} has invalid feature index: {}",
                    node.feature_idx
                ));
            }
        }

        Ok(())
    }
}

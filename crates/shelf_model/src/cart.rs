//! CART (Classification and Regression Tree) builder
//!
//! Implements deterministic exact-greedy regression tree construction
//! with fixed-point arithmetic only.

use crate::deterministic::SplitTieBreaker;
use crate::tree::{Node, Tree};

/// Training parameters for a single tree
#[derive(Clone, Debug)]
pub struct TreeConfig {
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    pub quant_step: i64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 6,
            min_samples_leaf: 1,
            quant_step: 10_000,
        }
    }
}

/// Split candidate with gain and tie-breaker
#[derive(Debug, Clone)]
struct SplitCandidate {
    feature_idx: usize,
    threshold: i64,
    gain: i128,
    tie_breaker: SplitTieBreaker,
}

impl SplitCandidate {
    fn new(feature_idx: usize, threshold: i64, gain: i128, node_id: usize) -> Self {
        Self {
            feature_idx,
            threshold,
            gain,
            tie_breaker: SplitTieBreaker::new(feature_idx, threshold, node_id),
        }
    }

    fn beats(&self, other: &SplitCandidate) -> bool {
        self.gain > other.gain || (self.gain == other.gain && self.tie_breaker < other.tie_breaker)
    }
}

/// Build a regression tree over borrowed rows using the exact-greedy CART algorithm
pub struct CartBuilder<'a> {
    config: TreeConfig,
    features: &'a [Vec<i64>],
    gradients: &'a [i64],
    hessians: &'a [i64],
    feature_count: usize,
}

impl<'a> CartBuilder<'a> {
    pub fn new(
        features: &'a [Vec<i64>],
        gradients: &'a [i64],
        hessians: &'a [i64],
        config: TreeConfig,
    ) -> Self {
        debug_assert_eq!(features.len(), gradients.len());
        debug_assert_eq!(features.len(), hessians.len());

        let feature_count = features.first().map_or(0, Vec::len);

        Self {
            config,
            features,
            gradients,
            hessians,
            feature_count,
        }
    }

    /// Build a tree over every row
    pub fn build(&self) -> Tree {
        let rows: Vec<usize> = (0..self.features.len()).collect();
        self.build_on(&rows)
    }

    /// Build a tree over a subset of rows; node weights default to 1.0
    pub fn build_on(&self, rows: &[usize]) -> Tree {
        let mut nodes = Vec::new();
        self.build_node(rows, 0, &mut nodes, 0);
        Tree::new(nodes, crate::deterministic::SCALE)
    }

    fn build_node(&self, indices: &[usize], depth: usize, nodes: &mut Vec<Node>, node_id: usize) -> i32 {
        let current = nodes.len() as i32;
        let leaf_value = self.calculate_leaf_value(indices);

        if depth >= self.config.max_depth || indices.len() < 2 * self.config.min_samples_leaf.max(1) {
            nodes.push(Node::leaf(current, leaf_value));
            return current;
        }

        let Some(split) = self.find_best_split(indices, node_id) else {
            nodes.push(Node::leaf(current, leaf_value));
            return current;
        };

        let (left_rows, right_rows) = self.split_samples(indices, split.feature_idx, split.threshold);

        // Reserve the slot; children are patched in once built
        nodes.push(Node::internal(
            current,
            split.feature_idx as i32,
            split.threshold,
            -1,
            -1,
        ));

        let left = self.build_node(&left_rows, depth + 1, nodes, node_id * 2 + 1);
        let right = self.build_node(&right_rows, depth + 1, nodes, node_id * 2 + 2);

        nodes[current as usize].left = left;
        nodes[current as usize].right = right;

        current
    }

    /// Sort each feature once, then sweep thresholds left to right with running sums
    fn find_best_split(&self, indices: &[usize], node_id: usize) -> Option<SplitCandidate> {
        let (g_parent, h_parent) = self.sum_gradients_hessians(indices);
        let parent_score = score(g_parent, h_parent);
        let min_leaf = self.config.min_samples_leaf.max(1);
        let step = self.config.quant_step.max(1);

        let mut best: Option<SplitCandidate> = None;
        let mut column: Vec<(i64, i128, i128)> = Vec::with_capacity(indices.len());

        for feature_idx in 0..self.feature_count {
            column.clear();
            column.extend(indices.iter().map(|&idx| {
                (
                    self.features[idx][feature_idx],
                    self.gradients[idx] as i128,
                    self.hessians[idx] as i128,
                )
            }));
            column.sort_unstable_by_key(|&(value, _, _)| value);

            let (mut g_left, mut h_left) = (0i128, 0i128);
            let mut cursor = 0usize;
            let mut previous: Option<i64> = None;

            for &(value, _, _) in &column {
                // Quantized thresholds arrive in ascending order
                let threshold = value.div_euclid(step) * step;
                if previous == Some(threshold) {
                    continue;
                }
                previous = Some(threshold);

                while cursor < column.len() && column[cursor].0 <= threshold {
                    g_left += column[cursor].1;
                    h_left += column[cursor].2;
                    cursor += 1;
                }

                if cursor < min_leaf || column.len() - cursor < min_leaf {
                    continue;
                }

                let gain = score(g_left, h_left) + score(g_parent - g_left, h_parent - h_left) - parent_score;
                if gain <= 0 {
                    continue;
                }

                let candidate = SplitCandidate::new(feature_idx, threshold, gain, node_id);
                if best.as_ref().map_or(true, |current| candidate.beats(current)) {
                    best = Some(candidate);
                }
            }
        }

        best
    }

    fn split_samples(&self, indices: &[usize], feature_idx: usize, threshold: i64) -> (Vec<usize>, Vec<usize>) {
        indices
            .iter()
            .partition(|&&idx| self.features[idx][feature_idx] <= threshold)
    }

    fn sum_gradients_hessians(&self, indices: &[usize]) -> (i128, i128) {
        indices.iter().fold((0i128, 0i128), |(g, h), &idx| {
            (g + self.gradients[idx] as i128, h + self.hessians[idx] as i128)
        })
    }

    /// Optimal leaf value -G/H, scaled by the unit hessian
    fn calculate_leaf_value(&self, indices: &[usize]) -> i64 {
        let (sum_g, sum_h) = self.sum_gradients_hessians(indices);
        if sum_h == 0 {
            return 0;
        }

        let value = -(sum_g * HESSIAN_UNIT as i128) / sum_h;
        value.clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }
}

/// Hessian of squared loss per sample, in the same fixed-point unit the trainer uses
pub const HESSIAN_UNIT: i64 = 1000;

/// Structure score G²/H
fn score(g: i128, h: i128) -> i128 {
    if h > 0 {
        g.saturating_mul(g) / h
    } else {
        0
    }
}

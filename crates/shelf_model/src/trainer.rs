//! Gradient Boosted Decision Tree (GBDT) trainer
//!
//! Implements deterministic GBDT training for squared loss with fixed-point
//! arithmetic and exact-greedy CART splits.

use serde::{Deserialize, Serialize};

use crate::cart::{CartBuilder, TreeConfig, HESSIAN_UNIT};
use crate::deterministic::{LcgRng, SCALE};
use crate::errors::{ModelError, Result};
use crate::model::{BoostedModel, ModelMetadata, MODEL_VERSION};
use crate::tree::Tree;

/// GBDT training configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GbdtConfig {
    pub num_trees: usize,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// Fixed-point, 100_000 = 0.1
    pub learning_rate: i64,
    /// Threshold quantization step in fixed-point units
    pub quant_step: i64,
    /// Fraction of rows drawn per tree, fixed-point (1_000_000 = all rows)
    pub subsample: i64,
    pub seed: i64,
}

impl Default for GbdtConfig {
    fn default() -> Self {
        Self {
            num_trees: 100,
            max_depth: 6,
            min_samples_leaf: 1,
            learning_rate: 100_000, // 0.1 in fixed-point
            quant_step: 10_000,     // 0.01 in feature units
            subsample: SCALE,
            seed: 42,
        }
    }
}

impl GbdtConfig {
    pub fn validate(&self) -> Result<()> {
        if self.num_trees == 0 {
            return Err(ModelError::ValidationFailed("num_trees must be positive".to_string()));
        }
        if self.learning_rate <= 0 || self.learning_rate > SCALE {
            return Err(ModelError::ValidationFailed(format!(
                "learning_rate must be in (0, {SCALE}], got {}",
                self.learning_rate
            )));
        }
        if self.subsample <= 0 || self.subsample > SCALE {
            return Err(ModelError::ValidationFailed(format!(
                "subsample must be in (0, {SCALE}], got {}",
                self.subsample
            )));
        }
        if self.quant_step <= 0 {
            return Err(ModelError::ValidationFailed("quant_step must be positive".to_string()));
        }
        Ok(())
    }
}

/// GBDT trainer
pub struct GbdtTrainer {
    config: GbdtConfig,
}

impl GbdtTrainer {
    pub fn new(config: GbdtConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GbdtConfig {
        &self.config
    }

    /// Train on fixed-point feature rows and fixed-point targets
    pub fn train(&self, features: &[Vec<i64>], targets: &[i64]) -> Result<BoostedModel> {
        self.config.validate()?;

        if features.is_empty() || features.len() != targets.len() {
            return Err(ModelError::InsufficientData(format!(
                "{} feature rows for {} targets",
                features.len(),
                targets.len()
            )));
        }

        let feature_count = features[0].len();
        if features.iter().any(|row| row.len() != feature_count) {
            return Err(ModelError::InsufficientData(
                "feature rows differ in width".to_string(),
            ));
        }

        let bias = calculate_bias(targets);
        let mut predictions = vec![bias; targets.len()];
        let hessians = vec![HESSIAN_UNIT; targets.len()];
        let mut rng = LcgRng::new(self.config.seed);

        let tree_config = TreeConfig {
            max_depth: self.config.max_depth,
            min_samples_leaf: self.config.min_samples_leaf,
            quant_step: self.config.quant_step,
        };

        let mut trees = Vec::with_capacity(self.config.num_trees);

        for tree_idx in 0..self.config.num_trees {
            tracing::trace!("Training tree {}/{}", tree_idx + 1, self.config.num_trees);

            let gradients = calculate_gradients(targets, &predictions);
            let rows = self.sample_rows(targets.len(), &mut rng);

            let builder = CartBuilder::new(features, &gradients, &hessians, tree_config.clone());
            let mut tree = builder.build_on(&rows);
            tree.weight = self.config.learning_rate;

            update_predictions(&tree, features, &mut predictions);
            trees.push(tree);
        }

        let max_depth = trees.iter().map(Tree::depth).max().unwrap_or(0);
        let mut model = BoostedModel {
            version: MODEL_VERSION,
            scale: SCALE,
            bias,
            trees,
            metadata: ModelMetadata {
                feature_count,
                tree_count: self.config.num_trees,
                max_depth,
                training_samples: targets.len(),
                created_at: chrono::Utc::now().timestamp(),
                training_data_hash: String::new(),
                model_hash: String::new(),
            },
        };
        model.metadata.model_hash = model.hash_hex()?;

        Ok(model)
    }

    /// Rows used for one tree; every row unless subsampling is enabled
    fn sample_rows(&self, n: usize, rng: &mut LcgRng) -> Vec<usize> {
        if self.config.subsample >= SCALE {
            return (0..n).collect();
        }

        let mut rows: Vec<usize> = (0..n)
            .filter(|_| rng.next_unit_micro() < self.config.subsample)
            .collect();
        if rows.is_empty() {
            rows.push(rng.next_range(n as i64) as usize);
        }
        rows
    }
}

/// Initial bias (mean of targets)
fn calculate_bias(targets: &[i64]) -> i64 {
    if targets.is_empty() {
        return 0;
    }
    let sum: i128 = targets.iter().map(|&t| t as i128).sum();
    (sum / targets.len() as i128) as i64
}

/// Gradient of squared loss: prediction - target
fn calculate_gradients(targets: &[i64], predictions: &[i64]) -> Vec<i64> {
    targets
        .iter()
        .zip(predictions)
        .map(|(&t, &p)| p.saturating_sub(t))
        .collect()
}

fn update_predictions(tree: &Tree, features: &[Vec<i64>], predictions: &mut [i64]) {
    for (pred, row) in predictions.iter_mut().zip(features) {
        let scaled = (tree.evaluate(row) as i128 * tree.weight as i128) / SCALE as i128;
        *pred = pred.saturating_add(scaled as i64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simple_dataset() -> (Vec<Vec<i64>>, Vec<i64>) {
        (
            vec![
                vec![100_000, 200_000],
                vec![200_000, 300_000],
                vec![300_000, 400_000],
                vec![400_000, 500_000],
            ],
            vec![1_000_000, 2_000_000, 3_000_000, 4_000_000],
        )
    }

    fn small_config(num_trees: usize) -> GbdtConfig {
        GbdtConfig {
            num_trees,
            max_depth: 2,
            min_samples_leaf: 1,
            learning_rate: 100_000,
            quant_step: 50_000,
            ..GbdtConfig::default()
        }
    }

    #[test]
    fn test_train_simple_model() -> Result<()> {
        let (features, targets) = simple_dataset();
        let model = GbdtTrainer::new(small_config(4)).train(&features, &targets)?;

        assert_eq!(model.trees.len(), 4);
        assert_eq!(model.metadata.feature_count, 2);
        assert_eq!(model.metadata.training_samples, 4);
        assert!(model.trees.iter().all(|t| t.weight == 100_000));
        assert_eq!(model.metadata.model_hash.len(), 64);

        Ok(())
    }

    #[test]
    fn test_bias_calculation() {
        let targets = vec![1_000_000, 2_000_000, 3_000_000];
        assert_eq!(calculate_bias(&targets), 2_000_000);
    }

    #[test]
    fn test_boosting_reduces_error() -> Result<()> {
        let (features, targets) = simple_dataset();
        let model = GbdtTrainer::new(small_config(60)).train(&features, &targets)?;

        for (row, &target) in features.iter().zip(&targets) {
            let err = (model.score(row) - target).abs();
            assert!(err < 50_000, "error {err} too large for target {target}");
        }
        Ok(())
    }

    #[test]
    fn test_determinism() -> Result<()> {
        let (features, targets) = simple_dataset();
        let config = GbdtConfig {
            subsample: 600_000,
            ..small_config(8)
        };

        let model1 = GbdtTrainer::new(config.clone()).train(&features, &targets)?;
        let model2 = GbdtTrainer::new(config).train(&features, &targets)?;

        assert_eq!(model1.bias, model2.bias);
        assert_eq!(model1.trees, model2.trees);
        assert_eq!(model1.metadata.model_hash, model2.metadata.model_hash);
        Ok(())
    }

    #[test]
    fn test_rejects_mismatched_lengths() {
        let (features, _) = simple_dataset();
        let err = GbdtTrainer::new(small_config(1)).train(&features, &[1]).unwrap_err();
        assert!(matches!(err, ModelError::InsufficientData(_)));

        let err = GbdtTrainer::new(small_config(1)).train(&[], &[]).unwrap_err();
        assert!(matches!(err, ModelError::InsufficientData(_)));
    }

    #[test]
    fn test_invalid_config() {
        let (features, targets) = simple_dataset();
        let config = GbdtConfig {
            learning_rate: 0,
            ..GbdtConfig::default()
        };
        let err = GbdtTrainer::new(config).train(&features, &targets).unwrap_err();
        assert!(matches!(err, ModelError::ValidationFailed(_)));
    }
}

//! Boosted shelf-life model with deterministic inference
//!
//! - Fixed-point trees and bias (`SCALE = 1e6`)
//! - Canonical JSON serialization (sorted keys, compact)
//! - BLAKE3 model hashing over the inference-relevant fields

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::deterministic::{from_fixed, to_fixed, SCALE};
use crate::errors::{ModelError, Result};
use crate::trainer::{GbdtConfig, GbdtTrainer};
use crate::tree::Tree;

/// Current on-disk model format version
pub const MODEL_VERSION: i32 = 1;

/// Names of the model inputs, in feature-vector order
pub const FEATURE_NAMES: [&str; 3] = ["temperature_c", "ph", "category_code"];

/// One model input: storage conditions plus an encoded category
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShelfFeatures {
    pub temperature: f64,
    pub acidity: f64,
    pub category_code: usize,
}

impl ShelfFeatures {
    pub fn new(temperature: f64, acidity: f64, category_code: usize) -> Self {
        Self {
            temperature,
            acidity,
            category_code,
        }
    }

    /// Fixed-point feature vector in `FEATURE_NAMES` order
    pub fn to_fixed(&self) -> Vec<i64> {
        vec![
            to_fixed(self.temperature),
            to_fixed(self.acidity),
            (self.category_code as i64).saturating_mul(SCALE),
        ]
    }
}

/// Descriptive metadata; excluded from the model hash
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub feature_count: usize,
    pub tree_count: usize,
    pub max_depth: usize,
    pub training_samples: usize,
    /// Unix timestamp (seconds) of training
    pub created_at: i64,
    /// Fingerprint of the dataset the model was fitted on
    pub training_data_hash: String,
    pub model_hash: String,
}

/// Gradient-boosted regression model in fixed-point form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostedModel {
    pub version: i32,
    pub scale: i64,
    /// Mean target, fixed-point
    pub bias: i64,
    pub trees: Vec<Tree>,
    pub metadata: ModelMetadata,
}

/// The hashed part of a model
#[derive(Serialize)]
struct HashedView<'a> {
    version: i32,
    scale: i64,
    bias: i64,
    trees: &'a [Tree],
}

impl BoostedModel {
    pub fn validate(&self) -> Result<()> {
        if self.version != MODEL_VERSION {
            return Err(ModelError::ValidationFailed(format!(
                "unsupported model version: {}",
                self.version
            )));
        }
        if self.scale != SCALE {
            return Err(ModelError::ValidationFailed(format!(
                "unsupported scale: {}",
                self.scale
            )));
        }
        if self.trees.is_empty() {
            return Err(ModelError::ValidationFailed("model has no trees".to_string()));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate()
                .map_err(|e| ModelError::ValidationFailed(format!("tree {i}: {e}")))?;
        }
        Ok(())
    }

    /// Raw fixed-point score: bias + Σ leaf · weight / scale
    pub fn score(&self, features: &[i64]) -> i64 {
        self.trees.iter().fold(self.bias, |sum, tree| {
            let contribution = (tree.evaluate(features) as i128 * tree.weight as i128) / self.scale as i128;
            sum.saturating_add(contribution as i64)
        })
    }

    /// Raw prediction in days (may be negative)
    pub fn predict(&self, features: &ShelfFeatures) -> f64 {
        from_fixed(self.score(&features.to_fixed()))
    }

    /// Serialize to canonical JSON (sorted keys, no whitespace)
    pub fn to_canonical_json(&self) -> Result<String> {
        canonical_json(self)
    }

    /// BLAKE3 over the canonical JSON of version, scale, bias and trees
    pub fn hash_hex(&self) -> Result<String> {
        let json = canonical_json(&HashedView {
            version: self.version,
            scale: self.scale,
            bias: self.bias,
            trees: &self.trees,
        })?;
        Ok(hex::encode(blake3::hash(json.as_bytes()).as_bytes()))
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_canonical_json()?)?;
        Ok(())
    }

    /// Load and validate, rejecting files whose trees no longer match the recorded hash
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let model: BoostedModel = serde_json::from_str(&json)?;
        model.validate()?;
        model.verify_hash()?;
        Ok(model)
    }

    pub fn verify_hash(&self) -> Result<()> {
        let actual = self.hash_hex()?;
        if actual != self.metadata.model_hash {
            return Err(ModelError::ValidationFailed(format!(
                "model hash mismatch: recorded {}, computed {actual}",
                self.metadata.model_hash
            )));
        }
        Ok(())
    }
}

/// `serde_json::Map` is ordered by key, so a round-trip through `Value` canonicalizes
pub(crate) fn canonical_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(&serde_json::to_value(value)?)?)
}

/// Regression model lifecycle: absent until `fit`, then immutable
#[derive(Debug, Clone, Default)]
pub struct RegressionModel {
    config: GbdtConfig,
    fitted: Option<BoostedModel>,
}

impl RegressionModel {
    pub fn new(config: GbdtConfig) -> Self {
        Self {
            config,
            fitted: None,
        }
    }

    /// Wrap an already fitted model
    pub fn from_fitted(config: GbdtConfig, model: BoostedModel) -> Self {
        Self {
            config,
            fitted: Some(model),
        }
    }

    /// Fit on `(temperature, acidity, category_code)` rows against shelf-life days.
    ///
    /// A failed fit leaves any previously fitted state untouched.
    pub fn fit(&mut self, features: &[ShelfFeatures], targets: &[f64]) -> Result<&BoostedModel> {
        if features.is_empty() || features.len() != targets.len() {
            return Err(ModelError::InsufficientData(format!(
                "{} feature rows for {} targets",
                features.len(),
                targets.len()
            )));
        }

        let rows: Vec<Vec<i64>> = features.iter().map(ShelfFeatures::to_fixed).collect();
        let fixed_targets: Vec<i64> = targets.iter().copied().map(to_fixed).collect();

        let model = GbdtTrainer::new(self.config.clone()).train(&rows, &fixed_targets)?;
        let fitted = self.fitted.insert(model);
        Ok(&*fitted)
    }

    /// Raw estimate in days; may be negative
    pub fn predict_one(&self, features: &ShelfFeatures) -> Result<f64> {
        self.fitted
            .as_ref()
            .map(|model| model.predict(features))
            .ok_or(ModelError::ModelNotTrained)
    }

    pub fn is_trained(&self) -> bool {
        self.fitted.is_some()
    }

    pub fn fitted(&self) -> Option<&BoostedModel> {
        self.fitted.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Node;

    fn sample_model() -> BoostedModel {
        let tree1 = Tree::new(
            vec![
                Node::internal(0, 0, 50 * SCALE, 1, 2),
                Node::leaf(1, 100 * SCALE),
                Node::leaf(2, 200 * SCALE),
            ],
            SCALE,
        );
        let tree2 = Tree::new(
            vec![
                Node::internal(0, 1, 30 * SCALE, 1, 2),
                Node::leaf(1, -50 * SCALE),
                Node::leaf(2, 50 * SCALE),
            ],
            SCALE,
        );

        let mut model = BoostedModel {
            version: MODEL_VERSION,
            scale: SCALE,
            bias: 0,
            trees: vec![tree1, tree2],
            metadata: ModelMetadata {
                feature_count: 3,
                tree_count: 2,
                max_depth: 1,
                training_samples: 0,
                created_at: 0,
                training_data_hash: String::new(),
                model_hash: String::new(),
            },
        };
        model.metadata.model_hash = model.hash_hex().unwrap();
        model
    }

    #[test]
    fn test_score_sums_weighted_trees() {
        let model = sample_model();

        // Tree 1 goes left (100), tree 2 goes left (-50)
        let features = ShelfFeatures::new(30.0, 20.0, 0);
        assert_eq!(model.predict(&features), 50.0);
        assert_eq!(model.score(&features.to_fixed()), 50 * SCALE);
    }

    #[test]
    fn test_canonical_json_sorted_and_compact() {
        let json = sample_model().to_canonical_json().unwrap();

        assert!(!json.contains('\n'));
        let bias = json.find("\"bias\"").unwrap();
        let trees = json.find("\"trees\"").unwrap();
        let version = json.find("\"version\"").unwrap();
        assert!(bias < trees && trees < version);
    }

    #[test]
    fn test_hash_ignores_metadata() {
        let model1 = sample_model();
        let mut model2 = sample_model();
        model2.metadata.created_at = 12345;
        model2.metadata.training_data_hash = "abc".to_string();

        assert_eq!(model1.hash_hex().unwrap(), model2.hash_hex().unwrap());

        model2.bias = 1;
        assert_ne!(model1.hash_hex().unwrap(), model2.hash_hex().unwrap());
    }

    #[test]
    fn test_json_file_round_trip() {
        let model = sample_model();
        let file = tempfile::NamedTempFile::new().unwrap();

        model.save_json(file.path()).unwrap();
        let loaded = BoostedModel::load_json(file.path()).unwrap();

        assert_eq!(model, loaded);
    }

    #[test]
    fn test_load_rejects_tampered_model() {
        let mut model = sample_model();
        model.trees[0].nodes[1].leaf = Some(999 * SCALE);
        let file = tempfile::NamedTempFile::new().unwrap();
        model.save_json(file.path()).unwrap();

        let err = BoostedModel::load_json(file.path()).unwrap_err();
        assert!(matches!(err, ModelError::ValidationFailed(_)));
    }

    #[test]
    fn test_predict_before_fit() {
        let model = RegressionModel::new(GbdtConfig::default());
        let err = model.predict_one(&ShelfFeatures::new(4.0, 6.0, 0)).unwrap_err();
        assert!(matches!(err, ModelError::ModelNotTrained));
    }

    #[test]
    fn test_fit_requires_matching_lengths() {
        let mut model = RegressionModel::new(GbdtConfig::default());
        let err = model.fit(&[ShelfFeatures::new(4.0, 6.0, 0)], &[]).unwrap_err();
        assert!(matches!(err, ModelError::InsufficientData(_)));
        assert!(!model.is_trained());
    }

    #[test]
    fn test_fit_generalizes_to_unseen_combinations() {
        let features = vec![
            ShelfFeatures::new(4.0, 6.0, 1),
            ShelfFeatures::new(4.0, 6.0, 1),
            ShelfFeatures::new(-18.0, 6.0, 0),
        ];
        let targets = vec![7.0, 9.0, 180.0];

        let mut model = RegressionModel::new(GbdtConfig::default());
        model.fit(&features, &targets).unwrap();

        let veg = model.predict_one(&features[0]).unwrap();
        let meat = model.predict_one(&features[2]).unwrap();
        assert!((veg - 8.0).abs() < 1.0, "vegetable estimate {veg}");
        assert!((meat - 180.0).abs() < 1.0, "meat estimate {meat}");

        let unseen = model.predict_one(&ShelfFeatures::new(-10.0, 3.5, 1)).unwrap();
        assert!(unseen.is_finite());
    }
}

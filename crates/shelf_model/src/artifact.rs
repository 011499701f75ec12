//! Persisted model artifacts
//!
//! An artifact bundles the fitted model, the category vocabulary it was
//! trained with, the training settings and the fingerprint of the source
//! dataset. A change to either the dataset or the settings marks the
//! artifact as stale.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::dataset::Dataset;
use crate::encoder::CategoryEncoder;
use crate::errors::{ModelError, Result};
use crate::model::{canonical_json, BoostedModel, RegressionModel};
use crate::trainer::GbdtConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub model: BoostedModel,
    pub vocabulary: CategoryEncoder,
    /// Settings the model was fitted with
    pub training: GbdtConfig,
    pub dataset_fingerprint: String,
}

impl ModelArtifact {
    /// Fit the vocabulary and model on a dataset
    pub fn train(dataset: &Dataset, config: GbdtConfig) -> Result<Self> {
        let vocabulary = CategoryEncoder::fit(dataset.categories())?;
        let (features, targets) = dataset.training_matrix(&vocabulary)?;

        let mut regression = RegressionModel::new(config.clone());
        let mut model = regression.fit(&features, &targets)?.clone();
        let dataset_fingerprint = dataset.fingerprint();
        model.metadata.training_data_hash = dataset_fingerprint.clone();

        Ok(Self {
            model,
            vocabulary,
            training: config,
            dataset_fingerprint,
        })
    }

    /// True when the artifact was fitted on this dataset with these settings
    pub fn is_fresh_for(&self, fingerprint: &str, training: &GbdtConfig) -> bool {
        self.dataset_fingerprint == fingerprint && &self.training == training
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, canonical_json(self)?)?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let artifact: ModelArtifact = serde_json::from_str(&json)?;
        artifact.model.validate()?;
        artifact.model.verify_hash()?;

        let feature_count = artifact.model.metadata.feature_count;
        if feature_count != crate::model::FEATURE_NAMES.len() {
            return Err(ModelError::ValidationFailed(format!(
                "artifact expects {feature_count} features"
            )));
        }
        Ok(artifact)
    }
}

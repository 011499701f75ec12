//! Shelf-life predictor
//!
//! Owns the train-once-then-serve lifecycle:
//! `Uninitialized -> Training -> Ready`, with `Failed` recording the last
//! unsuccessful attempt. Training is single-flight; once ready, the fitted
//! pipeline is immutable and shared behind an `Arc`.

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::artifact::ModelArtifact;
use crate::dataset::Dataset;
use crate::encoder::CategoryEncoder;
use crate::errors::{ModelError, Result};
use crate::model::{RegressionModel, ShelfFeatures};
use crate::trainer::GbdtConfig;

/// Which category code stands in for a category the model never saw
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Code 0, i.e. the lexicographically first category
    #[default]
    FirstCode,
    /// The category with the most training rows
    MostFrequent,
}

/// Where training data comes from
#[derive(Clone, Debug)]
pub enum DatasetSource {
    Csv(PathBuf),
    InMemory(Dataset),
}

impl DatasetSource {
    fn load(&self) -> Result<Dataset> {
        match self {
            DatasetSource::Csv(path) => Dataset::from_csv(path),
            DatasetSource::InMemory(dataset) => Ok(dataset.clone()),
        }
    }
}

#[derive(Clone, Debug)]
pub struct PredictorConfig {
    pub source: DatasetSource,
    /// Reuse (and refresh) a persisted model when set
    pub artifact_path: Option<PathBuf>,
    pub training: GbdtConfig,
    pub fallback: FallbackPolicy,
}

impl PredictorConfig {
    pub fn from_csv(path: impl Into<PathBuf>) -> Self {
        Self::with_source(DatasetSource::Csv(path.into()))
    }

    pub fn in_memory(dataset: Dataset) -> Self {
        Self::with_source(DatasetSource::InMemory(dataset))
    }

    fn with_source(source: DatasetSource) -> Self {
        Self {
            source,
            artifact_path: None,
            training: GbdtConfig::default(),
            fallback: FallbackPolicy::default(),
        }
    }
}

/// Estimate for one request
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Prediction {
    /// Estimated shelf life, never negative
    pub days: f64,
    pub requested_category: String,
    /// Category whose code was fed to the model
    pub category_used: String,
    /// True when `requested_category` was unknown and a stand-in was used
    pub fallback: bool,
}

/// Anything that can answer shelf-life questions
pub trait ShelfLifeEstimator: Send + Sync {
    fn predict(&self, temperature: f64, acidity: f64, category: &str) -> Result<Prediction>;

    fn list_categories(&self) -> Result<Vec<String>>;
}

/// Fitted encoder and model, read-only once built
#[derive(Debug)]
pub struct TrainedPipeline {
    encoder: CategoryEncoder,
    model: RegressionModel,
    fallback_code: usize,
}

impl TrainedPipeline {
    fn new(encoder: CategoryEncoder, model: RegressionModel, policy: FallbackPolicy) -> Self {
        let fallback_code = match policy {
            FallbackPolicy::FirstCode => 0,
            FallbackPolicy::MostFrequent => encoder.most_frequent(),
        };
        Self {
            encoder,
            model,
            fallback_code,
        }
    }

    pub fn predict(&self, temperature: f64, acidity: f64, category: &str) -> Result<Prediction> {
        let (code, fallback) = match self.encoder.encode(category) {
            Ok(code) => (code, false),
            Err(ModelError::UnknownCategory(_)) => {
                warn!(
                    requested = category,
                    substitute = self.encoder.decode(self.fallback_code)?,
                    "Unknown category, using fallback code"
                );
                (self.fallback_code, true)
            }
            Err(err) => return Err(err),
        };

        let raw = self
            .model
            .predict_one(&ShelfFeatures::new(temperature, acidity, code))?;
        let days = clamp_days(raw);

        Ok(Prediction {
            days,
            requested_category: category.to_string(),
            category_used: self.encoder.decode(code)?.to_string(),
            fallback,
        })
    }

    pub fn categories(&self) -> &[String] {
        self.encoder.all_categories()
    }

    pub fn model_hash(&self) -> Option<&str> {
        self.model.fitted().map(|m| m.metadata.model_hash.as_str())
    }
}

/// Observable lifecycle state
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PredictorStatus {
    Uninitialized,
    Training,
    Ready,
    Failed(String),
}

enum PredictorState {
    Uninitialized,
    Training,
    Ready(Arc<TrainedPipeline>),
    Failed(String),
}

/// Lazily trained shelf-life predictor
pub struct ShelfLifePredictor {
    config: PredictorConfig,
    state: RwLock<PredictorState>,
    training_gate: Mutex<()>,
}

impl ShelfLifePredictor {
    pub fn new(config: PredictorConfig) -> Self {
        Self {
            config,
            state: RwLock::new(PredictorState::Uninitialized),
            training_gate: Mutex::new(()),
        }
    }

    pub fn status(&self) -> PredictorStatus {
        match &*self.state.read() {
            PredictorState::Uninitialized => PredictorStatus::Uninitialized,
            PredictorState::Training => PredictorStatus::Training,
            PredictorState::Ready(_) => PredictorStatus::Ready,
            PredictorState::Failed(reason) => PredictorStatus::Failed(reason.clone()),
        }
    }

    fn ready_pipeline(&self) -> Option<Arc<TrainedPipeline>> {
        match &*self.state.read() {
            PredictorState::Ready(pipeline) => Some(Arc::clone(pipeline)),
            _ => None,
        }
    }

    /// Train if not yet ready; a no-op afterwards. Failed attempts may be retried.
    pub fn ensure_trained(&self) -> Result<Arc<TrainedPipeline>> {
        if let Some(pipeline) = self.ready_pipeline() {
            return Ok(pipeline);
        }

        let _gate = self.training_gate.lock();
        // Another caller may have finished training while we waited
        if let Some(pipeline) = self.ready_pipeline() {
            return Ok(pipeline);
        }

        *self.state.write() = PredictorState::Training;
        match self.build_pipeline(false) {
            Ok(pipeline) => {
                let pipeline = Arc::new(pipeline);
                *self.state.write() = PredictorState::Ready(Arc::clone(&pipeline));
                Ok(pipeline)
            }
            Err(err) => {
                warn!("Shelf-life model training failed: {}", err);
                *self.state.write() = PredictorState::Failed(err.to_string());
                Err(err)
            }
        }
    }

    /// Retrain from the current dataset, ignoring any saved artifact.
    ///
    /// The previous pipeline keeps serving if retraining fails.
    pub fn retrain(&self) -> Result<Arc<TrainedPipeline>> {
        let _gate = self.training_gate.lock();
        let previous = self.ready_pipeline();

        *self.state.write() = PredictorState::Training;
        match self.build_pipeline(true) {
            Ok(pipeline) => {
                let pipeline = Arc::new(pipeline);
                *self.state.write() = PredictorState::Ready(Arc::clone(&pipeline));
                Ok(pipeline)
            }
            Err(err) => {
                warn!("Shelf-life model retraining failed: {}", err);
                *self.state.write() = match previous {
                    Some(pipeline) => PredictorState::Ready(pipeline),
                    None => PredictorState::Failed(err.to_string()),
                };
                Err(err)
            }
        }
    }

    fn build_pipeline(&self, force: bool) -> Result<TrainedPipeline> {
        let dataset = self.config.source.load()?;
        let fingerprint = dataset.fingerprint();

        if !force {
            if let Some(artifact) = self.load_fresh_artifact(&fingerprint) {
                info!(
                    model_hash = %artifact.model.metadata.model_hash,
                    "Loaded shelf-life model artifact"
                );
                return Ok(self.pipeline_from(artifact));
            }
        }

        info!(
            "Training shelf-life model on {} samples ({} trees)",
            dataset.len(),
            self.config.training.num_trees
        );
        for (column, stats) in dataset.feature_stats() {
            debug!("  {}: min={}, max={}", column, stats.min, stats.max);
        }

        let artifact = ModelArtifact::train(&dataset, self.config.training.clone())?;
        info!(
            categories = artifact.vocabulary.len(),
            model_hash = %artifact.model.metadata.model_hash,
            "Shelf-life model trained"
        );

        if let Some(path) = &self.config.artifact_path {
            if let Err(err) = artifact.save(path) {
                warn!("Failed to write model artifact {}: {}", path.display(), err);
            }
        }

        Ok(self.pipeline_from(artifact))
    }

    fn pipeline_from(&self, artifact: ModelArtifact) -> TrainedPipeline {
        let model = RegressionModel::from_fitted(self.config.training.clone(), artifact.model);
        TrainedPipeline::new(artifact.vocabulary, model, self.config.fallback)
    }

    fn load_fresh_artifact(&self, fingerprint: &str) -> Option<ModelArtifact> {
        let path = self.config.artifact_path.as_ref()?;
        if !path.exists() {
            return None;
        }

        match ModelArtifact::load(path) {
            Ok(artifact) if artifact.is_fresh_for(fingerprint, &self.config.training) => Some(artifact),
            Ok(_) => {
                info!("Model artifact {} is stale, retraining", path.display());
                None
            }
            Err(err) => {
                warn!("Ignoring unreadable model artifact {}: {}", path.display(), err);
                None
            }
        }
    }
}

/// Shelf life is never negative; a non-finite raw score counts as zero
fn clamp_days(raw: f64) -> f64 {
    if raw.is_finite() {
        raw.max(0.0)
    } else {
        0.0
    }
}

impl ShelfLifeEstimator for ShelfLifePredictor {
    fn predict(&self, temperature: f64, acidity: f64, category: &str) -> Result<Prediction> {
        self.ensure_trained()?.predict(temperature, acidity, category)
    }

    fn list_categories(&self) -> Result<Vec<String>> {
        Ok(self.ensure_trained()?.categories().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::TrainingRecord;
    use crate::deterministic::SCALE;
    use crate::model::{BoostedModel, ModelMetadata, MODEL_VERSION};
    use crate::tree::{Node, Tree};

    fn scenario() -> Dataset {
        Dataset::from_records(vec![
            TrainingRecord::new(4.0, 6.0, "Vegetable", 7.0),
            TrainingRecord::new(4.0, 6.0, "Vegetable", 9.0),
            TrainingRecord::new(-18.0, 6.0, "Meat", 180.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_lazy_training() {
        let predictor = ShelfLifePredictor::new(PredictorConfig::in_memory(scenario()));
        assert_eq!(predictor.status(), PredictorStatus::Uninitialized);

        let prediction = predictor.predict(4.0, 6.0, "Vegetable").unwrap();
        assert_eq!(predictor.status(), PredictorStatus::Ready);
        assert!(!prediction.fallback);
        assert_eq!(prediction.category_used, "Vegetable");
    }

    #[test]
    fn test_ensure_trained_is_idempotent() {
        let predictor = ShelfLifePredictor::new(PredictorConfig::in_memory(scenario()));
        let first = predictor.ensure_trained().unwrap();
        let second = predictor.ensure_trained().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_missing_dataset_leaves_failed_state() {
        let predictor = ShelfLifePredictor::new(PredictorConfig::from_csv("/missing/food_data.csv"));

        let err = predictor.ensure_trained().unwrap_err();
        assert!(matches!(err, ModelError::DatasetNotFound { .. }));
        assert!(matches!(predictor.status(), PredictorStatus::Failed(_)));
        assert!(predictor.list_categories().is_err());
    }

    #[test]
    fn test_fallback_first_code() {
        let predictor = ShelfLifePredictor::new(PredictorConfig::in_memory(scenario()));
        let prediction = predictor.predict(4.0, 6.0, "Seafood").unwrap();

        assert!(prediction.fallback);
        assert_eq!(prediction.requested_category, "Seafood");
        assert_eq!(prediction.category_used, "Meat");
        assert!(prediction.days.is_finite() && prediction.days >= 0.0);
    }

    #[test]
    fn test_fallback_most_frequent() {
        let config = PredictorConfig {
            fallback: FallbackPolicy::MostFrequent,
            ..PredictorConfig::in_memory(scenario())
        };
        let predictor = ShelfLifePredictor::new(config);

        let prediction = predictor.predict(4.0, 6.0, "Seafood").unwrap();
        assert_eq!(prediction.category_used, "Vegetable");
    }

    #[test]
    fn test_non_finite_inputs_do_not_fail() {
        let predictor = ShelfLifePredictor::new(PredictorConfig::in_memory(scenario()));
        let prediction = predictor.predict(f64::NAN, f64::INFINITY, "Meat").unwrap();
        assert!(prediction.days.is_finite() && prediction.days >= 0.0);
    }

    #[test]
    fn test_retrain_replaces_pipeline() {
        let predictor = ShelfLifePredictor::new(PredictorConfig::in_memory(scenario()));
        let first = predictor.ensure_trained().unwrap();
        let second = predictor.retrain().unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first.model_hash(), second.model_hash());
        assert_eq!(predictor.status(), PredictorStatus::Ready);
    }

    /// Model whose raw output is `bias` plus one leaf, whatever the input
    fn constant_pipeline(bias: i64, policy: FallbackPolicy) -> TrainedPipeline {
        let encoder = CategoryEncoder::fit(["Meat", "Vegetable", "Vegetable"]).unwrap();
        let mut model = BoostedModel {
            version: MODEL_VERSION,
            scale: SCALE,
            bias,
            trees: vec![Tree::new(vec![Node::leaf(0, -SCALE)], SCALE)],
            metadata: ModelMetadata {
                feature_count: 3,
                tree_count: 1,
                max_depth: 0,
                training_samples: 0,
                created_at: 0,
                training_data_hash: String::new(),
                model_hash: String::new(),
            },
        };
        model.metadata.model_hash = model.hash_hex().unwrap();

        let regression = RegressionModel::from_fitted(GbdtConfig::default(), model);
        TrainedPipeline::new(encoder, regression, policy)
    }

    #[test]
    fn test_negative_raw_output_is_clamped_to_zero() {
        let pipeline = constant_pipeline(-5 * SCALE, FallbackPolicy::FirstCode);

        let known = pipeline.predict(4.0, 6.0, "Vegetable").unwrap();
        assert_eq!(known.days, 0.0);
        assert!(!known.fallback);

        let unknown = pipeline.predict(4.0, 6.0, "Seafood").unwrap();
        assert_eq!(unknown.days, 0.0);
        assert!(unknown.fallback);
        assert_eq!(unknown.category_used, "Meat");
    }

    #[test]
    fn test_positive_raw_output_passes_through() {
        let pipeline = constant_pipeline(5 * SCALE, FallbackPolicy::MostFrequent);

        let prediction = pipeline.predict(4.0, 6.0, "Seafood").unwrap();
        assert_eq!(prediction.days, 4.0);
        assert!(prediction.fallback);
        assert_eq!(prediction.category_used, "Vegetable");
    }

    #[test]
    fn test_clamp_days() {
        assert_eq!(clamp_days(-0.5), 0.0);
        assert_eq!(clamp_days(12.5), 12.5);
        assert_eq!(clamp_days(f64::NAN), 0.0);
        assert_eq!(clamp_days(f64::INFINITY), 0.0);
        assert_eq!(clamp_days(f64::NEG_INFINITY), 0.0);
    }
}

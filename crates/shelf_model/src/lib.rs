//! FoodPreserve shelf-life model
//!
//! Estimates food shelf life (days) from storage temperature, acidity and
//! food category. Training is deterministic: the same dataset and
//! configuration always produce a bit-identical fixed-point GBDT model.

pub mod artifact;
pub mod cart;
pub mod dataset;
pub mod deterministic;
pub mod encoder;
pub mod errors;
pub mod model;
pub mod predictor;
pub mod trainer;
pub mod tree;

use std::path::Path;

pub use artifact::ModelArtifact;
pub use dataset::{Dataset, FeatureStats, TrainingRecord, FEATURE_COLUMNS};
pub use deterministic::{LcgRng, SplitTieBreaker, SCALE};
pub use encoder::CategoryEncoder;
pub use errors::ModelError;
pub use model::{BoostedModel, RegressionModel, ShelfFeatures};
pub use predictor::{
    DatasetSource, FallbackPolicy, Prediction, PredictorConfig, PredictorStatus,
    ShelfLifeEstimator, ShelfLifePredictor, TrainedPipeline,
};
pub use trainer::{GbdtConfig, GbdtTrainer};

/// Train a model artifact directly from a CSV file.
pub fn train_artifact_from_csv(path: &Path, config: GbdtConfig) -> Result<ModelArtifact, ModelError> {
    let dataset = Dataset::from_csv(path)?;
    ModelArtifact::train(&dataset, config)
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

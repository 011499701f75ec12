//! Shelf-life model trainer CLI
//!
//! Trains a deterministic shelf-life model from a CSV dataset and writes the
//! artifact plus its BLAKE3 hash.

use anyhow::{Context, Result};
use clap::Parser;
use foodpreserve_shelf_model::{Dataset, GbdtConfig, ModelArtifact, SCALE};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "shelf-train")]
#[command(author = "FoodPreserve Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Deterministic shelf-life model trainer", long_about = None)]
struct Args {
    /// Input CSV dataset (Temperature_C, pH, Food_Category, Shelf_Life_Days)
    #[arg(short, long, default_value = "data/food_data.csv")]
    input: PathBuf,

    /// Output directory for the artifact and hash
    #[arg(short, long, default_value = "models/shelf_life")]
    output: PathBuf,

    /// Number of boosting trees
    #[arg(long, default_value = "100")]
    trees: usize,

    /// Maximum tree depth
    #[arg(long, default_value = "6")]
    max_depth: usize,

    /// Minimum samples per leaf
    #[arg(long, default_value = "1")]
    min_samples_leaf: usize,

    /// Learning rate (fixed-point, e.g., 100000 = 0.1)
    #[arg(long, default_value = "100000")]
    learning_rate: i64,

    /// Row fraction per tree (fixed-point, 1000000 = all rows)
    #[arg(long, default_value_t = SCALE)]
    subsample: i64,

    /// Seed for row subsampling and shuffling
    #[arg(long, default_value = "42")]
    seed: i64,

    /// Shuffle rows before training
    #[arg(long)]
    shuffle: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("FoodPreserve shelf-life trainer v{}", env!("CARGO_PKG_VERSION"));

    info!("Loading dataset from: {}", args.input.display());
    let mut dataset = Dataset::from_csv(&args.input).context("Failed to load dataset")?;
    info!("Loaded {} samples", dataset.len());

    if args.shuffle {
        info!("Shuffling dataset with seed: {}", args.seed);
        dataset.shuffle(args.seed);
    }

    for (column, stats) in dataset.feature_stats() {
        info!("  {}: min={}, max={}", column, stats.min, stats.max);
    }

    let config = GbdtConfig {
        num_trees: args.trees,
        max_depth: args.max_depth,
        min_samples_leaf: args.min_samples_leaf,
        learning_rate: args.learning_rate,
        subsample: args.subsample,
        seed: args.seed,
        ..GbdtConfig::default()
    };
    info!("Training configuration: {:?}", config);

    let artifact = ModelArtifact::train(&dataset, config).context("Training failed")?;
    info!(
        "Training complete: {} trees, {} categories ({})",
        artifact.model.trees.len(),
        artifact.vocabulary.len(),
        artifact.vocabulary.all_categories().join(", ")
    );
    info!("  Model hash: {}", artifact.model.metadata.model_hash);

    std::fs::create_dir_all(&args.output).context("Failed to create output directory")?;

    let model_path = args.output.join("active.json");
    info!("Saving artifact to: {}", model_path.display());
    artifact
        .save(&model_path)
        .context("Failed to write model artifact")?;

    let bytes = std::fs::read(&model_path).context("Failed to re-read model artifact")?;
    let hash_hex = hex::encode(blake3::hash(&bytes).as_bytes());
    let hash_path = args.output.join("active.hash");
    std::fs::write(&hash_path, &hash_hex).context("Failed to write hash file")?;

    info!("✓ Training completed successfully");
    info!("  Artifact: {}", model_path.display());
    info!("  Hash: {} ({})", hash_path.display(), hash_hex);

    Ok(())
}

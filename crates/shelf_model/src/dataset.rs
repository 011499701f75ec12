//! CSV dataset loading and validation
//!
//! Reads storage-condition records (`Temperature_C`, `pH`, `Food_Category`,
//! `Shelf_Life_Days`) from a headered CSV file. Extra columns are ignored.
//! Every record is validated once at load time and is immutable afterwards.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::deterministic::{to_fixed, xxhash64_i64};
use crate::encoder::CategoryEncoder;
use crate::errors::{ModelError, Result};
use crate::model::ShelfFeatures;

/// Column names expected in the dataset header
pub const FEATURE_COLUMNS: [&str; 4] = ["Temperature_C", "pH", "Food_Category", "Shelf_Life_Days"];

/// One observed shelf-life sample
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingRecord {
    /// Storage temperature in °C
    #[serde(rename = "Temperature_C")]
    pub temperature: f64,
    /// Acidity (pH)
    #[serde(rename = "pH")]
    pub acidity: f64,
    #[serde(rename = "Food_Category")]
    pub category: String,
    /// Observed shelf life in days
    #[serde(rename = "Shelf_Life_Days")]
    pub observed_days: f64,
}

impl TrainingRecord {
    pub fn new(temperature: f64, acidity: f64, category: impl Into<String>, observed_days: f64) -> Self {
        Self {
            temperature,
            acidity,
            category: category.into(),
            observed_days,
        }
    }

    fn validate(&self, row: usize) -> Result<()> {
        if self.category.trim().is_empty() {
            return Err(ModelError::Dataset(format!("row {row}: empty Food_Category")));
        }
        if !self.temperature.is_finite() || !self.acidity.is_finite() {
            return Err(ModelError::Dataset(format!(
                "row {row}: non-finite Temperature_C or pH"
            )));
        }
        if !self.observed_days.is_finite() || self.observed_days < 0.0 {
            return Err(ModelError::Dataset(format!(
                "row {row}: Shelf_Life_Days must be finite and non-negative, got {}",
                self.observed_days
            )));
        }
        Ok(())
    }
}

/// Min/max of one numeric column
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FeatureStats {
    pub min: f64,
    pub max: f64,
}

impl FeatureStats {
    fn observe(values: impl Iterator<Item = f64>) -> Self {
        values.fold(
            Self {
                min: f64::INFINITY,
                max: f64::NEG_INFINITY,
            },
            |acc, v| Self {
                min: acc.min.min(v),
                max: acc.max.max(v),
            },
        )
    }
}

/// Validated training dataset
#[derive(Clone, Debug)]
pub struct Dataset {
    records: Vec<TrainingRecord>,
}

impl Dataset {
    /// Load dataset from a headered CSV file
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ModelError::DatasetNotFound {
                path: path.to_path_buf(),
            });
        }

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|err| ModelError::Dataset(format!("failed to open {}: {err}", path.display())))?;

        let headers = reader
            .headers()
            .map_err(|err| ModelError::Dataset(format!("failed to read header: {err}")))?
            .clone();
        for column in FEATURE_COLUMNS {
            if !headers.iter().any(|h| h == column) {
                return Err(ModelError::Dataset(format!("missing column {column}")));
            }
        }

        let mut records = Vec::new();
        for (idx, row) in reader.deserialize::<TrainingRecord>().enumerate() {
            let record =
                row.map_err(|err| ModelError::Dataset(format!("row {}: {err}", idx + 1)))?;
            records.push(record);
        }

        Self::from_records(records)
    }

    /// Build a dataset from in-memory records, applying the same validation as `from_csv`
    pub fn from_records(records: Vec<TrainingRecord>) -> Result<Self> {
        if records.is_empty() {
            return Err(ModelError::InsufficientData("dataset is empty".to_string()));
        }
        for (idx, record) in records.iter().enumerate() {
            record.validate(idx + 1)?;
        }
        Ok(Self { records })
    }

    pub fn records(&self) -> &[TrainingRecord] {
        &self.records
    }

    /// Get number of samples
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if dataset is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Category column in row order (duplicates included)
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.category.as_str())
    }

    /// Encode the dataset into model inputs using a fitted encoder
    pub fn training_matrix(&self, encoder: &CategoryEncoder) -> Result<(Vec<ShelfFeatures>, Vec<f64>)> {
        let mut features = Vec::with_capacity(self.len());
        let mut targets = Vec::with_capacity(self.len());

        for record in &self.records {
            features.push(ShelfFeatures {
                temperature: record.temperature,
                acidity: record.acidity,
                category_code: encoder.encode(&record.category)?,
            });
            targets.push(record.observed_days);
        }

        Ok((features, targets))
    }

    /// Deterministically shuffle the dataset using seed
    pub fn shuffle(&mut self, seed: i64) {
        let mut keyed: Vec<(i64, TrainingRecord)> = self
            .records
            .drain(..)
            .map(|record| {
                let key = [
                    to_fixed(record.temperature),
                    to_fixed(record.acidity),
                    to_fixed(record.observed_days),
                    xxhash64_i64(&category_words(&record.category), seed),
                ];
                (xxhash64_i64(&key, seed), record)
            })
            .collect();

        // Stable sort keeps duplicate rows in their original relative order
        keyed.sort_by_key(|(hash, _)| *hash);
        self.records = keyed.into_iter().map(|(_, record)| record).collect();
    }

    /// Temperature, pH and shelf-life ranges for logging and validation
    pub fn feature_stats(&self) -> [(&'static str, FeatureStats); 3] {
        [
            (
                FEATURE_COLUMNS[0],
                FeatureStats::observe(self.records.iter().map(|r| r.temperature)),
            ),
            (
                FEATURE_COLUMNS[1],
                FeatureStats::observe(self.records.iter().map(|r| r.acidity)),
            ),
            (
                FEATURE_COLUMNS[3],
                FeatureStats::observe(self.records.iter().map(|r| r.observed_days)),
            ),
        ]
    }

    /// BLAKE3 fingerprint of the record contents, used to detect stale model artifacts
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for record in &self.records {
            hasher.update(&record.temperature.to_le_bytes());
            hasher.update(&record.acidity.to_le_bytes());
            hasher.update(record.category.as_bytes());
            hasher.update(&[0]);
            hasher.update(&record.observed_days.to_le_bytes());
        }
        hex::encode(hasher.finalize().as_bytes())
    }
}

fn category_words(category: &str) -> Vec<i64> {
    category.bytes().map(i64::from).collect()
}

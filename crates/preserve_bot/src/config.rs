//! Configuration loading
//!
//! Layers, lowest first: built-in defaults, an optional TOML file, environment
//! overrides, then the API secret from the environment or a secrets file.

use foodpreserve_shelf_model::{FallbackPolicy, GbdtConfig, PredictorConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::errors::BotError;
use crate::types::LLMConfig;

pub const DEFAULT_CONFIG_PATH: &str = "config/foodpreserve.toml";
pub const DEFAULT_SECRETS_PATH: &str = "secrets/development.env";
pub const DEFAULT_DATASET_PATH: &str = "data/food_data.csv";

/// Secret names checked in order
const API_KEY_VARS: [&str; 2] = ["GROQ_API_KEY", "LLM_API_KEY"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub dataset_path: PathBuf,
    /// Persisted model location; training always happens in memory when unset
    pub artifact_path: Option<PathBuf>,
    pub fallback_policy: FallbackPolicy,
    pub training: GbdtConfig,
    pub llm: LLMConfig,
    pub secrets_path: PathBuf,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from(DEFAULT_DATASET_PATH),
            artifact_path: None,
            fallback_policy: FallbackPolicy::default(),
            training: GbdtConfig::default(),
            llm: LLMConfig::default(),
            secrets_path: PathBuf::from(DEFAULT_SECRETS_PATH),
        }
    }
}

impl BotConfig {
    /// Load from all sources without validating. An explicit `path` must exist; the default path is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, BotError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?
            }
            None => Self::default(),
        };

        let lookup = |key: &str| env::var(key).ok();
        config.apply_env_overrides(lookup);

        let secrets = load_secrets(&config.secrets_path)?;
        config.apply_secret(lookup, &secrets);

        debug!(?config, "Configuration loaded");
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, BotError> {
        let content = fs::read_to_string(path).map_err(|e| {
            BotError::Io(format!("Failed to read config file {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, BotError> {
        toml::from_str(content)
            .map_err(|e| BotError::Serialization(format!("Failed to parse config file: {e}")))
    }

    /// Apply overrides; unparsable or blank values leave the current setting alone
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(value) = non_blank("FOODPRESERVE_DATASET") {
            self.dataset_path = PathBuf::from(value);
        }

        if let Some(value) = non_blank("FOODPRESERVE_MODEL") {
            self.artifact_path = Some(PathBuf::from(value));
        }

        if let Some(value) = non_blank("LLM_API_ENDPOINT") {
            self.llm.api_endpoint = value;
        }

        if let Some(value) = non_blank("LLM_MODEL") {
            self.llm.model_name = value;
        }

        if let Some(parsed) = non_blank("LLM_MAX_TOKENS").and_then(|v| v.parse().ok()) {
            self.llm.max_tokens = parsed;
        }

        if let Some(parsed) = non_blank("LLM_TEMPERATURE").and_then(|v| v.parse().ok()) {
            self.llm.temperature = parsed;
        }

        if let Some(parsed) = non_blank("LLM_TIMEOUT").and_then(|v| v.parse().ok()) {
            self.llm.timeout_seconds = parsed;
        }

        if let Some(parsed) = non_blank("LLM_MAX_RETRIES").and_then(|v| v.parse().ok()) {
            self.llm.max_retries = parsed;
        }
    }

    /// Environment wins over the secrets file
    pub fn apply_secret<F>(&mut self, lookup: F, secrets: &HashMap<String, String>)
    where
        F: Fn(&str) -> Option<String>,
    {
        let from_env = API_KEY_VARS
            .iter()
            .filter_map(|&key| lookup(key))
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty());

        let from_file = API_KEY_VARS
            .iter()
            .filter_map(|key| secrets.get(&key.to_lowercase()))
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty());

        if let Some(api_key) = from_env.or(from_file) {
            self.llm.api_key = api_key;
        }
    }

    pub fn validate(&self) -> Result<(), BotError> {
        if self.llm.api_key.trim().is_empty() {
            return Err(BotError::Configuration(
                "Missing required secret: GROQ_API_KEY. Provide via environment variable or secrets file."
                    .to_string(),
            ));
        }
        if self.llm.max_tokens == 0 {
            return Err(BotError::Configuration("max_tokens must be positive".to_string()));
        }
        if self.llm.timeout_seconds == 0 {
            return Err(BotError::Configuration("timeout_seconds must be positive".to_string()));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(BotError::Configuration(format!(
                "temperature must be within [0, 2], got {}",
                self.llm.temperature
            )));
        }
        self.training
            .validate()
            .map_err(|e| BotError::Configuration(format!("invalid training settings: {e}")))
    }

    pub fn predictor_config(&self) -> PredictorConfig {
        PredictorConfig {
            artifact_path: self.artifact_path.clone(),
            training: self.training.clone(),
            fallback: self.fallback_policy,
            ..PredictorConfig::from_csv(&self.dataset_path)
        }
    }
}

/// Read `KEY=value` lines; keys are lowercased. A missing file yields no secrets.
pub fn load_secrets(path: &Path) -> Result<HashMap<String, String>, BotError> {
    let mut secrets = HashMap::new();
    if !path.exists() {
        return Ok(secrets);
    }

    let content = fs::read_to_string(path)
        .map_err(|e| BotError::Io(format!("Failed to read secrets file: {e}")))?;

    for line in content.lines() {
        let line = line.trim();
        if line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            secrets.insert(
                key.trim().to_lowercase(),
                value.trim().trim_matches('"').to_string(),
            );
        }
    }

    Ok(secrets)
}

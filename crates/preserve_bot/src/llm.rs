//! Text-generation backend client

use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

use crate::errors::BotError;
use crate::types::{GenerationRequest, GenerationResponse, LLMConfig, LLMUsage};

/// Opaque text-generation backend: messages in, text out, may fail
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, BotError>;
}

/// Client for an OpenAI-compatible chat completions API
pub struct LLMService {
    config: LLMConfig,
    client: reqwest::Client,
}

impl LLMService {
    /// Create a new LLM service; a blank credential is a configuration error
    pub fn new(config: LLMConfig) -> Result<Self, BotError> {
        if config.api_key.trim().is_empty() {
            return Err(BotError::Configuration(
                "LLM API key is not set (GROQ_API_KEY or LLM_API_KEY)".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| BotError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &LLMConfig {
        &self.config
    }

    fn build_payload(&self, request: &GenerationRequest) -> serde_json::Value {
        json!({
            "model": self.config.model_name,
            "messages": request.messages,
            "max_tokens": request.max_tokens.unwrap_or(self.config.max_tokens),
            "temperature": request.temperature.unwrap_or(self.config.temperature),
            "stream": false
        })
    }

    /// One round-trip. Rate limiting and server errors come back as `Network` so they can be retried.
    async fn send_once(&self, request: &GenerationRequest) -> Result<GenerationResponse, BotError> {
        let response = self
            .client
            .post(format!(
                "{}/chat/completions",
                self.config.api_endpoint.trim_end_matches('/')
            ))
            .bearer_auth(&self.config.api_key)
            .json(&self.build_payload(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let message = format!("API request failed: {status} - {error_text}");
            return Err(if status.is_server_error() || status.as_u16() == 429 {
                BotError::Network(message)
            } else {
                BotError::Generation(message)
            });
        }

        let response_json: serde_json::Value = response.json().await?;
        parse_completion(&response_json, &self.config.model_name)
    }
}

fn parse_completion(response_json: &serde_json::Value, model: &str) -> Result<GenerationResponse, BotError> {
    let choice = response_json["choices"][0]
        .as_object()
        .ok_or_else(|| BotError::Generation("Invalid response format".to_string()))?;

    let text = choice
        .get("message")
        .and_then(|m| m["content"].as_str())
        .ok_or_else(|| BotError::Generation("No content in response".to_string()))?;

    let finish_reason = choice
        .get("finish_reason")
        .and_then(|r| r.as_str())
        .unwrap_or("unknown")
        .to_string();

    let usage = &response_json["usage"];
    let count = |key: &str| usage[key].as_u64().unwrap_or(0) as u32;

    Ok(GenerationResponse {
        text: text.to_string(),
        usage: LLMUsage {
            prompt_tokens: count("prompt_tokens"),
            completion_tokens: count("completion_tokens"),
            total_tokens: count("total_tokens"),
        },
        model: response_json["model"].as_str().unwrap_or(model).to_string(),
        finish_reason,
    })
}

#[async_trait]
impl TextGenerator for LLMService {
    /// Generate with bounded retry on transient failures; the caller sees one terminal error
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, BotError> {
        let mut attempt: u32 = 0;
        loop {
            match self.send_once(&request).await {
                Ok(response) => {
                    debug!(
                        total_tokens = response.usage.total_tokens,
                        finish_reason = %response.finish_reason,
                        "LLM response received"
                    );
                    return Ok(response);
                }
                Err(err) if err.is_transient() && attempt < self.config.max_retries => {
                    attempt += 1;
                    let delay = Duration::from_millis(self.config.retry_backoff_ms * u64::from(attempt));
                    warn!(
                        "LLM request failed ({}), retry {}/{} in {:?}",
                        err, attempt, self.config.max_retries, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(BotError::Network(message)) => return Err(BotError::Generation(message)),
                Err(err) => return Err(err),
            }
        }
    }
}

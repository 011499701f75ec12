//! Shared request/response types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Text-generation backend configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LLMConfig {
    /// Base URL of an OpenAI-compatible API
    pub api_endpoint: String,
    /// Secret credential; never read from the config file
    #[serde(skip)]
    pub api_key: String,
    pub model_name: String,
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f64,
    pub timeout_seconds: u64,
    /// Extra attempts after a transient failure
    pub max_retries: u32,
    /// Delay before the first retry; grows linearly per attempt
    pub retry_backoff_ms: u64,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            api_endpoint: "https://api.groq.com/openai/v1".to_string(),
            api_key: String::new(),
            model_name: "llama-3.3-70b-versatile".to_string(),
            max_tokens: 1024,
            temperature: 0.5,
            timeout_seconds: 30,
            max_retries: 0,
            retry_backoff_ms: 500,
        }
    }
}

impl fmt::Debug for LLMConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LLMConfig")
            .field("api_endpoint", &self.api_endpoint)
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("model_name", &self.model_name)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .finish()
    }
}

/// Speaker of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One message sent to the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Generation request; unset sampling fields fall back to `LLMConfig`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub messages: Vec<ChatMessage>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
}

impl GenerationRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            max_tokens: None,
            temperature: None,
        }
    }
}

/// Generated text plus bookkeeping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub text: String,
    pub usage: LLMUsage,
    pub model: String,
    pub finish_reason: String,
}

/// Token usage statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LLMUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

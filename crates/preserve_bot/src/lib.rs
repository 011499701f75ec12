//! FoodPreserveBot
//!
//! Conversational food-preservation assistant:
//! - Shelf-life estimates from the deterministic regression model
//! - A static preservation-technique knowledge base
//! - Prompt composition for an OpenAI-compatible text-generation backend

pub mod composer;
pub mod config;
pub mod errors;
pub mod knowledge;
pub mod llm;
pub mod service;
pub mod session;
pub mod types;

pub use composer::{ComposedContext, ComposedResponse, ResponseComposer, ShelfLifeParams, SystemPrompt};
pub use config::BotConfig;
pub use errors::BotError;
pub use llm::{LLMService, TextGenerator};
pub use service::{FoodPreserveBot, ShelfLifeOutlook};
pub use session::{Conversation, ConversationTurn, GREETING};
pub use types::*;

/// Re-export model functionality
pub use foodpreserve_shelf_model::{
    FallbackPolicy, ModelError, Prediction, ShelfLifeEstimator, ShelfLifePredictor,
};

/// Bot version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

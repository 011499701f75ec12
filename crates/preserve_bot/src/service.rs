//! FoodPreserveBot facade
//!
//! Wires the shelf-life predictor, the text generator and the response
//! composer together once at startup. All collaborators are shared by `Arc`.

use foodpreserve_shelf_model::{Prediction, ShelfLifeEstimator, ShelfLifePredictor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

use crate::composer::{ComposedResponse, ResponseComposer, ShelfLifeParams, SystemPrompt};
use crate::config::BotConfig;
use crate::errors::BotError;
use crate::knowledge::knowledge_context;
use crate::llm::{LLMService, TextGenerator};
use crate::session::Conversation;

/// Days below which food is flagged as high risk
pub const HIGH_RISK_DAYS: f64 = 2.0;
/// Days above which food is considered long lasting
pub const LONG_LASTING_DAYS: f64 = 180.0;

/// Advisory band for a shelf-life estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShelfLifeOutlook {
    HighRisk,
    Normal,
    LongLasting,
}

impl ShelfLifeOutlook {
    pub fn classify(days: f64) -> Self {
        if days < HIGH_RISK_DAYS {
            ShelfLifeOutlook::HighRisk
        } else if days > LONG_LASTING_DAYS {
            ShelfLifeOutlook::LongLasting
        } else {
            ShelfLifeOutlook::Normal
        }
    }

    pub fn advice(&self) -> &'static str {
        match self {
            ShelfLifeOutlook::HighRisk => "High risk of spoilage! Consume immediately or freeze.",
            ShelfLifeOutlook::Normal => "Store under the stated conditions and check regularly.",
            ShelfLifeOutlook::LongLasting => "Long shelf life expected under these conditions.",
        }
    }
}

impl fmt::Display for ShelfLifeOutlook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShelfLifeOutlook::HighRisk => write!(f, "high risk"),
            ShelfLifeOutlook::Normal => write!(f, "normal"),
            ShelfLifeOutlook::LongLasting => write!(f, "long lasting"),
        }
    }
}

pub struct FoodPreserveBot {
    estimator: Arc<dyn ShelfLifeEstimator>,
    composer: ResponseComposer,
}

impl FoodPreserveBot {
    /// Build from configuration. The model trains lazily on first use.
    pub fn new(config: &BotConfig) -> Result<Self, BotError> {
        config.validate()?;

        let estimator: Arc<dyn ShelfLifeEstimator> =
            Arc::new(ShelfLifePredictor::new(config.predictor_config()));
        let generator: Arc<dyn TextGenerator> = Arc::new(LLMService::new(config.llm.clone())?);

        info!(
            dataset = %config.dataset_path.display(),
            model = %config.llm.model_name,
            "FoodPreserveBot initialized"
        );
        Ok(Self::with_components(estimator, generator))
    }

    /// Build around existing collaborators
    pub fn with_components(
        estimator: Arc<dyn ShelfLifeEstimator>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        let composer = ResponseComposer::new(
            estimator.clone(),
            generator,
            SystemPrompt::new(&knowledge_context()),
        );
        Self { estimator, composer }
    }

    pub fn get_categories(&self) -> Result<Vec<String>, BotError> {
        Ok(self.estimator.list_categories()?)
    }

    pub fn predict(&self, temperature: f64, acidity: f64, category: &str) -> Result<Prediction, BotError> {
        Ok(self.estimator.predict(temperature, acidity, category)?)
    }

    pub async fn get_response(&self, user_text: &str, params: &ShelfLifeParams) -> Result<String, BotError> {
        self.composer.get_response(user_text, params).await
    }

    /// One conversational turn; history changes only when a reply was produced
    pub async fn chat(
        &self,
        conversation: &mut Conversation,
        user_text: &str,
        params: &ShelfLifeParams,
    ) -> Result<ComposedResponse, BotError> {
        match self.composer.compose(user_text, params).await {
            Ok(response) => {
                conversation.record_exchange(user_text, response.text.clone());
                Ok(response)
            }
            Err(err) => {
                warn!(conversation = %conversation.id, "Turn failed, history unchanged: {}", err);
                Err(err)
            }
        }
    }
}

//! Response composition
//!
//! Decides whether a user turn gets a shelf-life estimate, builds the
//! context string and hands `[system, context]` to the text generator.
//! Holds no state beyond its collaborators.

use foodpreserve_shelf_model::{Prediction, ShelfLifeEstimator};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::errors::BotError;
use crate::llm::TextGenerator;
use crate::types::{ChatMessage, GenerationRequest};

/// Fixed system instruction, computed once from the knowledge corpus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemPrompt(String);

impl SystemPrompt {
    pub fn new(knowledge: &str) -> Self {
        Self(format!(
            "You are FoodPreserveBot, an expert AI assistant specialized in food preservation and shelf-life estimation.\n\
             Your goal is to educate users on how to store food properly and provide scientific estimates for shelf life.\n\
             \n\
             Use the following Knowledge Base to answer questions about preservation techniques:\n\
             {knowledge}\n\
             When the user's message includes a calculated predicted shelf life, treat it as the estimate from a trained model \
             and explain which storage conditions drive it.\n\
             \n\
             Structure your responses using clear headings and bullet points.\n\
             If the user simply says \"hi\" or asks general questions, be helpful and educational.\n"
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Storage parameters optionally attached to a user turn
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShelfLifeParams {
    pub temperature: Option<f64>,
    pub acidity: Option<f64>,
    pub category: Option<String>,
}

impl ShelfLifeParams {
    pub fn new(temperature: f64, acidity: f64, category: impl Into<String>) -> Self {
        Self {
            temperature: Some(temperature),
            acidity: Some(acidity),
            category: Some(category.into()),
        }
    }

    /// All three values, or `None` if any is missing
    pub fn complete(&self) -> Option<(f64, f64, &str)> {
        Some((self.temperature?, self.acidity?, self.category.as_deref()?))
    }

    /// Some but not all values are set
    pub fn is_partial(&self) -> bool {
        let set = [
            self.temperature.is_some(),
            self.acidity.is_some(),
            self.category.is_some(),
        ];
        set.iter().any(|s| *s) && !set.iter().all(|s| *s)
    }
}

/// Context string plus the estimate embedded in it, if any
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedContext {
    pub text: String,
    pub prediction: Option<Prediction>,
}

/// Backend reply plus the estimate that informed it
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedResponse {
    pub text: String,
    pub prediction: Option<Prediction>,
}

pub struct ResponseComposer {
    estimator: Arc<dyn ShelfLifeEstimator>,
    generator: Arc<dyn TextGenerator>,
    system_prompt: SystemPrompt,
}

impl ResponseComposer {
    pub fn new(
        estimator: Arc<dyn ShelfLifeEstimator>,
        generator: Arc<dyn TextGenerator>,
        system_prompt: SystemPrompt,
    ) -> Self {
        Self {
            estimator,
            generator,
            system_prompt,
        }
    }

    pub fn system_prompt(&self) -> &SystemPrompt {
        &self.system_prompt
    }

    /// Build the context for one turn. The estimator runs only for a complete parameter set.
    pub fn build_context(&self, user_text: &str, params: &ShelfLifeParams) -> Result<ComposedContext, BotError> {
        let Some((temperature, acidity, category)) = params.complete() else {
            return Ok(ComposedContext {
                text: format!("User Input: {user_text}"),
                prediction: None,
            });
        };

        let prediction = self.estimator.predict(temperature, acidity, category)?;
        if prediction.fallback {
            debug!(
                requested = %prediction.requested_category,
                used = %prediction.category_used,
                "Context built with fallback category"
            );
        }

        let text = format!(
            "User Input: {user_text}\nContext: The user has set the following parameters: \
             Temperature={temperature}C, pH={acidity}, Category={category}. \
             The calculated predicted shelf life is {days:.1} days.",
            days = prediction.days
        );

        Ok(ComposedContext {
            text,
            prediction: Some(prediction),
        })
    }

    /// Compose a reply; the generated text is returned verbatim
    pub async fn compose(&self, user_text: &str, params: &ShelfLifeParams) -> Result<ComposedResponse, BotError> {
        let context = self.build_context(user_text, params)?;

        let request = GenerationRequest::new(vec![
            ChatMessage::system(self.system_prompt.as_str()),
            ChatMessage::user(context.text),
        ]);

        let response = self.generator.generate(request).await.map_err(|err| {
            warn!("Text generation failed: {}", err);
            match err {
                BotError::Generation(_) => err,
                other => BotError::Generation(other.to_string()),
            }
        })?;

        Ok(ComposedResponse {
            text: response.text,
            prediction: context.prediction,
        })
    }

    pub async fn get_response(&self, user_text: &str, params: &ShelfLifeParams) -> Result<String, BotError> {
        Ok(self.compose(user_text, params).await?.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_requires_all_fields() {
        assert!(ShelfLifeParams::default().complete().is_none());

        let partial = ShelfLifeParams {
            temperature: Some(4.0),
            acidity: Some(6.0),
            category: None,
        };
        assert!(partial.complete().is_none());

        assert!(partial.is_partial());

        let full = ShelfLifeParams::new(4.0, 6.0, "Vegetable");
        assert_eq!(full.complete(), Some((4.0, 6.0, "Vegetable")));
        assert!(!full.is_partial());
        assert!(!ShelfLifeParams::default().is_partial());
    }

    #[test]
    fn test_system_prompt_embeds_knowledge() {
        let prompt = SystemPrompt::new("## Drying\n");
        assert!(prompt.as_str().starts_with("You are FoodPreserveBot"));
        assert!(prompt.as_str().contains("## Drying\n"));
    }
}

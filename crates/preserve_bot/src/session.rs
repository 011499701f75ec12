//! Conversation history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::ChatRole;

/// Opening line shown before the first user turn
pub const GREETING: &str = "Hello! I'm FoodPreserveBot. How can I help you preserve your food today?";

/// One displayed turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: ChatRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    fn new(role: ChatRole, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Per-user chat history. Turns are only ever appended in user/assistant pairs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub started_at: DateTime<Utc>,
    turns: Vec<ConversationTurn>,
}

impl Conversation {
    /// Start a conversation seeded with the assistant greeting
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            turns: vec![ConversationTurn::new(ChatRole::Assistant, GREETING)],
        }
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last_reply(&self) -> Option<&str> {
        self.turns
            .iter()
            .rev()
            .find(|turn| turn.role == ChatRole::Assistant)
            .map(|turn| turn.text.as_str())
    }

    /// Append a completed exchange
    pub fn record_exchange(&mut self, user_text: impl Into<String>, reply: impl Into<String>) {
        self.turns.push(ConversationTurn::new(ChatRole::User, user_text));
        self.turns.push(ConversationTurn::new(ChatRole::Assistant, reply));
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_conversation_starts_with_greeting() {
        let conversation = Conversation::new();

        assert_eq!(conversation.len(), 1);
        assert_eq!(conversation.last_reply(), Some(GREETING));
        assert!(!conversation.id.is_empty());
    }

    #[test]
    fn test_record_exchange_appends_pair() {
        let mut conversation = Conversation::new();
        conversation.record_exchange("hi", "Hello there");

        let turns = conversation.turns();
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[1].role, ChatRole::User);
        assert_eq!(turns[1].text, "hi");
        assert_eq!(conversation.last_reply(), Some("Hello there"));
    }

    #[test]
    fn test_conversations_get_distinct_ids() {
        assert_ne!(Conversation::new().id, Conversation::new().id);
    }
}

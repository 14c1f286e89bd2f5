//! Advisory chat conversation model.

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use vitashop_core::types::{DbId, Timestamp};

pub const ROLE_USER: &str = "user";
pub const ROLE_ASSISTANT: &str = "assistant";

/// One message in a conversation, stored inside the `messages` JSONB array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// `"user"` or `"assistant"`.
    pub role: String,
    pub content: String,
    pub created_at: Timestamp,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ROLE_USER.to_string(),
            content: content.into(),
            created_at: chrono::Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ROLE_ASSISTANT.to_string(),
            content: content.into(),
            created_at: chrono::Utc::now(),
        }
    }
}

/// A row from the `ai_conversations` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AiConversation {
    pub id: DbId,
    pub user_id: DbId,
    pub title: Option<String>,
    pub messages: Json<Vec<ChatMessage>>,
    pub tags: Vec<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Conversation listing entry without the message bodies.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AiConversationSummary {
    pub id: DbId,
    pub title: Option<String>,
    pub tags: Vec<String>,
    pub message_count: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

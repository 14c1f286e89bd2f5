//! Repository for the `ai_conversations` table.

use sqlx::types::Json;
use sqlx::PgPool;
use vitashop_core::types::DbId;

use crate::models::ai_conversation::{AiConversation, AiConversationSummary, ChatMessage};

const COLUMNS: &str = "id, user_id, title, messages, tags, created_at, updated_at";

const SUMMARY_COLUMNS: &str = "id, title, tags, jsonb_array_length(messages)::BIGINT AS message_count, \
                               created_at, updated_at";

/// Stores advisory chat history per user.
pub struct AiConversationRepo;

impl AiConversationRepo {
    /// Start an empty conversation.
    pub async fn create(
        pool: &PgPool,
        user_id: DbId,
        title: Option<&str>,
    ) -> Result<AiConversation, sqlx::Error> {
        let query = format!(
            "INSERT INTO ai_conversations (user_id, title)
             VALUES ($1, $2)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AiConversation>(&query)
            .bind(user_id)
            .bind(title)
            .fetch_one(pool)
            .await
    }

    /// Append `messages` and replace the tag set.
    ///
    /// Returns `None` when the conversation does not belong to `user_id`.
    pub async fn append_messages(
        pool: &PgPool,
        id: DbId,
        user_id: DbId,
        messages: &[ChatMessage],
        tags: &[String],
    ) -> Result<Option<AiConversation>, sqlx::Error> {
        let query = format!(
            "UPDATE ai_conversations SET
                messages = messages || $3,
                tags = $4
             WHERE id = $1 AND user_id = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AiConversation>(&query)
            .bind(id)
            .bind(user_id)
            .bind(Json(messages))
            .bind(tags)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_for_user(
        pool: &PgPool,
        id: DbId,
        user_id: DbId,
    ) -> Result<Option<AiConversation>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM ai_conversations WHERE id = $1 AND user_id = $2");
        sqlx::query_as::<_, AiConversation>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Most recently active conversations first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AiConversationSummary>, sqlx::Error> {
        let query = format!(
            "SELECT {SUMMARY_COLUMNS} FROM ai_conversations
             WHERE user_id = $1
             ORDER BY updated_at DESC, id DESC
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, AiConversationSummary>(&query)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn delete_for_user(pool: &PgPool, id: DbId, user_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM ai_conversations WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

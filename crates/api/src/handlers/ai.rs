//! Advisory chat and product recommendation handlers (`/ai`).
//!
//! Recommendations are rule based: free text and selected goals are mapped
//! to product tags, and products sharing those tags are suggested. Chat
//! replies come from the configured language model when there is one, with
//! the rule-based template as fallback.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use vitashop_core::advisory::{
    extract_tags, merge_tags, recommendation_message, system_prompt, tags_for_goals,
    DEFAULT_RECOMMENDATION_LIMIT, MAX_MESSAGE_CHARS, MAX_RECOMMENDATION_LIMIT,
};
use vitashop_core::error::CoreError;
use vitashop_core::pagination::clamp_limit;
use vitashop_core::types::DbId;
use vitashop_db::models::ai_conversation::{AiConversation, AiConversationSummary, ChatMessage};
use vitashop_db::models::product::Product;
use vitashop_db::repositories::{AiConversationRepo, ProductRepo};

use crate::error::{AppError, AppResult};
use crate::handlers::found;
use crate::integrations::llm::ChatTurn;
use crate::middleware::auth::{AuthUser, OptionalAuthUser};
use crate::query::PageParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Conversation titles are the opening message, cut to this many characters.
const TITLE_CHARS: usize = 60;

#[derive(Debug, Default, Deserialize)]
pub struct RecommendRequest {
    #[serde(default)]
    pub goals: Vec<String>,
    pub text: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct RecommendResponse {
    pub tags: Vec<String>,
    pub products: Vec<Product>,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub conversation_id: Option<DbId>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub conversation_id: DbId,
    pub reply: String,
    pub tags: Vec<String>,
    pub products: Vec<Product>,
}

/// Trim `text` and enforce the message length limit.
fn clean_message(text: &str) -> AppResult<&str> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Message must not be empty".into(),
        )));
    }
    if text.chars().count() > MAX_MESSAGE_CHARS {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Message must be at most {MAX_MESSAGE_CHARS} characters"
        ))));
    }
    Ok(text)
}

/// Tags for a recommendation request, or 400 when it names no goals.
fn request_tags(input: &RecommendRequest) -> AppResult<Vec<String>> {
    let text = input.text.as_deref().map(str::trim).filter(|t| !t.is_empty());
    let goals: Vec<String> = input
        .goals
        .iter()
        .filter(|g| !g.trim().is_empty())
        .cloned()
        .collect();
    if goals.is_empty() && text.is_none() {
        return Err(AppError::BadRequest(
            "Provide at least one goal or a description".into(),
        ));
    }

    let from_text = match text {
        Some(t) => extract_tags(clean_message(t)?),
        None => Vec::new(),
    };
    Ok(merge_tags(&tags_for_goals(&goals), &from_text))
}

fn conversation_title(message: &str) -> String {
    message.chars().take(TITLE_CHARS).collect()
}

fn product_names(products: &[Product]) -> Vec<String> {
    products.iter().map(|p| p.name.clone()).collect()
}

/// POST /api/ai/recommend
pub async fn recommend(
    State(state): State<AppState>,
    user: OptionalAuthUser,
    Json(input): Json<RecommendRequest>,
) -> AppResult<Json<RecommendResponse>> {
    let tags = request_tags(&input)?;
    let limit = clamp_limit(input.limit, DEFAULT_RECOMMENDATION_LIMIT, MAX_RECOMMENDATION_LIMIT);

    let products = ProductRepo::find_by_tags(&state.pool, &tags, limit).await?;
    let message = recommendation_message(&tags, &product_names(&products));

    tracing::debug!(
        user_id = user.0.as_ref().map(|u| u.user_id),
        ?tags,
        matches = products.len(),
        "Recommendation served",
    );
    Ok(Json(RecommendResponse {
        tags,
        products,
        message,
    }))
}

/// Produce the assistant reply, preferring the language model.
async fn generate_reply(
    state: &AppState,
    conversation: &AiConversation,
    message: &str,
    tags: &[String],
    names: &[String],
) -> String {
    let Some(model) = &state.chat_model else {
        return recommendation_message(tags, names);
    };

    let mut history: Vec<ChatTurn> = conversation
        .messages
        .iter()
        .map(|m| ChatTurn::new(m.role.clone(), m.content.clone()))
        .collect();
    history.push(ChatTurn::new("user", message));

    match model.complete(&system_prompt(tags, names), &history).await {
        Ok(reply) => reply,
        Err(e) => {
            tracing::warn!(
                error = %e,
                conversation_id = conversation.id,
                "Chat model failed, using template reply",
            );
            recommendation_message(tags, names)
        }
    }
}

/// POST /api/ai/chat
pub async fn chat(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(input): Json<ChatRequest>,
) -> AppResult<Json<ChatResponse>> {
    let message = clean_message(&input.message)?;

    let conversation = match input.conversation_id {
        Some(id) => found(
            AiConversationRepo::find_for_user(&state.pool, id, auth_user.user_id).await?,
            "Conversation",
            id,
        )?,
        None => {
            AiConversationRepo::create(
                &state.pool,
                auth_user.user_id,
                Some(&conversation_title(message)),
            )
            .await?
        }
    };

    let tags = merge_tags(&conversation.tags, &extract_tags(message));
    let products =
        ProductRepo::find_by_tags(&state.pool, &tags, DEFAULT_RECOMMENDATION_LIMIT).await?;
    let names = product_names(&products);

    let reply = generate_reply(&state, &conversation, message, &tags, &names).await;

    let stored = AiConversationRepo::append_messages(
        &state.pool,
        conversation.id,
        auth_user.user_id,
        &[ChatMessage::user(message), ChatMessage::assistant(reply.clone())],
        &tags,
    )
    .await?;
    let conversation = found(stored, "Conversation", conversation.id)?;

    Ok(Json(ChatResponse {
        conversation_id: conversation.id,
        reply,
        tags,
        products,
    }))
}

/// GET /api/ai/conversations
pub async fn list_conversations(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(params): Query<PageParams>,
) -> AppResult<Json<DataResponse<Vec<AiConversationSummary>>>> {
    let page = params.resolve();
    let conversations =
        AiConversationRepo::list_for_user(&state.pool, auth_user.user_id, page.limit, page.offset())
            .await?;
    Ok(Json(DataResponse {
        data: conversations,
    }))
}

/// GET /api/ai/conversations/{id}
pub async fn get_conversation(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<AiConversation>>> {
    let conversation = found(
        AiConversationRepo::find_for_user(&state.pool, id, auth_user.user_id).await?,
        "Conversation",
        id,
    )?;
    Ok(Json(DataResponse { data: conversation }))
}

/// DELETE /api/ai/conversations/{id}
pub async fn delete_conversation(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !AiConversationRepo::delete_for_user(&state.pool, id, auth_user.user_id).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Conversation",
            id,
        }));
    }
    Ok(StatusCode::NO_CONTENT)
}

//! Chat-completions client for the advisory chat.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::config::{env_opt, env_or};

const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_MAX_TOKENS: u32 = 400;
const TEMPERATURE: f32 = 0.4;

/// Most recent conversation messages sent along with a new prompt.
pub const MAX_HISTORY_MESSAGES: usize = 20;

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub api_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl LlmConfig {
    /// Load LLM settings; `None` when `LLM_API_KEY` is unset.
    ///
    /// | Env Var            | Default                                       |
    /// |--------------------|-----------------------------------------------|
    /// | `LLM_API_KEY`      | unset (template replies only)                 |
    /// | `LLM_API_URL`      | `https://api.openai.com/v1/chat/completions`  |
    /// | `LLM_MODEL`        | `gpt-4o-mini`                                 |
    /// | `LLM_TIMEOUT_SECS` | `30`                                          |
    pub fn from_env() -> Option<Self> {
        let api_key = env_opt("LLM_API_KEY")?;
        Some(Self {
            api_key,
            api_url: env_or("LLM_API_URL", DEFAULT_API_URL.to_string()),
            model: env_or("LLM_MODEL", DEFAULT_MODEL.to_string()),
            timeout_secs: env_or("LLM_TIMEOUT_SECS", 30),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("LLM API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("LLM returned no content")]
    EmptyResponse,
}

/// One message of the prompt, in chat-completions shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

impl ChatTurn {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Produce the assistant reply for `history` under `system`.
    async fn complete(&self, system: &str, history: &[ChatTurn]) -> Result<String, LlmError>;
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatTurn>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: ChatTurn,
}

/// OpenAI-compatible chat-completions client.
#[derive(Clone)]
pub struct OpenAiChatModel {
    inner: Arc<OpenAiChatModelInner>,
}

struct OpenAiChatModelInner {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl OpenAiChatModel {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            inner: Arc::new(OpenAiChatModelInner {
                client,
                api_url: config.api_url.clone(),
                api_key: config.api_key.clone(),
                model: config.model.clone(),
            }),
        })
    }
}

/// System prompt followed by the newest `MAX_HISTORY_MESSAGES` of history.
pub fn build_messages(system: &str, history: &[ChatTurn]) -> Vec<ChatTurn> {
    let skip = history.len().saturating_sub(MAX_HISTORY_MESSAGES);
    std::iter::once(ChatTurn::new("system", system))
        .chain(history.iter().skip(skip).cloned())
        .collect()
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    #[instrument(skip(self, system, history), fields(model = %self.inner.model, turns = history.len()))]
    async fn complete(&self, system: &str, history: &[ChatTurn]) -> Result<String, LlmError> {
        let request = CompletionRequest {
            model: &self.inner.model,
            messages: build_messages(system, history),
            temperature: TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        };

        let response = self
            .inner
            .client
            .post(&self.inner.api_url)
            .bearer_auth(&self.inner.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let completion: CompletionResponse = response.json().await?;
        completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or(LlmError::EmptyResponse)
    }
}

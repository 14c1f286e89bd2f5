use std::sync::Arc;

use crate::config::ServerConfig;
use crate::integrations::llm::ChatModel;
use crate::integrations::payments::PaymentProvider;
use crate::integrations::storage::ObjectStore;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything is behind `Arc` or is already `Clone`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: vitashop_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Centralized event bus for publishing domain events.
    pub event_bus: Arc<vitashop_events::EventBus>,
    /// Hosted checkout provider.
    pub payments: Arc<dyn PaymentProvider>,
    /// LLM used by the advisory chat. `None` falls back to template replies.
    pub chat_model: Option<Arc<dyn ChatModel>>,
    /// Product image storage.
    pub object_store: Arc<dyn ObjectStore>,
}

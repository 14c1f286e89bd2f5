//! Route definitions for the `/ai` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::ai;
use crate::state::AppState;

/// Routes mounted at `/ai`.
///
/// ```text
/// POST   /recommend             -> recommend (auth optional)
/// POST   /chat                  -> chat
/// GET    /conversations         -> list_conversations
/// GET    /conversations/{id}    -> get_conversation
/// DELETE /conversations/{id}    -> delete_conversation
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/recommend", post(ai::recommend))
        .route("/chat", post(ai::chat))
        .route("/conversations", get(ai::list_conversations))
        .route(
            "/conversations/{id}",
            get(ai::get_conversation).delete(ai::delete_conversation),
        )
}

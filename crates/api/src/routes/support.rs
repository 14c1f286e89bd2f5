//! Route definitions for `/support/tickets`.

use axum::routing::{get, patch, post};
use axum::Router;

use crate::handlers::support;
use crate::state::AppState;

/// Routes mounted at `/support/tickets`.
///
/// ```text
/// GET   /                -> list
/// POST  /                -> create
/// GET   /{id}            -> get_by_id
/// POST  /{id}/messages   -> reply
/// POST  /{id}/close      -> close
/// PATCH /{id}/status     -> update_status (admin)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(support::list).post(support::create))
        .route("/{id}", get(support::get_by_id))
        .route("/{id}/messages", post(support::reply))
        .route("/{id}/close", post(support::close))
        .route("/{id}/status", patch(support::update_status))
}

//! Route definitions for the `/orders` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::orders;
use crate::state::AppState;

/// Routes mounted at `/orders`.
///
/// ```text
/// GET  /             -> list_mine
/// POST /             -> create
/// GET  /{id}         -> get_by_id
/// POST /{id}/cancel  -> cancel
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::list_mine).post(orders::create))
        .route("/{id}", get(orders::get_by_id))
        .route("/{id}/cancel", post(orders::cancel))
}

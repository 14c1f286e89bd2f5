//! Route definitions for the `/admin` resource.

use axum::routing::{get, patch};
use axum::Router;

use crate::handlers::{orders, users};
use crate::state::AppState;

/// Admin-only routes mounted at `/admin`.
///
/// ```text
/// GET   /users               -> list_users
/// GET   /orders              -> admin_list
/// PATCH /orders/{id}/status  -> admin_update_status
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(users::list_users))
        .route("/orders", get(orders::admin_list))
        .route("/orders/{id}/status", patch(orders::admin_update_status))
}

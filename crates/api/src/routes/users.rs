//! Route definitions for the `/users` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::{auth, users};
use crate::state::AppState;

/// Routes mounted at `/users`.
///
/// ```text
/// GET /me  -> me
/// PUT /me  -> update_me
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/me", get(auth::me).put(users::update_me))
}

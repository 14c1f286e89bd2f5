//! Route definitions for the `/addresses` resource.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::addresses;
use crate::state::AppState;

/// Routes mounted at `/addresses`.
///
/// ```text
/// GET    /               -> list
/// POST   /               -> create
/// PUT    /{id}           -> update
/// DELETE /{id}           -> delete
/// POST   /{id}/default   -> set_default
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(addresses::list).post(addresses::create))
        .route("/{id}", put(addresses::update).delete(addresses::delete))
        .route("/{id}/default", post(addresses::set_default))
}

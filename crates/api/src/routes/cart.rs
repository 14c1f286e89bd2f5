//! Route definitions for the `/cart` resource.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::cart;
use crate::state::AppState;

/// Routes mounted at `/cart`.
///
/// ```text
/// GET    /                    -> get_cart
/// DELETE /                    -> clear
/// POST   /items               -> add_item
/// PUT    /items/{product_id}  -> set_quantity
/// DELETE /items/{product_id}  -> remove_item
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::get_cart).delete(cart::clear))
        .route("/items", post(cart::add_item))
        .route(
            "/items/{product_id}",
            put(cart::set_quantity).delete(cart::remove_item),
        )
}

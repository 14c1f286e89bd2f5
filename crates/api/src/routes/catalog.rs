//! Route definitions for `/categories` and `/products`.
//!
//! Reads are public; writes require the admin role.

use axum::routing::get;
use axum::Router;

use crate::handlers::{categories, products};
use crate::state::AppState;

/// Routes mounted at `/categories`.
///
/// ```text
/// GET    /      -> list
/// POST   /      -> create
/// GET    /{id}  -> get_by_id
/// PUT    /{id}  -> update
/// DELETE /{id}  -> delete
/// ```
pub fn categories_router() -> Router<AppState> {
    Router::new()
        .route("/", get(categories::list).post(categories::create))
        .route(
            "/{id}",
            get(categories::get_by_id)
                .put(categories::update)
                .delete(categories::delete),
        )
}

/// Routes mounted at `/products`.
///
/// ```text
/// GET    /              -> list
/// POST   /              -> create
/// GET    /slug/{slug}   -> get_by_slug
/// GET    /{id}          -> get_by_id
/// PUT    /{id}          -> update
/// DELETE /{id}          -> delete (deactivate)
/// ```
pub fn products_router() -> Router<AppState> {
    Router::new()
        .route("/", get(products::list).post(products::create))
        .route("/slug/{slug}", get(products::get_by_slug))
        .route(
            "/{id}",
            get(products::get_by_id)
                .put(products::update)
                .delete(products::delete),
        )
}

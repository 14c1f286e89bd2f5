pub mod addresses;
pub mod admin;
pub mod ai;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod health;
pub mod orders;
pub mod payments;
pub mod storage;
pub mod support;
pub mod users;

use axum::Router;

use crate::config::ServerConfig;
use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/register, /auth/login, ...                 authentication
/// /users/me                                        own profile
///
/// /categories, /categories/{id}                    catalog (admin writes)
/// /products, /products/{id}, /products/slug/{s}    catalog (admin writes)
///
/// /cart, /cart/items/{product_id}                  shopping cart
/// /addresses, /addresses/{id}                      shipping addresses
/// /orders, /orders/{id}, /orders/{id}/cancel       orders
///
/// /payments/checkout/{order_id}                    hosted checkout
/// /payments/webhook                                processor webhook
///
/// /ai/recommend, /ai/chat, /ai/conversations       advisory chat
/// /storage/upload, /storage/{*key}                 product images (admin)
/// /support/tickets, /support/tickets/{id}/...      support tickets
///
/// /admin/users                                     user listing (admin)
/// /admin/orders, /admin/orders/{id}/status         order management (admin)
/// ```
pub fn api_routes(config: &ServerConfig) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/categories", catalog::categories_router())
        .nest("/products", catalog::products_router())
        .nest("/cart", cart::router())
        .nest("/addresses", addresses::router())
        .nest("/orders", orders::router())
        .nest("/payments", payments::router())
        .nest("/ai", ai::router())
        .nest("/storage", storage::router(config.storage.max_upload_bytes))
        .nest("/support/tickets", support::router())
        .nest("/admin", admin::router())
}

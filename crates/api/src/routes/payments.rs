//! Route definitions for the `/payments` resource.

use axum::routing::post;
use axum::Router;

use crate::handlers::payments;
use crate::state::AppState;

/// Routes mounted at `/payments`.
///
/// ```text
/// POST /checkout/{order_id}  -> checkout (requires auth)
/// POST /webhook              -> webhook (signed by the processor)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/checkout/{order_id}", post(payments::checkout))
        .route("/webhook", post(payments::webhook))
}

//! Route definitions for `/storage` (admin only).

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, post};
use axum::Router;

use crate::handlers::storage;
use crate::state::AppState;

/// Allowance for multipart boundaries and the `folder` field on top of the
/// file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Routes mounted at `/storage`.
///
/// ```text
/// POST   /upload  -> upload (multipart)
/// DELETE /{*key}  -> delete
/// ```
pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/upload",
            post(storage::upload).layer(DefaultBodyLimit::max(
                max_upload_bytes + MULTIPART_OVERHEAD_BYTES,
            )),
        )
        .route("/{*key}", delete(storage::delete))
}

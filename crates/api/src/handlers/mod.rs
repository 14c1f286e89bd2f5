pub mod addresses;
pub mod ai;
pub mod auth;
pub mod cart;
pub mod categories;
pub mod orders;
pub mod payments;
pub mod products;
pub mod storage;
pub mod support;
pub mod users;

use validator::Validate;
use vitashop_core::error::CoreError;

use crate::error::{AppError, AppResult};

/// Run `validator` derive rules on a request body.
pub(crate) fn validate_body<T: Validate>(input: &T) -> AppResult<()> {
    input
        .validate()
        .map_err(|e| AppError::Core(CoreError::Validation(e.to_string())))
}

/// Map `None` to a 404 for `entity`.
pub(crate) fn found<T>(
    value: Option<T>,
    entity: &'static str,
    id: vitashop_core::types::DbId,
) -> AppResult<T> {
    value.ok_or(AppError::Core(CoreError::NotFound { entity, id }))
}

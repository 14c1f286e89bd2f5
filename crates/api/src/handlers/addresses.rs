//! Handlers for the `/addresses` resource. Every route is scoped to the
//! authenticated user.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use validator::Validate;
use vitashop_core::error::CoreError;
use vitashop_core::types::DbId;
use vitashop_db::models::address::{Address, CreateAddress, UpdateAddress};
use vitashop_db::repositories::AddressRepo;

use crate::error::{AppError, AppResult};
use crate::handlers::{found, validate_body};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAddressRequest {
    #[validate(length(min = 1, max = 200))]
    pub full_name: String,
    #[validate(length(min = 1, max = 200))]
    pub line1: String,
    #[validate(length(max = 200))]
    pub line2: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[validate(length(max = 100))]
    pub state: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub postal_code: String,
    /// ISO 3166-1 alpha-2 code.
    #[validate(length(equal = 2))]
    pub country: String,
    #[validate(length(max = 40))]
    pub phone: Option<String>,
    pub is_default: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateAddressRequest {
    #[validate(length(min = 1, max = 200))]
    pub full_name: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub line1: Option<String>,
    #[validate(length(max = 200))]
    pub line2: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub city: Option<String>,
    #[validate(length(max = 100))]
    pub state: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub postal_code: Option<String>,
    #[validate(length(equal = 2))]
    pub country: Option<String>,
    #[validate(length(max = 40))]
    pub phone: Option<String>,
}

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Address",
        id,
    })
}

/// GET /api/addresses
pub async fn list(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<DataResponse<Vec<Address>>>> {
    let addresses = AddressRepo::list_for_user(&state.pool, auth_user.user_id).await?;
    Ok(Json(DataResponse { data: addresses }))
}

/// POST /api/addresses
///
/// The user's first address becomes the default automatically.
pub async fn create(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(input): Json<CreateAddressRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Address>>)> {
    validate_body(&input)?;

    let create = CreateAddress {
        full_name: input.full_name.trim().to_string(),
        line1: input.line1.trim().to_string(),
        line2: input.line2,
        city: input.city.trim().to_string(),
        state: input.state,
        postal_code: input.postal_code.trim().to_string(),
        country: input.country.to_ascii_uppercase(),
        phone: input.phone,
        is_default: input.is_default,
    };
    let address = AddressRepo::create(&state.pool, auth_user.user_id, &create).await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: address })))
}

/// PUT /api/addresses/{id}
pub async fn update(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateAddressRequest>,
) -> AppResult<Json<DataResponse<Address>>> {
    validate_body(&input)?;

    let update = UpdateAddress {
        full_name: input.full_name,
        line1: input.line1,
        line2: input.line2,
        city: input.city,
        state: input.state,
        postal_code: input.postal_code,
        country: input.country.map(|c| c.to_ascii_uppercase()),
        phone: input.phone,
    };
    let address = found(
        AddressRepo::update(&state.pool, id, auth_user.user_id, &update).await?,
        "Address",
        id,
    )?;
    Ok(Json(DataResponse { data: address }))
}

/// DELETE /api/addresses/{id}
pub async fn delete(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !AddressRepo::delete(&state.pool, id, auth_user.user_id).await? {
        return Err(not_found(id));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/addresses/{id}/default
pub async fn set_default(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Address>>> {
    let address = AddressRepo::set_default(&state.pool, id, auth_user.user_id)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(DataResponse { data: address }))
}

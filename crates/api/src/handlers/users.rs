//! Profile and admin user listing.

use std::collections::HashMap;

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use validator::Validate;
use vitashop_db::models::user::{UpdateProfile, UserResponse};
use vitashop_db::repositories::{RoleRepo, UserRepo};

use crate::error::AppResult;
use crate::handlers::{found, validate_body};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::query::PageParams;
use crate::response::{DataResponse, PaginatedResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
}

/// PUT /api/users/me
pub async fn update_me(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(input): Json<UpdateProfileRequest>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    validate_body(&input)?;

    let update = UpdateProfile {
        first_name: input.first_name.map(|v| v.trim().to_string()),
        last_name: input.last_name.map(|v| v.trim().to_string()),
    };
    let user = found(
        UserRepo::update_profile(&state.pool, auth_user.user_id, &update).await?,
        "User",
        auth_user.user_id,
    )?;
    let role_name = RoleRepo::resolve_name(&state.pool, user.role_id).await?;

    Ok(Json(DataResponse {
        data: user.to_response(role_name),
    }))
}

/// GET /api/admin/users?page=&limit=
pub async fn list_users(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> AppResult<Json<PaginatedResponse<UserResponse>>> {
    let page = params.resolve();
    let users = UserRepo::list(&state.pool, page.limit, page.offset()).await?;
    let total = UserRepo::count(&state.pool).await?;

    let roles: HashMap<_, _> = RoleRepo::list(&state.pool)
        .await?
        .into_iter()
        .map(|r| (r.id, r.name))
        .collect();

    let data = users
        .iter()
        .map(|u| {
            let role = roles.get(&u.role_id).cloned().unwrap_or_else(|| "unknown".into());
            u.to_response(role)
        })
        .collect();

    Ok(Json(PaginatedResponse {
        data,
        meta: page.meta(total),
    }))
}

//! Handlers for the `/categories` resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use validator::Validate;
use vitashop_core::catalog::{slugify, validate_slug};
use vitashop_core::error::CoreError;
use vitashop_core::types::DbId;
use vitashop_db::models::category::{Category, CreateCategory, UpdateCategory};
use vitashop_db::repositories::CategoryRepo;

use crate::error::{AppError, AppResult};
use crate::handlers::{found, validate_body};
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    /// Derived from `name` when omitted.
    pub slug: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    pub slug: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

/// Use the caller's slug when given, otherwise derive one from `name`.
pub(crate) fn resolve_slug(slug: Option<&str>, name: &str) -> AppResult<String> {
    let slug = match slug.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => s.to_string(),
        None => slugify(name),
    };
    validate_slug(&slug)?;
    Ok(slug)
}

/// GET /api/categories
pub async fn list(State(state): State<AppState>) -> AppResult<Json<DataResponse<Vec<Category>>>> {
    let categories = CategoryRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: categories }))
}

/// GET /api/categories/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Category>>> {
    let category = found(CategoryRepo::find_by_id(&state.pool, id).await?, "Category", id)?;
    Ok(Json(DataResponse { data: category }))
}

/// POST /api/categories
pub async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<CreateCategoryRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Category>>)> {
    validate_body(&input)?;
    let name = input.name.trim().to_string();
    let slug = resolve_slug(input.slug.as_deref(), &name)?;

    let category = CategoryRepo::create(
        &state.pool,
        &CreateCategory {
            name,
            slug,
            description: input.description,
        },
    )
    .await?;

    tracing::info!(category_id = category.id, user_id = admin.user_id, "Category created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: category })))
}

/// PUT /api/categories/{id}
pub async fn update(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateCategoryRequest>,
) -> AppResult<Json<DataResponse<Category>>> {
    validate_body(&input)?;
    if let Some(slug) = &input.slug {
        validate_slug(slug)?;
    }

    let update = UpdateCategory {
        name: input.name.map(|n| n.trim().to_string()),
        slug: input.slug,
        description: input.description,
    };
    let category = found(
        CategoryRepo::update(&state.pool, id, &update).await?,
        "Category",
        id,
    )?;
    Ok(Json(DataResponse { data: category }))
}

/// DELETE /api/categories/{id}
///
/// Fails with 409 while products still reference the category.
pub async fn delete(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !CategoryRepo::delete(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Category",
            id,
        }));
    }
    tracing::info!(category_id = id, user_id = admin.user_id, "Category deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_derived_from_name_when_missing() {
        assert_eq!(resolve_slug(None, "Sleep & Relaxation").unwrap(), "sleep-relaxation");
        assert_eq!(resolve_slug(Some("  "), "Immunity").unwrap(), "immunity");
    }

    #[test]
    fn explicit_slug_is_validated() {
        assert_eq!(resolve_slug(Some("vitamins"), "x").unwrap(), "vitamins");
        assert!(resolve_slug(Some("Bad Slug"), "x").is_err());
        assert!(resolve_slug(None, "!!!").is_err());
    }
}

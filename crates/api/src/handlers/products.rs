//! Handlers for the `/products` resource.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use validator::Validate;
use vitashop_core::catalog::{
    normalize_tags, validate_price, validate_price_range, validate_slug, validate_stock,
    ProductSort,
};
use vitashop_core::error::CoreError;
use vitashop_core::pagination::Page;
use vitashop_core::types::{Cents, DbId};
use vitashop_db::models::product::{CreateProduct, Product, ProductQuery, UpdateProduct};
use vitashop_db::repositories::{CategoryRepo, ProductRepo};

use crate::error::{AppError, AppResult};
use crate::handlers::categories::resolve_slug;
use crate::handlers::{found, validate_body};
use crate::middleware::auth::OptionalAuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::response::{DataResponse, PaginatedResponse};
use crate::state::AppState;

/// Query parameters for `GET /products`.
#[derive(Debug, Default, Deserialize)]
pub struct ListProductsParams {
    /// Category id or slug.
    pub category: Option<String>,
    pub search: Option<String>,
    /// One tag or a comma-separated list; products matching any are returned.
    pub tag: Option<String>,
    pub min_price: Option<Cents>,
    pub max_price: Option<Cents>,
    #[serde(default)]
    pub in_stock: bool,
    pub sort: Option<ProductSort>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
    /// Honoured for admins only.
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductRequest {
    pub category_id: Option<DbId>,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub slug: Option<String>,
    #[validate(length(max = 10000))]
    pub description: Option<String>,
    pub price_cents: Cents,
    #[serde(default)]
    pub stock: i32,
    #[validate(length(max = 2048))]
    pub image_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProductRequest {
    pub category_id: Option<DbId>,
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub slug: Option<String>,
    #[validate(length(max = 10000))]
    pub description: Option<String>,
    pub price_cents: Option<Cents>,
    pub stock: Option<i32>,
    #[validate(length(max = 2048))]
    pub image_url: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

/// Translate query parameters into a repository filter.
fn build_query(params: &ListProductsParams, is_admin: bool) -> AppResult<(ProductQuery, Page)> {
    validate_price_range(params.min_price, params.max_price)?;
    let page = Page::new(params.page, params.limit);

    let (category_id, category_slug) = match params.category.as_deref().map(str::trim) {
        Some(c) if !c.is_empty() => match c.parse::<DbId>() {
            Ok(id) => (Some(id), None),
            Err(_) => (None, Some(c.to_string())),
        },
        _ => (None, None),
    };

    let tags = match &params.tag {
        Some(raw) => {
            let split: Vec<String> = raw.split(',').map(str::to_string).collect();
            normalize_tags(&split)?
        }
        None => Vec::new(),
    };

    let search = params
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let query = ProductQuery {
        category_id,
        category_slug,
        search,
        tags,
        min_price: params.min_price,
        max_price: params.max_price,
        in_stock_only: params.in_stock,
        include_inactive: is_admin && params.include_inactive,
        sort: params.sort.unwrap_or_default(),
        limit: page.limit,
        offset: page.offset(),
    };
    Ok((query, page))
}

/// 404 for inactive products unless the caller is an admin.
fn visible(product: Option<Product>, is_admin: bool) -> Option<Product> {
    product.filter(|p| p.is_active || is_admin)
}

fn is_admin(user: &OptionalAuthUser) -> bool {
    user.0.as_ref().is_some_and(|u| u.is_admin())
}

async fn ensure_category_exists(state: &AppState, category_id: Option<DbId>) -> AppResult<()> {
    if let Some(id) = category_id {
        found(CategoryRepo::find_by_id(&state.pool, id).await?, "Category", id)?;
    }
    Ok(())
}

/// GET /api/products
pub async fn list(
    State(state): State<AppState>,
    user: OptionalAuthUser,
    Query(params): Query<ListProductsParams>,
) -> AppResult<Json<PaginatedResponse<Product>>> {
    let (query, page) = build_query(&params, is_admin(&user))?;

    let products = ProductRepo::list(&state.pool, &query).await?;
    let total = ProductRepo::count(&state.pool, &query).await?;

    Ok(Json(PaginatedResponse {
        data: products,
        meta: page.meta(total),
    }))
}

/// GET /api/products/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    user: OptionalAuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Product>>> {
    let product = ProductRepo::find_by_id(&state.pool, id).await?;
    let product = found(visible(product, is_admin(&user)), "Product", id)?;
    Ok(Json(DataResponse { data: product }))
}

/// GET /api/products/slug/{slug}
pub async fn get_by_slug(
    State(state): State<AppState>,
    user: OptionalAuthUser,
    Path(slug): Path<String>,
) -> AppResult<Json<DataResponse<Product>>> {
    let product = ProductRepo::find_by_slug(&state.pool, &slug).await?;
    // Slug lookups have no numeric id; report a plain 404.
    let product = visible(product, is_admin(&user))
        .ok_or(AppError::Database(sqlx::Error::RowNotFound))?;
    Ok(Json(DataResponse { data: product }))
}

/// POST /api/products
pub async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<CreateProductRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Product>>)> {
    validate_body(&input)?;
    validate_price(input.price_cents)?;
    validate_stock(input.stock)?;
    let tags = normalize_tags(&input.tags)?;
    ensure_category_exists(&state, input.category_id).await?;

    let name = input.name.trim().to_string();
    let slug = resolve_slug(input.slug.as_deref(), &name)?;

    let product = ProductRepo::create(
        &state.pool,
        &CreateProduct {
            category_id: input.category_id,
            name,
            slug,
            description: input.description,
            price_cents: input.price_cents,
            stock: input.stock,
            image_url: input.image_url,
            tags,
            is_active: input.is_active,
        },
    )
    .await?;

    tracing::info!(product_id = product.id, user_id = admin.user_id, "Product created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: product })))
}

/// PUT /api/products/{id}
pub async fn update(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateProductRequest>,
) -> AppResult<Json<DataResponse<Product>>> {
    validate_body(&input)?;
    if let Some(price) = input.price_cents {
        validate_price(price)?;
    }
    if let Some(stock) = input.stock {
        validate_stock(stock)?;
    }
    if let Some(slug) = &input.slug {
        validate_slug(slug)?;
    }
    let tags = input.tags.as_deref().map(normalize_tags).transpose()?;
    ensure_category_exists(&state, input.category_id).await?;

    let update = UpdateProduct {
        category_id: input.category_id,
        name: input.name.map(|n| n.trim().to_string()),
        slug: input.slug,
        description: input.description,
        price_cents: input.price_cents,
        stock: input.stock,
        image_url: input.image_url,
        tags,
        is_active: input.is_active,
    };
    let product = found(
        ProductRepo::update(&state.pool, id, &update).await?,
        "Product",
        id,
    )?;

    tracing::info!(product_id = id, user_id = admin.user_id, "Product updated");
    Ok(Json(DataResponse { data: product }))
}

/// DELETE /api/products/{id}
///
/// Soft delete: the product is hidden from the storefront but order history
/// keeps referencing it.
pub async fn delete(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !ProductRepo::deactivate(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Product",
            id,
        }));
    }
    tracing::info!(product_id = id, user_id = admin.user_id, "Product deactivated");
    Ok(StatusCode::NO_CONTENT)
}

//! Handlers for the `/cart` resource.
//!
//! Cart quantities are checked against current stock when they change, but
//! stock is only reserved when an order is placed.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use vitashop_core::error::CoreError;
use vitashop_core::orders::{line_total, validate_quantity};
use vitashop_core::types::{Cents, DbId};
use vitashop_db::models::cart::CartLine;
use vitashop_db::models::product::Product;
use vitashop_db::repositories::{CartRepo, ProductRepo};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: DbId,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct SetQuantityRequest {
    pub quantity: i32,
}

#[derive(Debug, Serialize)]
pub struct CartItemView {
    pub product_id: DbId,
    pub name: String,
    pub slug: String,
    pub image_url: Option<String>,
    pub unit_price_cents: Cents,
    pub quantity: i32,
    pub line_total_cents: Cents,
    pub stock: i32,
    /// `false` when the product was deactivated or stock dropped below the
    /// requested quantity since it was added.
    pub available: bool,
}

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub items: Vec<CartItemView>,
    pub total_cents: Cents,
}

fn build_cart(lines: Vec<CartLine>) -> AppResult<CartResponse> {
    let mut total_cents: Cents = 0;
    let mut items = Vec::with_capacity(lines.len());
    for line in lines {
        let line_total_cents = line_total(line.unit_price_cents, line.quantity)?;
        total_cents = total_cents
            .checked_add(line_total_cents)
            .ok_or_else(|| CoreError::Validation("Cart total overflows".into()))?;
        items.push(CartItemView {
            available: line.is_active && line.stock >= line.quantity,
            product_id: line.product_id,
            name: line.name,
            slug: line.slug,
            image_url: line.image_url,
            unit_price_cents: line.unit_price_cents,
            quantity: line.quantity,
            line_total_cents,
            stock: line.stock,
        });
    }
    Ok(CartResponse { items, total_cents })
}

async fn load_cart(state: &AppState, user_id: DbId) -> AppResult<CartResponse> {
    build_cart(CartRepo::list_for_user(&state.pool, user_id).await?)
}

/// Fetch an active product or 404.
async fn purchasable_product(state: &AppState, product_id: DbId) -> AppResult<Product> {
    ProductRepo::find_by_id(&state.pool, product_id)
        .await?
        .filter(|p| p.is_active)
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Product",
            id: product_id,
        }))
}

fn ensure_stock(product: &Product, quantity: i32) -> AppResult<()> {
    if quantity > product.stock {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Only {} of '{}' in stock",
            product.stock, product.name
        ))));
    }
    Ok(())
}

/// GET /api/cart
pub async fn get_cart(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<CartResponse>> {
    Ok(Json(load_cart(&state, auth_user.user_id).await?))
}

/// POST /api/cart/items
///
/// Adds to any quantity already in the cart.
pub async fn add_item(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(input): Json<AddItemRequest>,
) -> AppResult<Json<CartResponse>> {
    validate_quantity(input.quantity)?;
    let product = purchasable_product(&state, input.product_id).await?;

    let existing = CartRepo::quantity_of(&state.pool, auth_user.user_id, product.id).await?;
    let combined = existing + input.quantity;
    validate_quantity(combined)?;
    ensure_stock(&product, combined)?;

    CartRepo::upsert_item(&state.pool, auth_user.user_id, product.id, input.quantity).await?;
    tracing::debug!(user_id = auth_user.user_id, product_id = product.id, combined, "Cart item added");

    Ok(Json(load_cart(&state, auth_user.user_id).await?))
}

/// PUT /api/cart/items/{product_id}
pub async fn set_quantity(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(product_id): Path<DbId>,
    Json(input): Json<SetQuantityRequest>,
) -> AppResult<Json<CartResponse>> {
    validate_quantity(input.quantity)?;
    let product = purchasable_product(&state, product_id).await?;
    ensure_stock(&product, input.quantity)?;

    if !CartRepo::set_quantity(&state.pool, auth_user.user_id, product_id, input.quantity).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Cart item",
            id: product_id,
        }));
    }

    Ok(Json(load_cart(&state, auth_user.user_id).await?))
}

/// DELETE /api/cart/items/{product_id}
pub async fn remove_item(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(product_id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !CartRepo::remove_item(&state.pool, auth_user.user_id, product_id).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Cart item",
            id: product_id,
        }));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/cart
pub async fn clear(State(state): State<AppState>, auth_user: AuthUser) -> AppResult<StatusCode> {
    CartRepo::clear(&state.pool, auth_user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

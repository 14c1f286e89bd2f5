//! Product model, DTOs and the catalog listing filter.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use vitashop_core::catalog::ProductSort;
use vitashop_core::types::{Cents, DbId, Timestamp};

/// A product row from the `products` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Product {
    pub id: DbId,
    pub category_id: Option<DbId>,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price_cents: Cents,
    pub stock: i32,
    pub image_url: Option<String>,
    pub tags: Vec<String>,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a product. Slug and tags are normalised by the caller.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProduct {
    pub category_id: Option<DbId>,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price_cents: Cents,
    pub stock: i32,
    pub image_url: Option<String>,
    pub tags: Vec<String>,
    pub is_active: Option<bool>,
}

/// DTO for updating a product. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProduct {
    pub category_id: Option<DbId>,
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<Cents>,
    pub stock: Option<i32>,
    pub image_url: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

/// Resolved catalog listing filter.
#[derive(Debug, Clone, Default)]
pub struct ProductQuery {
    pub category_id: Option<DbId>,
    pub category_slug: Option<String>,
    /// Case-insensitive substring match on name and description.
    pub search: Option<String>,
    /// Products carrying any of these tags.
    pub tags: Vec<String>,
    pub min_price: Option<Cents>,
    pub max_price: Option<Cents>,
    pub in_stock_only: bool,
    pub include_inactive: bool,
    pub sort: ProductSort,
    pub limit: i64,
    pub offset: i64,
}

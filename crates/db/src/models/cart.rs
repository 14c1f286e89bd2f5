//! Cart rows joined with their product.

use serde::Serialize;
use sqlx::FromRow;
use vitashop_core::types::{Cents, DbId, Timestamp};

/// A cart line with current product data.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CartLine {
    pub product_id: DbId,
    pub name: String,
    pub slug: String,
    pub image_url: Option<String>,
    pub unit_price_cents: Cents,
    pub quantity: i32,
    pub stock: i32,
    pub is_active: bool,
    pub added_at: Timestamp,
}

//! Order and order item models.

use serde::Serialize;
use sqlx::FromRow;
use vitashop_core::orders::LineRequest;
use vitashop_core::status::StatusId;
use vitashop_core::types::{Cents, DbId, Timestamp};

/// A row from the `orders` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Order {
    pub id: DbId,
    pub user_id: DbId,
    pub status_id: StatusId,
    pub total_cents: Cents,
    pub currency: String,
    pub shipping_address: Option<serde_json::Value>,
    pub checkout_session_id: Option<String>,
    pub paid_at: Option<Timestamp>,
    pub cancelled_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `order_items` table. Name and price are snapshots taken
/// when the order was placed.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OrderItem {
    pub id: DbId,
    pub order_id: DbId,
    pub product_id: DbId,
    pub product_name: String,
    pub unit_price_cents: Cents,
    pub quantity: i32,
    pub created_at: Timestamp,
}

/// Input for [`crate::repositories::OrderRepo::create_with_items`].
#[derive(Debug, Clone)]
pub struct CreateOrder {
    pub user_id: DbId,
    /// Already merged and validated lines.
    pub lines: Vec<LineRequest>,
    pub currency: String,
    pub shipping_address: Option<serde_json::Value>,
    /// Empty the user's cart in the same transaction.
    pub clear_cart: bool,
}

/// Filter for the admin order listing.
#[derive(Debug, Clone, Default)]
pub struct OrderQuery {
    pub user_id: Option<DbId>,
    pub status_id: Option<StatusId>,
    pub limit: i64,
    pub offset: i64,
}

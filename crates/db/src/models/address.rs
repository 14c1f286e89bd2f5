//! Shipping address model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use vitashop_core::types::{DbId, Timestamp};

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Address {
    pub id: DbId,
    pub user_id: DbId,
    pub full_name: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: Option<String>,
    pub postal_code: String,
    pub country: String,
    pub phone: Option<String>,
    pub is_default: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Address {
    /// Copy of the address fields stored on an order, so later edits do not
    /// rewrite order history.
    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "full_name": self.full_name,
            "line1": self.line1,
            "line2": self.line2,
            "city": self.city,
            "state": self.state,
            "postal_code": self.postal_code,
            "country": self.country,
            "phone": self.phone,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAddress {
    pub full_name: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: Option<String>,
    pub postal_code: String,
    pub country: String,
    pub phone: Option<String>,
    pub is_default: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAddress {
    pub full_name: Option<String>,
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
}

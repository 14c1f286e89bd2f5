//! Repository for the `cart_items` table.

use sqlx::PgPool;
use vitashop_core::types::DbId;

use crate::models::cart::CartLine;

const LINE_COLUMNS: &str = "p.id AS product_id, p.name, p.slug, p.image_url, \
                            p.price_cents AS unit_price_cents, c.quantity, p.stock, p.is_active, \
                            c.created_at AS added_at";

/// Provides operations on a user's cart.
pub struct CartRepo;

impl CartRepo {
    /// All cart lines with current product data, oldest first.
    pub async fn list_for_user(pool: &PgPool, user_id: DbId) -> Result<Vec<CartLine>, sqlx::Error> {
        let query = format!(
            "SELECT {LINE_COLUMNS}
             FROM cart_items c
             JOIN products p ON p.id = c.product_id
             WHERE c.user_id = $1
             ORDER BY c.created_at ASC, c.id ASC"
        );
        sqlx::query_as::<_, CartLine>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Current quantity of `product_id` in the cart (0 when absent).
    pub async fn quantity_of(
        pool: &PgPool,
        user_id: DbId,
        product_id: DbId,
    ) -> Result<i32, sqlx::Error> {
        let qty: Option<i32> = sqlx::query_scalar(
            "SELECT quantity FROM cart_items WHERE user_id = $1 AND product_id = $2",
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_optional(pool)
        .await?;
        Ok(qty.unwrap_or(0))
    }

    /// Add `quantity` units, summing with any existing line. Returns the new
    /// line quantity.
    pub async fn upsert_item(
        pool: &PgPool,
        user_id: DbId,
        product_id: DbId,
        quantity: i32,
    ) -> Result<i32, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO cart_items (user_id, product_id, quantity)
             VALUES ($1, $2, $3)
             ON CONFLICT ON CONSTRAINT uq_cart_items_user_product
             DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
             RETURNING quantity",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .fetch_one(pool)
        .await
    }

    /// Replace the quantity of an existing line. Returns `false` if the
    /// product is not in the cart.
    pub async fn set_quantity(
        pool: &PgPool,
        user_id: DbId,
        product_id: DbId,
        quantity: i32,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE cart_items SET quantity = $3 WHERE user_id = $1 AND product_id = $2",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn remove_item(
        pool: &PgPool,
        user_id: DbId,
        product_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
            .bind(user_id)
            .bind(product_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Empty the cart. Returns the number of removed lines.
    pub async fn clear(pool: &PgPool, user_id: DbId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

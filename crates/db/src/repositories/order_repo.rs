//! Repository for the `orders` and `order_items` tables.

use sqlx::PgPool;
use vitashop_core::error::CoreError;
use vitashop_core::orders;
use vitashop_core::status::OrderStatus;
use vitashop_core::types::DbId;

use crate::models::order::{CreateOrder, Order, OrderItem, OrderQuery};
use crate::repositories::ProductRepo;

const COLUMNS: &str = "id, user_id, status_id, total_cents, currency, shipping_address, \
                       checkout_session_id, paid_at, cancelled_at, created_at, updated_at";

const ITEM_COLUMNS: &str =
    "id, order_id, product_id, product_name, unit_price_cents, quantity, created_at";

/// Why an order could not be placed. Every variant rolls the transaction back.
#[derive(Debug, thiserror::Error)]
pub enum OrderCreateError {
    #[error("Product {0} is not available")]
    ProductUnavailable(DbId),

    #[error("Insufficient stock for '{name}': requested {requested}, available {available}")]
    InsufficientStock {
        product_id: DbId,
        name: String,
        requested: i32,
        available: i32,
    },

    #[error(transparent)]
    Pricing(#[from] CoreError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Provides order placement and lifecycle operations.
pub struct OrderRepo;

impl OrderRepo {
    /// Place an order in a single transaction.
    ///
    /// Stock for every line is reserved with a conditional update, prices and
    /// names are snapshotted into `order_items`, and the cart is optionally
    /// emptied. Any failure leaves stock, orders and cart untouched.
    pub async fn create_with_items(
        pool: &PgPool,
        input: &CreateOrder,
    ) -> Result<(Order, Vec<OrderItem>), OrderCreateError> {
        let mut tx = pool.begin().await?;

        // Reserve in id order so concurrent orders lock rows consistently.
        let mut by_id = input.lines.clone();
        by_id.sort_by_key(|line| line.product_id);

        let mut reserved = Vec::with_capacity(by_id.len());
        for line in &by_id {
            match ProductRepo::decrement_stock(&mut *tx, line.product_id, line.quantity).await? {
                Some(reservation) => reserved.push((line.product_id, reservation)),
                None => {
                    let current: Option<(String, i32, bool)> = sqlx::query_as(
                        "SELECT name, stock, is_active FROM products WHERE id = $1",
                    )
                    .bind(line.product_id)
                    .fetch_optional(&mut *tx)
                    .await?;
                    return Err(match current {
                        Some((name, stock, true)) => OrderCreateError::InsufficientStock {
                            product_id: line.product_id,
                            name,
                            requested: line.quantity,
                            available: stock,
                        },
                        _ => OrderCreateError::ProductUnavailable(line.product_id),
                    });
                }
            }
        }

        let priced: Vec<_> = input
            .lines
            .iter()
            .filter_map(|line| {
                reserved
                    .iter()
                    .find(|(id, _)| *id == line.product_id)
                    .map(|(_, r)| (line, r))
            })
            .collect();

        let total = orders::order_total(priced.iter().map(|(l, r)| (r.price_cents, l.quantity)))?;

        let query = format!(
            "INSERT INTO orders (user_id, status_id, total_cents, currency, shipping_address)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        let order = sqlx::query_as::<_, Order>(&query)
            .bind(input.user_id)
            .bind(OrderStatus::Pending.id())
            .bind(total)
            .bind(&input.currency)
            .bind(&input.shipping_address)
            .fetch_one(&mut *tx)
            .await?;

        let item_query = format!(
            "INSERT INTO order_items (order_id, product_id, product_name, unit_price_cents, quantity)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {ITEM_COLUMNS}"
        );
        let mut items = Vec::with_capacity(priced.len());
        for (line, reservation) in &priced {
            let item = sqlx::query_as::<_, OrderItem>(&item_query)
                .bind(order.id)
                .bind(line.product_id)
                .bind(&reservation.name)
                .bind(reservation.price_cents)
                .bind(line.quantity)
                .fetch_one(&mut *tx)
                .await?;
            items.push(item);
        }

        if input.clear_cart {
            sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
                .bind(input.user_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok((order, items))
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Order>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM orders WHERE id = $1");
        sqlx::query_as::<_, Order>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find an order owned by `user_id`.
    pub async fn find_for_user(
        pool: &PgPool,
        id: DbId,
        user_id: DbId,
    ) -> Result<Option<Order>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM orders WHERE id = $1 AND user_id = $2");
        sqlx::query_as::<_, Order>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// List orders, newest first, optionally filtered by owner and status.
    pub async fn list(pool: &PgPool, params: &OrderQuery) -> Result<Vec<Order>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM orders
             WHERE ($1::BIGINT IS NULL OR user_id = $1)
               AND ($2::SMALLINT IS NULL OR status_id = $2)
             ORDER BY created_at DESC, id DESC
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, Order>(&query)
            .bind(params.user_id)
            .bind(params.status_id)
            .bind(params.limit)
            .bind(params.offset)
            .fetch_all(pool)
            .await
    }

    pub async fn count(pool: &PgPool, params: &OrderQuery) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*)::BIGINT FROM orders
             WHERE ($1::BIGINT IS NULL OR user_id = $1)
               AND ($2::SMALLINT IS NULL OR status_id = $2)",
        )
        .bind(params.user_id)
        .bind(params.status_id)
        .fetch_one(pool)
        .await
    }

    pub async fn items_for_order(
        pool: &PgPool,
        order_id: DbId,
    ) -> Result<Vec<OrderItem>, sqlx::Error> {
        let query =
            format!("SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY id ASC");
        sqlx::query_as::<_, OrderItem>(&query)
            .bind(order_id)
            .fetch_all(pool)
            .await
    }

    /// Attach a checkout session to a pending order.
    ///
    /// Returns `false` if the order is no longer pending.
    pub async fn set_checkout_session(
        pool: &PgPool,
        id: DbId,
        session_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE orders SET checkout_session_id = $2 WHERE id = $1 AND status_id = $3",
        )
        .bind(id)
        .bind(session_id)
        .bind(OrderStatus::Pending.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn find_by_checkout_session(
        pool: &PgPool,
        session_id: &str,
    ) -> Result<Option<Order>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM orders WHERE checkout_session_id = $1");
        sqlx::query_as::<_, Order>(&query)
            .bind(session_id)
            .fetch_optional(pool)
            .await
    }

    /// Move a pending order to paid.
    ///
    /// Returns `None` when the order is not pending, which makes repeated
    /// webhook deliveries a no-op.
    pub async fn mark_paid(pool: &PgPool, id: DbId) -> Result<Option<Order>, sqlx::Error> {
        let query = format!(
            "UPDATE orders SET status_id = $2, paid_at = NOW()
             WHERE id = $1 AND status_id = $3
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Order>(&query)
            .bind(id)
            .bind(OrderStatus::Paid.id())
            .bind(OrderStatus::Pending.id())
            .fetch_optional(pool)
            .await
    }

    /// Change status from `from` to `to` if the order is still in `from`.
    ///
    /// Returns `None` when another request changed the status first. When `to`
    /// returns stock, every item is restocked in the same transaction.
    pub async fn transition_status(
        pool: &PgPool,
        id: DbId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Option<Order>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE orders SET
                status_id = $3,
                paid_at = CASE WHEN $3 = $4 THEN COALESCE(paid_at, NOW()) ELSE paid_at END,
                cancelled_at = CASE WHEN $3 = $5 THEN NOW() ELSE cancelled_at END
             WHERE id = $1 AND status_id = $2
             RETURNING {COLUMNS}"
        );
        let order = sqlx::query_as::<_, Order>(&query)
            .bind(id)
            .bind(from.id())
            .bind(to.id())
            .bind(OrderStatus::Paid.id())
            .bind(OrderStatus::Cancelled.id())
            .fetch_optional(&mut *tx)
            .await?;

        let Some(order) = order else {
            return Ok(None);
        };

        if to.restocks() && !from.restocks() {
            let items: Vec<(DbId, i32)> =
                sqlx::query_as("SELECT product_id, quantity FROM order_items WHERE order_id = $1")
                    .bind(id)
                    .fetch_all(&mut *tx)
                    .await?;
            for (product_id, quantity) in items {
                ProductRepo::restock(&mut *tx, product_id, quantity).await?;
            }
        }

        tx.commit().await?;
        Ok(Some(order))
    }
}

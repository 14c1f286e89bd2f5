//! Repository for the `products` table.

use sqlx::{PgConnection, PgPool};
use vitashop_core::types::{Cents, DbId};

use crate::models::product::{CreateProduct, Product, ProductQuery, UpdateProduct};

const COLUMNS: &str = "id, category_id, name, slug, description, price_cents, stock, \
                       image_url, tags, is_active, created_at, updated_at";

/// Product data captured when stock is reserved for an order line.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StockReservation {
    pub id: DbId,
    pub name: String,
    pub price_cents: Cents,
    pub stock: i32,
}

/// Provides catalog queries and stock operations for products.
pub struct ProductRepo;

impl ProductRepo {
    pub async fn create(pool: &PgPool, input: &CreateProduct) -> Result<Product, sqlx::Error> {
        let query = format!(
            "INSERT INTO products
                (category_id, name, slug, description, price_cents, stock, image_url, tags, is_active)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, COALESCE($9, true))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Product>(&query)
            .bind(input.category_id)
            .bind(&input.name)
            .bind(&input.slug)
            .bind(&input.description)
            .bind(input.price_cents)
            .bind(input.stock)
            .bind(&input.image_url)
            .bind(&input.tags)
            .bind(input.is_active)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Product>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM products WHERE id = $1");
        sqlx::query_as::<_, Product>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_slug(pool: &PgPool, slug: &str) -> Result<Option<Product>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM products WHERE slug = $1");
        sqlx::query_as::<_, Product>(&query)
            .bind(slug)
            .fetch_optional(pool)
            .await
    }

    /// List products matching `params`, ordered by `params.sort`.
    pub async fn list(pool: &PgPool, params: &ProductQuery) -> Result<Vec<Product>, sqlx::Error> {
        let (where_clause, bind_values, bind_idx) = build_product_filter(params);

        let query = format!(
            "SELECT {COLUMNS} FROM products {where_clause} \
             ORDER BY {} \
             LIMIT ${bind_idx} OFFSET ${}",
            params.sort.order_by(),
            bind_idx + 1
        );

        let q = bind_product_values(sqlx::query_as::<_, Product>(&query), &bind_values);
        q.bind(params.limit)
            .bind(params.offset)
            .fetch_all(pool)
            .await
    }

    /// Count products matching `params` (for pagination metadata).
    pub async fn count(pool: &PgPool, params: &ProductQuery) -> Result<i64, sqlx::Error> {
        let (where_clause, bind_values, _) = build_product_filter(params);

        let query = format!("SELECT COUNT(*)::BIGINT FROM products {where_clause}");

        let q = bind_product_values_scalar(sqlx::query_scalar::<_, i64>(&query), &bind_values);
        q.fetch_one(pool).await
    }

    /// Update a product. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateProduct,
    ) -> Result<Option<Product>, sqlx::Error> {
        let query = format!(
            "UPDATE products SET
                category_id = COALESCE($2, category_id),
                name = COALESCE($3, name),
                slug = COALESCE($4, slug),
                description = COALESCE($5, description),
                price_cents = COALESCE($6, price_cents),
                stock = COALESCE($7, stock),
                image_url = COALESCE($8, image_url),
                tags = COALESCE($9, tags),
                is_active = COALESCE($10, is_active)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Product>(&query)
            .bind(id)
            .bind(input.category_id)
            .bind(&input.name)
            .bind(&input.slug)
            .bind(&input.description)
            .bind(input.price_cents)
            .bind(input.stock)
            .bind(&input.image_url)
            .bind(&input.tags)
            .bind(input.is_active)
            .fetch_optional(pool)
            .await
    }

    /// Hide a product from the storefront. Returns `true` if the row existed.
    pub async fn deactivate(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE products SET is_active = false WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Reserve `quantity` units of an active product.
    ///
    /// The conditional update only succeeds while enough stock remains, so two
    /// concurrent orders can never both take the last unit. Returns `None`
    /// when the product is missing, inactive or short on stock. Run inside the
    /// caller's transaction.
    pub async fn decrement_stock(
        conn: &mut PgConnection,
        product_id: DbId,
        quantity: i32,
    ) -> Result<Option<StockReservation>, sqlx::Error> {
        sqlx::query_as::<_, StockReservation>(
            "UPDATE products SET stock = stock - $2
             WHERE id = $1 AND is_active = true AND stock >= $2
             RETURNING id, name, price_cents, stock",
        )
        .bind(product_id)
        .bind(quantity)
        .fetch_optional(conn)
        .await
    }

    /// Return `quantity` units to stock.
    pub async fn restock(
        conn: &mut PgConnection,
        product_id: DbId,
        quantity: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE products SET stock = stock + $2 WHERE id = $1")
            .bind(product_id)
            .bind(quantity)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Active, in-stock products sharing at least one of `tags`, best overlap
    /// first.
    pub async fn find_by_tags(
        pool: &PgPool,
        tags: &[String],
        limit: i64,
    ) -> Result<Vec<Product>, sqlx::Error> {
        if tags.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!(
            "SELECT {COLUMNS} FROM products
             WHERE is_active = true AND stock > 0 AND tags && $1
             ORDER BY cardinality(ARRAY(SELECT unnest(tags) INTERSECT SELECT unnest($1::TEXT[]))) DESC,
                      created_at DESC, id DESC
             LIMIT $2"
        );
        sqlx::query_as::<_, Product>(&query)
            .bind(tags)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}

// ---------------------------------------------------------------------------
// Internal helpers for dynamic query building
// ---------------------------------------------------------------------------

/// Typed bind value for dynamically-built product queries.
enum BindValue {
    BigInt(i64),
    Text(String),
    TextArray(Vec<String>),
}

/// Escape `%`, `_` and `\` so user input matches literally inside `ILIKE`.
fn like_pattern(text: &str) -> String {
    let escaped = text
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Build a WHERE clause and bind values from `ProductQuery`.
///
/// Returns `(where_clause, bind_values, next_bind_index)`.
/// The `where_clause` is empty if no filters are active, or starts with `WHERE `.
fn build_product_filter(params: &ProductQuery) -> (String, Vec<BindValue>, u32) {
    let mut conditions: Vec<String> = Vec::new();
    let mut bind_idx = 1u32;
    let mut bind_values: Vec<BindValue> = Vec::new();

    if !params.include_inactive {
        conditions.push("is_active = true".to_string());
    }

    if params.in_stock_only {
        conditions.push("stock > 0".to_string());
    }

    if let Some(category_id) = params.category_id {
        conditions.push(format!("category_id = ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::BigInt(category_id));
    }

    if let Some(ref slug) = params.category_slug {
        conditions.push(format!(
            "category_id = (SELECT id FROM categories WHERE slug = ${bind_idx})"
        ));
        bind_idx += 1;
        bind_values.push(BindValue::Text(slug.clone()));
    }

    if let Some(ref search) = params.search {
        conditions.push(format!(
            "(name ILIKE ${bind_idx} OR description ILIKE ${bind_idx})"
        ));
        bind_idx += 1;
        bind_values.push(BindValue::Text(like_pattern(search)));
    }

    if !params.tags.is_empty() {
        conditions.push(format!("tags && ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::TextArray(params.tags.clone()));
    }

    if let Some(min) = params.min_price {
        conditions.push(format!("price_cents >= ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::BigInt(min));
    }

    if let Some(max) = params.max_price {
        conditions.push(format!("price_cents <= ${bind_idx}"));
        bind_idx += 1;
        bind_values.push(BindValue::BigInt(max));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    (where_clause, bind_values, bind_idx)
}

fn bind_product_values<'q, O>(
    mut q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments>,
    bind_values: &'q [BindValue],
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments> {
    for val in bind_values {
        match val {
            BindValue::BigInt(v) => q = q.bind(*v),
            BindValue::Text(v) => q = q.bind(v.as_str()),
            BindValue::TextArray(v) => q = q.bind(v.as_slice()),
        }
    }
    q
}

fn bind_product_values_scalar<'q>(
    mut q: sqlx::query::QueryScalar<'q, sqlx::Postgres, i64, sqlx::postgres::PgArguments>,
    bind_values: &'q [BindValue],
) -> sqlx::query::QueryScalar<'q, sqlx::Postgres, i64, sqlx::postgres::PgArguments> {
    for val in bind_values {
        match val {
            BindValue::BigInt(v) => q = q.bind(*v),
            BindValue::Text(v) => q = q.bind(v.as_str()),
            BindValue::TextArray(v) => q = q.bind(v.as_slice()),
        }
    }
    q
}

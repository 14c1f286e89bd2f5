//! Repository for the `addresses` table.

use sqlx::PgPool;
use vitashop_core::types::DbId;

use crate::models::address::{Address, CreateAddress, UpdateAddress};

const COLUMNS: &str = "id, user_id, full_name, line1, line2, city, state, postal_code, \
                       country, phone, is_default, created_at, updated_at";

/// Provides CRUD operations for a user's shipping addresses.
///
/// Every query is scoped by `user_id`, so a foreign address behaves like a
/// missing one.
pub struct AddressRepo;

impl AddressRepo {
    /// Insert an address. The user's first address always becomes the default.
    pub async fn create(
        pool: &PgPool,
        user_id: DbId,
        input: &CreateAddress,
    ) -> Result<Address, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let existing: i64 =
            sqlx::query_scalar("SELECT COUNT(*)::BIGINT FROM addresses WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await?;
        let is_default = existing == 0 || input.is_default.unwrap_or(false);

        if is_default {
            sqlx::query("UPDATE addresses SET is_default = false WHERE user_id = $1 AND is_default")
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }

        let query = format!(
            "INSERT INTO addresses
                (user_id, full_name, line1, line2, city, state, postal_code, country, phone, is_default)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {COLUMNS}"
        );
        let address = sqlx::query_as::<_, Address>(&query)
            .bind(user_id)
            .bind(&input.full_name)
            .bind(&input.line1)
            .bind(&input.line2)
            .bind(&input.city)
            .bind(&input.state)
            .bind(&input.postal_code)
            .bind(&input.country)
            .bind(&input.phone)
            .bind(is_default)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(address)
    }

    /// List a user's addresses, default first.
    pub async fn list_for_user(pool: &PgPool, user_id: DbId) -> Result<Vec<Address>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM addresses WHERE user_id = $1
             ORDER BY is_default DESC, created_at DESC, id DESC"
        );
        sqlx::query_as::<_, Address>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    pub async fn find_for_user(
        pool: &PgPool,
        id: DbId,
        user_id: DbId,
    ) -> Result<Option<Address>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM addresses WHERE id = $1 AND user_id = $2");
        sqlx::query_as::<_, Address>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// The user's default address, if any.
    pub async fn find_default(pool: &PgPool, user_id: DbId) -> Result<Option<Address>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM addresses WHERE user_id = $1 AND is_default");
        sqlx::query_as::<_, Address>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn update(
        pool: &PgPool,
        id: DbId,
        user_id: DbId,
        input: &UpdateAddress,
    ) -> Result<Option<Address>, sqlx::Error> {
        let query = format!(
            "UPDATE addresses SET
                full_name = COALESCE($3, full_name),
                line1 = COALESCE($4, line1),
                line2 = COALESCE($5, line2),
                city = COALESCE($6, city),
                state = COALESCE($7, state),
                postal_code = COALESCE($8, postal_code),
                country = COALESCE($9, country),
                phone = COALESCE($10, phone)
             WHERE id = $1 AND user_id = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Address>(&query)
            .bind(id)
            .bind(user_id)
            .bind(&input.full_name)
            .bind(&input.line1)
            .bind(&input.line2)
            .bind(&input.city)
            .bind(&input.state)
            .bind(&input.postal_code)
            .bind(&input.country)
            .bind(&input.phone)
            .fetch_optional(pool)
            .await
    }

    /// Delete an address. When it was the default, the most recent remaining
    /// address is promoted.
    pub async fn delete(pool: &PgPool, id: DbId, user_id: DbId) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let deleted: Option<bool> = sqlx::query_scalar(
            "DELETE FROM addresses WHERE id = $1 AND user_id = $2 RETURNING is_default",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(was_default) = deleted else {
            return Ok(false);
        };

        if was_default {
            sqlx::query(
                "UPDATE addresses SET is_default = true
                 WHERE id = (
                     SELECT id FROM addresses WHERE user_id = $1
                     ORDER BY created_at DESC, id DESC LIMIT 1
                 )",
            )
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    /// Make `id` the user's only default address.
    pub async fn set_default(
        pool: &PgPool,
        id: DbId,
        user_id: DbId,
    ) -> Result<Option<Address>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("UPDATE addresses SET is_default = false WHERE user_id = $1 AND id <> $2 AND is_default")
            .bind(user_id)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let query = format!(
            "UPDATE addresses SET is_default = true
             WHERE id = $1 AND user_id = $2
             RETURNING {COLUMNS}"
        );
        let address = sqlx::query_as::<_, Address>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;

        // Unknown id: roll back so the previous default survives.
        if address.is_none() {
            return Ok(None);
        }

        tx.commit().await?;
        Ok(address)
    }
}

//! Repository for the `user_tokens` table.

use sqlx::PgPool;
use vitashop_core::types::DbId;

use crate::models::user_token::{CreateUserToken, PasswordReset, TokenKind, UserToken};
use crate::repositories::{SessionRepo, UserRepo};

const COLUMNS: &str = "id, user_id, kind, token_hash, expires_at, consumed_at, \
                       created_at, updated_at";

/// Issues and consumes one-time tokens.
pub struct UserTokenRepo;

impl UserTokenRepo {
    /// Store a new token, invalidating earlier unconsumed tokens of the same
    /// kind for the user.
    pub async fn create(pool: &PgPool, input: &CreateUserToken) -> Result<UserToken, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            "UPDATE user_tokens SET consumed_at = NOW()
             WHERE user_id = $1 AND kind = $2 AND consumed_at IS NULL",
        )
        .bind(input.user_id)
        .bind(input.kind.as_str())
        .execute(&mut *tx)
        .await?;

        let query = format!(
            "INSERT INTO user_tokens (user_id, kind, token_hash, expires_at)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        let token = sqlx::query_as::<_, UserToken>(&query)
            .bind(input.user_id)
            .bind(input.kind.as_str())
            .bind(&input.token_hash)
            .bind(input.expires_at)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(token)
    }

    /// Atomically consume an unexpired, unconsumed token.
    ///
    /// Returns `None` when the hash is unknown, already used, expired, or of
    /// a different kind.
    pub async fn consume(
        pool: &PgPool,
        kind: TokenKind,
        token_hash: &str,
    ) -> Result<Option<UserToken>, sqlx::Error> {
        let query = format!(
            "UPDATE user_tokens SET consumed_at = NOW()
             WHERE token_hash = $1
               AND kind = $2
               AND consumed_at IS NULL
               AND expires_at > NOW()
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserToken>(&query)
            .bind(token_hash)
            .bind(kind.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Redeem a password reset token in one transaction.
    ///
    /// Consumes the token, stores the new hash, clears the lockout, marks the
    /// email verified and revokes every session. Returns `None` (and changes
    /// nothing) when the token is not redeemable.
    pub async fn redeem_password_reset(
        pool: &PgPool,
        token_hash: &str,
        password_hash: &str,
    ) -> Result<Option<PasswordReset>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let user_id: Option<DbId> = sqlx::query_scalar(
            "UPDATE user_tokens SET consumed_at = NOW()
             WHERE token_hash = $1
               AND kind = $2
               AND consumed_at IS NULL
               AND expires_at > NOW()
             RETURNING user_id",
        )
        .bind(token_hash)
        .bind(TokenKind::PasswordReset.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(user_id) = user_id else {
            return Ok(None);
        };

        UserRepo::update_password(&mut *tx, user_id, password_hash).await?;
        UserRepo::mark_email_verified(&mut *tx, user_id).await?;
        let sessions_revoked = SessionRepo::revoke_all_for_user(&mut *tx, user_id).await?;

        tx.commit().await?;
        Ok(Some(PasswordReset {
            user_id,
            sessions_revoked,
        }))
    }

    /// Delete expired or consumed tokens. Returns the count of deleted rows.
    pub async fn cleanup_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM user_tokens WHERE expires_at < NOW() OR consumed_at IS NOT NULL",
        )
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}

//! One-time tokens for email verification and password reset.

use sqlx::FromRow;
use vitashop_core::types::{DbId, Timestamp};

/// Purpose of a one-time token. Stored in `user_tokens.kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    EmailVerification,
    PasswordReset,
}

impl TokenKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EmailVerification => "email_verification",
            Self::PasswordReset => "password_reset",
        }
    }
}

/// A row from the `user_tokens` table. Only the SHA-256 hash is stored.
#[derive(Debug, Clone, FromRow)]
pub struct UserToken {
    pub id: DbId,
    pub user_id: DbId,
    pub kind: String,
    pub token_hash: String,
    pub expires_at: Timestamp,
    pub consumed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

pub struct CreateUserToken {
    pub user_id: DbId,
    pub kind: TokenKind,
    pub token_hash: String,
    pub expires_at: Timestamp,
}

/// Result of redeeming a password reset token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordReset {
    pub user_id: DbId,
    pub sessions_revoked: u64,
}

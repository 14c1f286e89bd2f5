//! Integration tests for redeeming password reset tokens.

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use sqlx::PgPool;
use vitashop_core::roles::ROLE_CUSTOMER;
use vitashop_db::models::session::CreateSession;
use vitashop_db::models::user::{CreateUser, User};
use vitashop_db::models::user_token::{CreateUserToken, PasswordReset, TokenKind};
use vitashop_db::repositories::{RoleRepo, SessionRepo, UserRepo, UserTokenRepo};

async fn locked_customer(pool: &PgPool) -> User {
    let role = RoleRepo::find_by_name(pool, ROLE_CUSTOMER)
        .await
        .unwrap()
        .expect("customer role is seeded");
    let user = UserRepo::create(
        pool,
        &CreateUser {
            email: "reset@example.com".to_string(),
            password_hash: "old-hash".to_string(),
            first_name: None,
            last_name: None,
            role_id: role.id,
        },
    )
    .await
    .unwrap();
    UserRepo::increment_failed_login(pool, user.id).await.unwrap();
    UserRepo::lock_account(pool, user.id, Utc::now() + Duration::minutes(15))
        .await
        .unwrap();
    user
}

async fn issue(pool: &PgPool, user_id: i64, kind: TokenKind, hash: &str) {
    UserTokenRepo::create(
        pool,
        &CreateUserToken {
            user_id,
            kind,
            token_hash: hash.to_string(),
            expires_at: Utc::now() + Duration::hours(1),
        },
    )
    .await
    .unwrap();
}

async fn session(pool: &PgPool, user_id: i64, hash: &str) {
    SessionRepo::create(
        pool,
        &CreateSession {
            user_id,
            refresh_token_hash: hash.to_string(),
            expires_at: Utc::now() + Duration::days(7),
            user_agent: None,
            ip_address: None,
        },
    )
    .await
    .unwrap();
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn redeeming_applies_every_change_together(pool: PgPool) {
    let user = locked_customer(&pool).await;
    issue(&pool, user.id, TokenKind::PasswordReset, "reset-hash").await;
    session(&pool, user.id, "laptop").await;
    session(&pool, user.id, "phone").await;

    let reset = UserTokenRepo::redeem_password_reset(&pool, "reset-hash", "new-hash")
        .await
        .unwrap();
    assert_eq!(
        reset,
        Some(PasswordReset {
            user_id: user.id,
            sessions_revoked: 2,
        })
    );

    let user = UserRepo::find_by_id(&pool, user.id).await.unwrap().unwrap();
    assert_eq!(user.password_hash, "new-hash");
    assert!(user.email_verified_at.is_some());
    assert_eq!(user.failed_login_count, 0);
    assert!(user.locked_until.is_none());

    let live = SessionRepo::find_by_refresh_token_hash(&pool, "phone")
        .await
        .unwrap();
    assert!(live.is_none());

    // Single use.
    let again = UserTokenRepo::redeem_password_reset(&pool, "reset-hash", "other-hash")
        .await
        .unwrap();
    assert_matches!(again, None);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unredeemable_token_changes_nothing(pool: PgPool) {
    let user = locked_customer(&pool).await;
    issue(&pool, user.id, TokenKind::EmailVerification, "verify-hash").await;
    session(&pool, user.id, "laptop").await;

    for hash in ["unknown-hash", "verify-hash"] {
        let reset = UserTokenRepo::redeem_password_reset(&pool, hash, "new-hash")
            .await
            .unwrap();
        assert_matches!(reset, None);
    }

    let user = UserRepo::find_by_id(&pool, user.id).await.unwrap().unwrap();
    assert_eq!(user.password_hash, "old-hash");
    assert!(user.email_verified_at.is_none());
    assert!(user.locked_until.is_some());
    let live = SessionRepo::find_by_refresh_token_hash(&pool, "laptop")
        .await
        .unwrap();
    assert!(live.is_some());

    // A verification token is not spent by a reset attempt.
    let consumed = UserTokenRepo::consume(&pool, TokenKind::EmailVerification, "verify-hash")
        .await
        .unwrap();
    assert!(consumed.is_some());
}

//! HTTP-level integration tests for registration, email verification,
//! login, token refresh, and password reset.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, build_test_app, build_test_app_with_state, create_admin, create_customer,
    create_user, get, get_auth, login, post_json, post_json_auth, put_json_auth, TEST_PASSWORD,
};
use serde_json::json;
use sqlx::PgPool;
use vitashop_core::roles::ROLE_CUSTOMER;
use vitashop_db::repositories::UserRepo;
use vitashop_events::event_types;

// ---------------------------------------------------------------------------
// Registration and verification
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn register_creates_unverified_customer_and_emits_token(pool: PgPool) {
    let (app, state) = build_test_app_with_state(pool.clone());
    let mut events = state.event_bus.subscribe();

    let response = post_json(
        app.clone(),
        "/api/auth/register",
        json!({ "email": "New@Example.com", "password": TEST_PASSWORD, "first_name": "Nia" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["user"]["email"], "new@example.com");
    assert_eq!(json["user"]["role"], "customer");
    assert_eq!(json["user"]["email_verified"], false);

    let event = events.try_recv().expect("registration publishes an event");
    assert_eq!(event.event_type, event_types::USER_REGISTERED);
    let token = event.payload["token"].as_str().unwrap().to_string();

    // Unverified accounts cannot log in yet.
    let response = login(app.clone(), "new@example.com", TEST_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_json(app.clone(), "/api/auth/verify-email", json!({ "token": token })).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = login(app.clone(), "new@example.com", TEST_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::OK);

    // Tokens are single use.
    let response = post_json(app, "/api/auth/verify-email", json!({ "token": token })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn register_rejects_duplicates_and_weak_input(pool: PgPool) {
    create_customer(&pool, "taken@example.com").await;
    let app = build_test_app(pool);

    let response = post_json(
        app.clone(),
        "/api/auth/register",
        json!({ "email": "TAKEN@example.com", "password": TEST_PASSWORD }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = post_json(
        app.clone(),
        "/api/auth/register",
        json!({ "email": "short@example.com", "password": "abc1" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json(
        app,
        "/api/auth/register",
        json!({ "email": "not-an-email", "password": TEST_PASSWORD }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn resend_verification_never_reveals_accounts(pool: PgPool) {
    create_user(&pool, "pending@example.com", ROLE_CUSTOMER, false).await;
    let (app, state) = build_test_app_with_state(pool);
    let mut events = state.event_bus.subscribe();

    let response = post_json(
        app.clone(),
        "/api/auth/resend-verification",
        json!({ "email": "ghost@example.com" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert!(events.try_recv().is_err());

    let response = post_json(
        app,
        "/api/auth/resend-verification",
        json!({ "email": "pending@example.com" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let event = events.try_recv().unwrap();
    assert_eq!(event.event_type, event_types::USER_VERIFICATION_REQUESTED);
}

// ---------------------------------------------------------------------------
// Login, refresh, logout
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn login_returns_tokens_and_profile(pool: PgPool) {
    let user = create_customer(&pool, "ann@example.com").await;
    let app = build_test_app(pool);

    let response = login(app.clone(), "ann@example.com", TEST_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["access_token"].is_string());
    assert!(json["refresh_token"].is_string());
    assert_eq!(json["expires_in"], 900);
    assert_eq!(json["user"]["id"], user.id);

    let token = json["access_token"].as_str().unwrap();
    let response = get_auth(app, "/api/auth/me", token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["email"], "ann@example.com");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn login_with_bad_credentials_is_unauthorized(pool: PgPool) {
    create_customer(&pool, "ann@example.com").await;
    let app = build_test_app(pool);

    let response = login(app.clone(), "ann@example.com", "wrong-password-1").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = login(app, "nobody@example.com", TEST_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn deactivated_account_is_forbidden(pool: PgPool) {
    let user = create_customer(&pool, "gone@example.com").await;
    UserRepo::deactivate(&pool, user.id).await.unwrap();
    let app = build_test_app(pool);

    let response = login(app, "gone@example.com", TEST_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn account_locks_after_five_failures(pool: PgPool) {
    create_customer(&pool, "lock@example.com").await;
    let app = build_test_app(pool);

    for _ in 0..5 {
        let response = login(app.clone(), "lock@example.com", "wrong-password-1").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    // Even the right password is refused while locked.
    let response = login(app, "lock@example.com", TEST_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn refresh_rotates_tokens(pool: PgPool) {
    create_customer(&pool, "rot@example.com").await;
    let app = build_test_app(pool);

    let json = body_json(login(app.clone(), "rot@example.com", TEST_PASSWORD).await).await;
    let refresh_token = json["refresh_token"].as_str().unwrap().to_string();

    let response = post_json(
        app.clone(),
        "/api/auth/refresh",
        json!({ "refresh_token": refresh_token }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let rotated = body_json(response).await;
    assert_ne!(rotated["refresh_token"], refresh_token.as_str());

    // The old refresh token was consumed by the rotation.
    let response = post_json(
        app,
        "/api/auth/refresh",
        json!({ "refresh_token": refresh_token }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn logout_revokes_refresh_tokens(pool: PgPool) {
    create_customer(&pool, "out@example.com").await;
    let app = build_test_app(pool);

    let json = body_json(login(app.clone(), "out@example.com", TEST_PASSWORD).await).await;
    let access = json["access_token"].as_str().unwrap().to_string();
    let refresh = json["refresh_token"].as_str().unwrap().to_string();

    let response = post_json_auth(app.clone(), "/api/auth/logout", json!({}), &access).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = post_json(app, "/api/auth/refresh", json!({ "refresh_token": refresh })).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn protected_routes_require_a_valid_token(pool: PgPool) {
    let app = build_test_app(pool);

    let response = get(app.clone(), "/api/auth/me").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = get_auth(app, "/api/auth/me", "not-a-jwt").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ---------------------------------------------------------------------------
// Password reset
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn password_reset_flow(pool: PgPool) {
    create_customer(&pool, "forgot@example.com").await;
    let (app, state) = build_test_app_with_state(pool);
    let mut events = state.event_bus.subscribe();

    let response = post_json(
        app.clone(),
        "/api/auth/forgot-password",
        json!({ "email": "forgot@example.com" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let event = events.try_recv().unwrap();
    assert_eq!(event.event_type, event_types::USER_PASSWORD_RESET_REQUESTED);
    let token = event.payload["token"].as_str().unwrap().to_string();

    let response = post_json(
        app.clone(),
        "/api/auth/reset-password",
        json!({ "token": token, "password": "brand-new-pass9" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = login(app.clone(), "forgot@example.com", TEST_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let response = login(app, "forgot@example.com", "brand-new-pass9").await;
    assert_eq!(response.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Profile and admin listing
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn users_update_their_profile(pool: PgPool) {
    let (_user, token) = common::customer_token(&pool, "me@example.com").await;
    let app = build_test_app(pool);

    let response = put_json_auth(
        app,
        "/api/users/me",
        json!({ "first_name": " Maya ", "last_name": "Lopez" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["first_name"], "Maya");
    assert_eq!(json["data"]["last_name"], "Lopez");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn admin_user_listing_requires_admin(pool: PgPool) {
    let (_customer, customer_token) = common::customer_token(&pool, "c@example.com").await;
    create_admin(&pool, "boss@example.com").await;
    let app = build_test_app(pool.clone());

    let response = get_auth(app.clone(), "/api/admin/users", &customer_token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let json = body_json(login(app.clone(), "boss@example.com", TEST_PASSWORD).await).await;
    let admin_token = json["access_token"].as_str().unwrap();

    let response = get_auth(app, "/api/admin/users?limit=1", admin_token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
    assert_eq!(json["meta"]["total"], 2);
    assert_eq!(json["meta"]["total_pages"], 2);
}

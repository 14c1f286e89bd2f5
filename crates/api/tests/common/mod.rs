#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use vitashop_api::auth::jwt::{generate_access_token, JwtConfig};
use vitashop_api::auth::password::hash_password;
use vitashop_api::config::ServerConfig;
use vitashop_api::integrations::payments::{
    CheckoutRequest, CheckoutSession, PaymentConfig, PaymentError, PaymentProvider,
};
use vitashop_api::integrations::storage::{
    ObjectStore, StorageBackend, StorageConfig, StorageError,
};
use vitashop_api::router::build_app_router;
use vitashop_api::state::AppState;
use vitashop_core::roles::{ROLE_ADMIN, ROLE_CUSTOMER};
use vitashop_db::models::product::{CreateProduct, Product};
use vitashop_db::models::user::{CreateUser, User};
use vitashop_db::repositories::{ProductRepo, RoleRepo, UserRepo};
use vitashop_events::EventBus;

pub const TEST_PASSWORD: &str = "vitamins4all";
pub const WEBHOOK_SECRET: &str = "whsec_test_secret";

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// Payment provider that opens a predictable session per order.
pub struct FakePayments;

#[async_trait]
impl PaymentProvider for FakePayments {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        Ok(CheckoutSession {
            id: checkout_session_id(request.order_id),
            url: format!("https://checkout.test/pay/{}", request.order_id),
        })
    }
}

pub fn checkout_session_id(order_id: i64) -> String {
    format!("cs_test_{order_id}")
}

/// In-memory object store.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> Result<(), StorageError> {
        self.objects.lock().unwrap().insert(key.to_string(), bytes);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        match self.objects.lock().unwrap().remove(key) {
            Some(_) => Ok(()),
            None => Err(StorageError::NotFound(key.to_string())),
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!("https://cdn.test/{key}")
    }
}

// ---------------------------------------------------------------------------
// App construction
// ---------------------------------------------------------------------------

/// Test `ServerConfig` with payments configured against the fake provider
/// and no language model.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        public_url: "http://localhost:5173".to_string(),
        require_email_verification: true,
        password_min_length: 8,
        token_cleanup_interval_secs: 3600,
        jwt: JwtConfig {
            secret: "test-jwt-secret-that-is-long-enough".to_string(),
            access_token_expiry_mins: 15,
            refresh_token_expiry_days: 7,
        },
        payment: PaymentConfig {
            secret_key: Some("sk_test".to_string()),
            webhook_secret: Some(WEBHOOK_SECRET.to_string()),
            api_url: "http://127.0.0.1:9".to_string(),
            currency: "usd".to_string(),
            success_url: "http://localhost:5173/checkout/success".to_string(),
            cancel_url: "http://localhost:5173/checkout/cancel".to_string(),
            timeout_secs: 5,
        },
        llm: None,
        storage: StorageConfig {
            backend: StorageBackend::S3,
            local_path: std::env::temp_dir().join("vitashop-test-uploads"),
            s3_bucket: Some("test-bucket".to_string()),
            s3_region: "us-east-1".to_string(),
            s3_endpoint: None,
            public_url: None,
            max_upload_bytes: 1024 * 1024,
        },
    }
}

pub fn test_state(pool: PgPool) -> AppState {
    AppState {
        pool,
        config: Arc::new(test_config()),
        event_bus: Arc::new(EventBus::default()),
        payments: Arc::new(FakePayments),
        chat_model: None,
        object_store: Arc::new(MemoryObjectStore::default()),
    }
}

/// Build the full application router, as `main.rs` does, over fakes.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with_state(pool).0
}

/// Like [`build_test_app`] but also returns the state so tests can
/// subscribe to the event bus.
pub fn build_test_app_with_state(pool: PgPool) -> (Router, AppState) {
    let state = test_state(pool);
    let router = build_app_router(state.clone(), &test_config());
    (router, state)
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

pub async fn send(app: Router, request: Request<Body>) -> Response {
    app.oneshot(request).await.unwrap()
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<serde_json::Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(json) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn get(app: Router, uri: &str) -> Response {
    send(app, request(Method::GET, uri, None, None)).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, request(Method::GET, uri, Some(token), None)).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    send(app, request(Method::POST, uri, None, Some(body))).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response {
    send(app, request(Method::POST, uri, Some(token), Some(body))).await
}

pub async fn put_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response {
    send(app, request(Method::PUT, uri, Some(token), Some(body))).await
}

pub async fn patch_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response {
    send(app, request(Method::PATCH, uri, Some(token), Some(body))).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, request(Method::DELETE, uri, Some(token), None)).await
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Insert a user with [`TEST_PASSWORD`] directly in the database.
pub async fn create_user(pool: &PgPool, email: &str, role: &str, verified: bool) -> User {
    let role = RoleRepo::find_by_name(pool, role)
        .await
        .unwrap()
        .expect("role is seeded");
    let user = UserRepo::create(
        pool,
        &CreateUser {
            email: email.to_string(),
            password_hash: hash_password(TEST_PASSWORD).unwrap(),
            first_name: Some("Test".to_string()),
            last_name: None,
            role_id: role.id,
        },
    )
    .await
    .unwrap();
    if verified {
        UserRepo::mark_email_verified(pool, user.id).await.unwrap();
    }
    user
}

/// A verified customer.
pub async fn create_customer(pool: &PgPool, email: &str) -> User {
    create_user(pool, email, ROLE_CUSTOMER, true).await
}

/// A verified admin.
pub async fn create_admin(pool: &PgPool, email: &str) -> User {
    create_user(pool, email, ROLE_ADMIN, true).await
}

/// Mint an access token without going through `/auth/login`.
pub fn token_for(user: &User, role: &str) -> String {
    generate_access_token(user.id, role, &test_config().jwt).unwrap()
}

pub async fn customer_token(pool: &PgPool, email: &str) -> (User, String) {
    let user = create_customer(pool, email).await;
    let token = token_for(&user, ROLE_CUSTOMER);
    (user, token)
}

pub async fn admin_token(pool: &PgPool, email: &str) -> (User, String) {
    let user = create_admin(pool, email).await;
    let token = token_for(&user, ROLE_ADMIN);
    (user, token)
}

/// Log in through the API and return the full JSON response.
pub async fn login(app: Router, email: &str, password: &str) -> Response {
    post_json(
        app,
        "/api/auth/login",
        serde_json::json!({ "email": email, "password": password }),
    )
    .await
}

pub async fn create_product(
    pool: &PgPool,
    slug: &str,
    price_cents: i64,
    stock: i32,
    tags: &[&str],
) -> Product {
    ProductRepo::create(
        pool,
        &CreateProduct {
            category_id: None,
            name: slug.replace('-', " "),
            slug: slug.to_string(),
            description: None,
            price_cents,
            stock,
            image_url: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            is_active: None,
        },
    )
    .await
    .unwrap()
}

pub async fn stock_of(pool: &PgPool, product_id: i64) -> i32 {
    ProductRepo::find_by_id(pool, product_id)
        .await
        .unwrap()
        .unwrap()
        .stock
}

//! Integration tests for admin image uploads against the in-memory store.

mod common;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use common::{admin_token, body_json, build_test_app, customer_token, delete_auth, send};
use sqlx::PgPool;

const BOUNDARY: &str = "vitashop-test-boundary";

/// A 1x1 transparent PNG.
const PNG_1X1: &[u8] = &[
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1f,
    0x15, 0xc4, 0x89, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x44, 0x41, 0x54, 0x78, 0xda, 0x63, 0x64,
    0x60, 0xf8, 0x5f, 0x0f, 0x00, 0x02, 0x87, 0x01, 0x80, 0xeb, 0x47, 0xba, 0x92, 0x00, 0x00,
    0x00, 0x00, 0x49, 0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
];

/// Encode a multipart body with one file part and an optional folder part.
fn multipart_body(filename: &str, content_type: &str, bytes: &[u8], folder: Option<&str>) -> Vec<u8> {
    let mut body = Vec::new();
    if let Some(folder) = folder {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"folder\"\r\n\r\n{folder}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

async fn upload(app: Router, token: &str, body: Vec<u8>) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/storage/upload")
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .header(CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap();
    send(app, request).await
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn admin_uploads_and_deletes_an_image(pool: PgPool) {
    let (_admin, token) = admin_token(&pool, "admin@example.com").await;
    let app = build_test_app(pool);

    let body = multipart_body("pixel.png", "image/png", PNG_1X1, Some("Products/Hero"));
    let response = upload(app.clone(), &token, body).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    let key = json["key"].as_str().unwrap().to_string();
    assert!(key.starts_with("products/hero/"), "{key}");
    assert!(key.ends_with(".png"));
    assert_eq!(json["url"], format!("https://cdn.test/{key}"));
    assert_eq!(json["content_type"], "image/png");
    assert_eq!(json["size_bytes"], PNG_1X1.len());
    assert_eq!(json["width"], 1);
    assert_eq!(json["height"], 1);

    let response = delete_auth(app.clone(), &format!("/api/storage/{key}"), &token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // Gone now.
    let response = delete_auth(app, &format!("/api/storage/{key}"), &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn content_type_is_guessed_from_filename(pool: PgPool) {
    let (_admin, token) = admin_token(&pool, "admin@example.com").await;
    let app = build_test_app(pool);

    let body = multipart_body("pixel.PNG", "application/octet-stream", PNG_1X1, None);
    let response = upload(app, &token, body).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["content_type"], "image/png");
    assert!(json["key"].as_str().unwrap().starts_with("uploads/"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn customers_cannot_upload(pool: PgPool) {
    let (_user, token) = customer_token(&pool, "c@example.com").await;
    let app = build_test_app(pool);

    let body = multipart_body("pixel.png", "image/png", PNG_1X1, None);
    let response = upload(app, &token, body).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn invalid_uploads_are_rejected(pool: PgPool) {
    let (_admin, token) = admin_token(&pool, "admin@example.com").await;
    let app = build_test_app(pool);

    let body = multipart_body("notes.pdf", "application/pdf", b"%PDF-1.4", None);
    let response = upload(app.clone(), &token, body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Declared PNG, but the bytes are not an image.
    let body = multipart_body("fake.png", "image/png", b"definitely not a png", None);
    let response = upload(app.clone(), &token, body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = multipart_body("pixel.png", "image/png", PNG_1X1, Some("../etc"));
    let response = upload(app.clone(), &token, body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = delete_auth(app, "/api/storage/../secrets.png", &token).await;
    assert_ne!(response.status(), StatusCode::NO_CONTENT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn oversized_uploads_are_rejected(pool: PgPool) {
    let (_admin, token) = admin_token(&pool, "admin@example.com").await;
    let app = build_test_app(pool);

    // Just over the 1 MiB test limit but under the multipart allowance.
    let mut bytes = PNG_1X1.to_vec();
    bytes.resize(1024 * 1024 + 1, 0);
    let body = multipart_body("big.png", "image/png", &bytes, None);
    let response = upload(app, &token, body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

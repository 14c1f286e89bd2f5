//! Integration tests for the cart, addresses, and order lifecycle.

mod common;

use axum::http::StatusCode;
use common::{
    admin_token, body_json, build_test_app, create_product, customer_token, delete_auth, get_auth,
    patch_json_auth, post_json_auth, put_json_auth, stock_of,
};
use serde_json::json;
use sqlx::PgPool;

fn address_body() -> serde_json::Value {
    json!({
        "full_name": "Ada Park",
        "line1": "12 Orchard Lane",
        "city": "Portland",
        "state": "OR",
        "postal_code": "97201",
        "country": "us",
    })
}

// ---------------------------------------------------------------------------
// Cart
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn cart_accumulates_and_totals(pool: PgPool) {
    let zinc = create_product(&pool, "zinc", 500, 10, &[]).await;
    let iron = create_product(&pool, "iron", 750, 10, &[]).await;
    let (_user, token) = customer_token(&pool, "c@example.com").await;
    let app = build_test_app(pool);

    for body in [
        json!({ "product_id": zinc.id, "quantity": 2 }),
        json!({ "product_id": zinc.id, "quantity": 1 }),
        json!({ "product_id": iron.id, "quantity": 1 }),
    ] {
        let response = post_json_auth(app.clone(), "/api/cart/items", body, &token).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let json = body_json(get_auth(app.clone(), "/api/cart", &token).await).await;
    assert_eq!(json["items"].as_array().unwrap().len(), 2);
    assert_eq!(json["total_cents"], 3 * 500 + 750);

    let response = put_json_auth(
        app.clone(),
        &format!("/api/cart/items/{}", zinc.id),
        json!({ "quantity": 1 }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["total_cents"], 500 + 750);

    let response = delete_auth(app.clone(), &format!("/api/cart/items/{}", iron.id), &token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = delete_auth(app, &format!("/api/cart/items/{}", iron.id), &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn cart_rejects_more_than_stock(pool: PgPool) {
    let product = create_product(&pool, "rare-herb", 3000, 2, &[]).await;
    let (_user, token) = customer_token(&pool, "c@example.com").await;
    let app = build_test_app(pool);

    let response = post_json_auth(
        app.clone(),
        "/api/cart/items",
        json!({ "product_id": product.id, "quantity": 2 }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = post_json_auth(
        app.clone(),
        "/api/cart/items",
        json!({ "product_id": product.id, "quantity": 1 }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = post_json_auth(
        app,
        "/api/cart/items",
        json!({ "product_id": product.id, "quantity": 0 }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Addresses
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn address_book_keeps_a_single_default(pool: PgPool) {
    let (_user, token) = customer_token(&pool, "c@example.com").await;
    let (_other, other_token) = customer_token(&pool, "o@example.com").await;
    let app = build_test_app(pool);

    let home = body_json(post_json_auth(app.clone(), "/api/addresses", address_body(), &token).await)
        .await["data"]
        .clone();
    let mut work_body = address_body();
    work_body["line1"] = json!("1 Market St");
    let response = post_json_auth(app.clone(), "/api/addresses", work_body, &token).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let work = body_json(response).await["data"].clone();
    assert_eq!(work["is_default"], false);

    let response = post_json_auth(
        app.clone(),
        &format!("/api/addresses/{}/default", work["id"]),
        json!({}),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let list = body_json(get_auth(app.clone(), "/api/addresses", &token).await).await;
    let list = list["data"].as_array().unwrap().clone();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["id"], work["id"]);
    assert_eq!(list[1]["is_default"], false);

    let response = put_json_auth(
        app.clone(),
        &format!("/api/addresses/{}", home["id"]),
        json!({ "city": "Salem" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["city"], "Salem");

    // Addresses are private to their owner.
    let response = put_json_auth(
        app.clone(),
        &format!("/api/addresses/{}", home["id"]),
        json!({ "city": "Elsewhere" }),
        &other_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Removing the default promotes the remaining address.
    let uri = format!("/api/addresses/{}", work["id"]);
    let response = delete_auth(app.clone(), &uri, &token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = delete_auth(app.clone(), &uri, &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let list = body_json(get_auth(app, "/api/addresses", &token).await).await;
    assert_eq!(list["data"].as_array().unwrap().len(), 1);
    assert_eq!(list["data"][0]["id"], home["id"]);
    assert_eq!(list["data"][0]["is_default"], true);
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn order_from_cart_reserves_stock_and_clears_cart(pool: PgPool) {
    let product = create_product(&pool, "b-complex", 1250, 5, &[]).await;
    let (_user, token) = customer_token(&pool, "c@example.com").await;
    let app = build_test_app(pool.clone());

    let response = post_json_auth(app.clone(), "/api/addresses", address_body(), &token).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["data"]["is_default"], true);

    post_json_auth(
        app.clone(),
        "/api/cart/items",
        json!({ "product_id": product.id, "quantity": 3 }),
        &token,
    )
    .await;

    let response = post_json_auth(app.clone(), "/api/orders", json!({}), &token).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "pending");
    assert_eq!(json["data"]["total_cents"], 3 * 1250);
    assert_eq!(json["data"]["currency"], "usd");
    assert_eq!(json["data"]["items"][0]["quantity"], 3);
    assert_eq!(json["data"]["shipping_address"]["country"], "US");

    assert_eq!(stock_of(&pool, product.id).await, 2);
    let cart = body_json(get_auth(app.clone(), "/api/cart", &token).await).await;
    assert!(cart["items"].as_array().unwrap().is_empty());

    let json = body_json(get_auth(app, "/api/orders", &token).await).await;
    assert_eq!(json["meta"]["total"], 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn ordering_an_empty_cart_is_rejected(pool: PgPool) {
    let (_user, token) = customer_token(&pool, "c@example.com").await;
    let app = build_test_app(pool);

    let response = post_json_auth(app, "/api/orders", json!({}), &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Cart is empty");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn direct_order_beyond_stock_conflicts_without_side_effects(pool: PgPool) {
    let plenty = create_product(&pool, "plenty", 100, 50, &[]).await;
    let scarce = create_product(&pool, "scarce", 100, 1, &[]).await;
    let (_user, token) = customer_token(&pool, "c@example.com").await;
    let app = build_test_app(pool.clone());

    let response = post_json_auth(
        app,
        "/api/orders",
        json!({ "items": [
            { "product_id": plenty.id, "quantity": 5 },
            { "product_id": scarce.id, "quantity": 2 },
        ] }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // The whole placement rolled back.
    assert_eq!(stock_of(&pool, plenty.id).await, 50);
    assert_eq!(stock_of(&pool, scarce.id).await, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn concurrent_orders_cannot_oversell(pool: PgPool) {
    let product = create_product(&pool, "last-bottle", 2500, 1, &[]).await;
    let (_a, token_a) = customer_token(&pool, "a@example.com").await;
    let (_b, token_b) = customer_token(&pool, "b@example.com").await;
    let app = build_test_app(pool.clone());

    let body = json!({ "items": [{ "product_id": product.id, "quantity": 1 }] });
    let (first, second) = tokio::join!(
        post_json_auth(app.clone(), "/api/orders", body.clone(), &token_a),
        post_json_auth(app.clone(), "/api/orders", body.clone(), &token_b),
    );

    let mut statuses = [first.status(), second.status()];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::CREATED, StatusCode::CONFLICT]);
    assert_eq!(stock_of(&pool, product.id).await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn cancelling_returns_stock(pool: PgPool) {
    let product = create_product(&pool, "probiotic", 2900, 4, &[]).await;
    let (_user, token) = customer_token(&pool, "c@example.com").await;
    let app = build_test_app(pool.clone());

    let json = body_json(
        post_json_auth(
            app.clone(),
            "/api/orders",
            json!({ "items": [{ "product_id": product.id, "quantity": 4 }] }),
            &token,
        )
        .await,
    )
    .await;
    let order_id = json["data"]["id"].as_i64().unwrap();
    assert_eq!(stock_of(&pool, product.id).await, 0);

    let response = post_json_auth(
        app.clone(),
        &format!("/api/orders/{order_id}/cancel"),
        json!({}),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status"], "cancelled");
    assert_eq!(stock_of(&pool, product.id).await, 4);

    // Already cancelled.
    let response =
        post_json_auth(app, &format!("/api/orders/{order_id}/cancel"), json!({}), &token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(stock_of(&pool, product.id).await, 4);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn orders_are_private_to_their_owner(pool: PgPool) {
    let product = create_product(&pool, "fish-oil", 1800, 10, &[]).await;
    let (_owner, owner_token) = customer_token(&pool, "owner@example.com").await;
    let (_other, other_token) = customer_token(&pool, "other@example.com").await;
    let (_admin, admin_token) = admin_token(&pool, "admin@example.com").await;
    let app = build_test_app(pool);

    let json = body_json(
        post_json_auth(
            app.clone(),
            "/api/orders",
            json!({ "items": [{ "product_id": product.id, "quantity": 1 }] }),
            &owner_token,
        )
        .await,
    )
    .await;
    let uri = format!("/api/orders/{}", json["data"]["id"]);

    let response = get_auth(app.clone(), &uri, &other_token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = post_json_auth(app.clone(), &format!("{uri}/cancel"), json!({}), &other_token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = get_auth(app, &uri, &admin_token).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn admin_moves_orders_through_the_lifecycle(pool: PgPool) {
    let product = create_product(&pool, "collagen", 3400, 10, &[]).await;
    let (_user, token) = customer_token(&pool, "c@example.com").await;
    let (_admin, admin) = admin_token(&pool, "admin@example.com").await;
    let app = build_test_app(pool.clone());

    let json = body_json(
        post_json_auth(
            app.clone(),
            "/api/orders",
            json!({ "items": [{ "product_id": product.id, "quantity": 2 }] }),
            &token,
        )
        .await,
    )
    .await;
    let order_id = json["data"]["id"].as_i64().unwrap();
    let status_uri = format!("/api/admin/orders/{order_id}/status");

    // Shipping an unpaid order skips the lifecycle.
    let response =
        patch_json_auth(app.clone(), &status_uri, json!({ "status": "shipped" }), &admin).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    for next in ["paid", "processing", "shipped", "delivered"] {
        let response =
            patch_json_auth(app.clone(), &status_uri, json!({ "status": next }), &admin).await;
        assert_eq!(response.status(), StatusCode::OK, "moving to {next}");
        assert_eq!(body_json(response).await["data"]["status"], next);
    }

    // Delivered is terminal, and customers cannot change it either.
    let response =
        patch_json_auth(app.clone(), &status_uri, json!({ "status": "cancelled" }), &admin).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let response =
        post_json_auth(app.clone(), &format!("/api/orders/{order_id}/cancel"), json!({}), &token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(stock_of(&pool, product.id).await, 8);

    let response =
        patch_json_auth(app.clone(), &status_uri, json!({ "status": "lost" }), &admin).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(get_auth(app.clone(), "/api/admin/orders?status=delivered", &admin).await).await;
    assert_eq!(json["meta"]["total"], 1);

    let response = patch_json_auth(app, &status_uri, json!({ "status": "paid" }), &token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_address_blocks_placement(pool: PgPool) {
    let product = create_product(&pool, "selenium", 600, 10, &[]).await;
    let (_user, token) = customer_token(&pool, "c@example.com").await;
    let app = build_test_app(pool.clone());

    let response = post_json_auth(
        app,
        "/api/orders",
        json!({ "items": [{ "product_id": product.id, "quantity": 1 }], "address_id": 424242 }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(stock_of(&pool, product.id).await, 10);
}

//! Integration tests for checkout sessions and processor webhooks.

mod common;

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use common::{
    body_json, build_test_app, build_test_app_with_state, checkout_session_id, create_product,
    customer_token, get_auth, post_json_auth, send, stock_of, WEBHOOK_SECRET,
};
use serde_json::json;
use sqlx::PgPool;
use vitashop_core::payments::{events, sign_webhook_payload, SIGNATURE_HEADER};
use vitashop_events::event_types;

async fn post_webhook(app: Router, payload: &serde_json::Value, signature: Option<String>) -> Response {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/api/payments/webhook")
        .header(CONTENT_TYPE, "application/json");
    if let Some(signature) = signature {
        builder = builder.header(SIGNATURE_HEADER, signature);
    }
    send(app, builder.body(Body::from(payload.to_string())).unwrap()).await
}

fn signed(payload: &serde_json::Value) -> Option<String> {
    Some(sign_webhook_payload(
        payload.to_string().as_bytes(),
        WEBHOOK_SECRET,
        chrono::Utc::now().timestamp(),
    ))
}

fn session_event(event_type: &str, session_id: &str, order_id: i64, paid: bool) -> serde_json::Value {
    json!({
        "id": format!("evt_{event_type}_{order_id}"),
        "type": event_type,
        "data": { "object": {
            "id": session_id,
            "payment_status": if paid { "paid" } else { "unpaid" },
            "client_reference_id": order_id.to_string(),
            "metadata": { "order_id": order_id.to_string() },
        } },
    })
}

/// Place a one-line order and open a checkout session for it.
async fn order_with_checkout(app: &Router, token: &str, product_id: i64, quantity: i32) -> i64 {
    let json = body_json(
        post_json_auth(
            app.clone(),
            "/api/orders",
            json!({ "items": [{ "product_id": product_id, "quantity": quantity }] }),
            token,
        )
        .await,
    )
    .await;
    let order_id = json["data"]["id"].as_i64().unwrap();

    let response = post_json_auth(
        app.clone(),
        &format!("/api/payments/checkout/{order_id}"),
        json!({}),
        token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    order_id
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn checkout_returns_a_session_for_pending_orders(pool: PgPool) {
    let product = create_product(&pool, "elderberry", 1400, 5, &[]).await;
    let (_user, token) = customer_token(&pool, "c@example.com").await;
    let (_other, other_token) = customer_token(&pool, "o@example.com").await;
    let app = build_test_app(pool);

    let json = body_json(
        post_json_auth(
            app.clone(),
            "/api/orders",
            json!({ "items": [{ "product_id": product.id, "quantity": 1 }] }),
            &token,
        )
        .await,
    )
    .await;
    let order_id = json["data"]["id"].as_i64().unwrap();
    let uri = format!("/api/payments/checkout/{order_id}");

    let response = post_json_auth(app.clone(), &uri, json!({}), &other_token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = post_json_auth(app.clone(), &uri, json!({}), &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["session_id"], checkout_session_id(order_id));
    assert_eq!(json["url"], format!("https://checkout.test/pay/{order_id}"));

    let order = body_json(get_auth(app, &format!("/api/orders/{order_id}"), &token).await).await;
    assert_eq!(order["data"]["checkout_session_id"], checkout_session_id(order_id));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn cancelled_orders_cannot_be_paid(pool: PgPool) {
    let product = create_product(&pool, "turmeric", 1600, 5, &[]).await;
    let (_user, token) = customer_token(&pool, "c@example.com").await;
    let app = build_test_app(pool);

    let json = body_json(
        post_json_auth(
            app.clone(),
            "/api/orders",
            json!({ "items": [{ "product_id": product.id, "quantity": 1 }] }),
            &token,
        )
        .await,
    )
    .await;
    let order_id = json["data"]["id"].as_i64().unwrap();
    post_json_auth(app.clone(), &format!("/api/orders/{order_id}/cancel"), json!({}), &token).await;

    let response = post_json_auth(
        app,
        &format!("/api/payments/checkout/{order_id}"),
        json!({}),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn completed_webhook_marks_order_paid_once(pool: PgPool) {
    let product = create_product(&pool, "coq10", 3200, 5, &[]).await;
    let (_user, token) = customer_token(&pool, "c@example.com").await;
    let (app, state) = build_test_app_with_state(pool);
    let mut bus = state.event_bus.subscribe();

    let order_id = order_with_checkout(&app, &token, product.id, 1).await;
    // Drain the order.created event.
    while bus.try_recv().is_ok() {}

    let payload = session_event(
        events::CHECKOUT_COMPLETED,
        &checkout_session_id(order_id),
        order_id,
        true,
    );
    let response = post_webhook(app.clone(), &payload, signed(&payload)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["received"], true);

    let order = body_json(get_auth(app.clone(), &format!("/api/orders/{order_id}"), &token).await).await;
    assert_eq!(order["data"]["status"], "paid");
    assert!(order["data"]["paid_at"].is_string());

    let event = bus.try_recv().unwrap();
    assert_eq!(event.event_type, event_types::ORDER_PAID);
    assert_eq!(event.payload["email"], "c@example.com");

    // Redelivery is acknowledged without a second transition.
    let response = post_webhook(app, &payload, signed(&payload)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(bus.try_recv().is_err());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unpaid_completion_leaves_order_pending(pool: PgPool) {
    let product = create_product(&pool, "spirulina", 1300, 5, &[]).await;
    let (_user, token) = customer_token(&pool, "c@example.com").await;
    let app = build_test_app(pool);

    let order_id = order_with_checkout(&app, &token, product.id, 1).await;
    let payload = session_event(
        events::CHECKOUT_COMPLETED,
        &checkout_session_id(order_id),
        order_id,
        false,
    );
    let response = post_webhook(app.clone(), &payload, signed(&payload)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let order = body_json(get_auth(app.clone(), &format!("/api/orders/{order_id}"), &token).await).await;
    assert_eq!(order["data"]["status"], "pending");

    let payload = session_event(
        events::CHECKOUT_ASYNC_SUCCEEDED,
        &checkout_session_id(order_id),
        order_id,
        true,
    );
    post_webhook(app.clone(), &payload, signed(&payload)).await;
    let order = body_json(get_auth(app, &format!("/api/orders/{order_id}"), &token).await).await;
    assert_eq!(order["data"]["status"], "paid");
}

/// Count `order.paid` events waiting on the receiver.
fn paid_events(bus: &mut tokio::sync::broadcast::Receiver<vitashop_events::PlatformEvent>) -> usize {
    let mut count = 0;
    while let Ok(event) = bus.try_recv() {
        if event.event_type == event_types::ORDER_PAID {
            count += 1;
        }
    }
    count
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn async_payment_success_marks_order_paid_once(pool: PgPool) {
    let product = create_product(&pool, "ashwagandha", 1900, 5, &[]).await;
    let (_user, token) = customer_token(&pool, "c@example.com").await;
    let (app, state) = build_test_app_with_state(pool);
    let mut bus = state.event_bus.subscribe();

    let order_id = order_with_checkout(&app, &token, product.id, 1).await;
    let payload = session_event(
        events::CHECKOUT_ASYNC_SUCCEEDED,
        &checkout_session_id(order_id),
        order_id,
        true,
    );
    for _ in 0..2 {
        let response = post_webhook(app.clone(), &payload, signed(&payload)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let order = body_json(get_auth(app, &format!("/api/orders/{order_id}"), &token).await).await;
    assert_eq!(order["data"]["status"], "paid");
    assert_eq!(paid_events(&mut bus), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn payment_for_superseded_session_finds_order_by_metadata(pool: PgPool) {
    let product = create_product(&pool, "milk-thistle", 1500, 5, &[]).await;
    let (_user, token) = customer_token(&pool, "c@example.com").await;
    let (app, state) = build_test_app_with_state(pool);
    let mut bus = state.event_bus.subscribe();

    let order_id = order_with_checkout(&app, &token, product.id, 1).await;

    // An earlier session, no longer stored on the order, completes.
    let payload = session_event(events::CHECKOUT_COMPLETED, "cs_test_superseded", order_id, true);
    for _ in 0..2 {
        let response = post_webhook(app.clone(), &payload, signed(&payload)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let order = body_json(get_auth(app, &format!("/api/orders/{order_id}"), &token).await).await;
    assert_eq!(order["data"]["status"], "paid");
    assert_eq!(order["data"]["checkout_session_id"], checkout_session_id(order_id));
    assert_eq!(paid_events(&mut bus), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn webhook_rejects_bad_signatures(pool: PgPool) {
    let product = create_product(&pool, "ginseng", 2100, 5, &[]).await;
    let (_user, token) = customer_token(&pool, "c@example.com").await;
    let app = build_test_app(pool);

    let order_id = order_with_checkout(&app, &token, product.id, 1).await;
    let payload = session_event(
        events::CHECKOUT_COMPLETED,
        &checkout_session_id(order_id),
        order_id,
        true,
    );

    let response = post_webhook(app.clone(), &payload, None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let forged = sign_webhook_payload(
        payload.to_string().as_bytes(),
        "whsec_wrong",
        chrono::Utc::now().timestamp(),
    );
    let response = post_webhook(app.clone(), &payload, Some(forged)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let stale = sign_webhook_payload(
        payload.to_string().as_bytes(),
        WEBHOOK_SECRET,
        chrono::Utc::now().timestamp() - 3600,
    );
    let response = post_webhook(app.clone(), &payload, Some(stale)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let order = body_json(get_auth(app, &format!("/api/orders/{order_id}"), &token).await).await;
    assert_eq!(order["data"]["status"], "pending");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn expired_session_cancels_and_restocks(pool: PgPool) {
    let product = create_product(&pool, "maca-root", 1700, 3, &[]).await;
    let (_user, token) = customer_token(&pool, "c@example.com").await;
    let app = build_test_app(pool.clone());

    let order_id = order_with_checkout(&app, &token, product.id, 3).await;
    assert_eq!(stock_of(&pool, product.id).await, 0);

    let payload = session_event(
        events::CHECKOUT_EXPIRED,
        &checkout_session_id(order_id),
        order_id,
        false,
    );
    let response = post_webhook(app.clone(), &payload, signed(&payload)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let order = body_json(get_auth(app.clone(), &format!("/api/orders/{order_id}"), &token).await).await;
    assert_eq!(order["data"]["status"], "cancelled");
    assert_eq!(stock_of(&pool, product.id).await, 3);

    // A late payment for the cancelled order is acknowledged but not applied.
    let payload = session_event(
        events::CHECKOUT_COMPLETED,
        &checkout_session_id(order_id),
        order_id,
        true,
    );
    let response = post_webhook(app.clone(), &payload, signed(&payload)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let order = body_json(get_auth(app, &format!("/api/orders/{order_id}"), &token).await).await;
    assert_eq!(order["data"]["status"], "cancelled");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_events_are_acknowledged(pool: PgPool) {
    let app = build_test_app(pool);

    let payload = json!({
        "id": "evt_other",
        "type": "customer.created",
        "data": { "object": { "id": "cus_123" } },
    });
    let response = post_webhook(app.clone(), &payload, signed(&payload)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let malformed = json!({ "id": "evt_bad" });
    let response = post_webhook(app, &malformed, signed(&malformed)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

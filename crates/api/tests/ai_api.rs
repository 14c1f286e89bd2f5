//! Integration tests for recommendations and the advisory chat.
//!
//! The test state has no language model, so replies come from templates.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, build_test_app, create_product, customer_token, delete_auth, get_auth, post_json,
    post_json_auth,
};
use serde_json::json;
use sqlx::PgPool;
use vitashop_core::advisory::DISCLAIMER;

#[sqlx::test(migrations = "../../db/migrations")]
async fn guests_get_recommendations_by_goal(pool: PgPool) {
    create_product(&pool, "magnesium-glycinate", 1500, 20, &["sleep", "stress"]).await;
    create_product(&pool, "melatonin", 700, 20, &["sleep"]).await;
    create_product(&pool, "sold-out-valerian", 900, 0, &["sleep"]).await;
    create_product(&pool, "vitamin-c", 900, 20, &["immunity"]).await;
    let app = build_test_app(pool);

    let response = post_json(
        app,
        "/api/ai/recommend",
        json!({ "goals": ["sleep"], "text": "and I'm always so stressed" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["tags"], json!(["sleep", "stress"]));

    let slugs: Vec<&str> = json["products"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["slug"].as_str().unwrap())
        .collect();
    // The product covering both goals ranks first; sold-out items are skipped.
    assert_eq!(slugs.first(), Some(&"magnesium-glycinate"));
    assert_eq!(slugs.len(), 2);

    let message = json["message"].as_str().unwrap();
    assert!(message.contains("better sleep and stress relief"), "{message}");
    assert!(message.ends_with(DISCLAIMER));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn recommendation_limit_is_respected(pool: PgPool) {
    for i in 0..4 {
        create_product(&pool, &format!("energy-blend-{i}"), 1000, 5, &["energy"]).await;
    }
    let app = build_test_app(pool);

    let json = body_json(
        post_json(app, "/api/ai/recommend", json!({ "text": "so tired", "limit": 2 })).await,
    )
    .await;
    assert_eq!(json["tags"], json!(["energy"]));
    assert_eq!(json["products"].as_array().unwrap().len(), 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn recommendation_needs_some_input(pool: PgPool) {
    let app = build_test_app(pool);

    let response = post_json(app.clone(), "/api/ai/recommend", json!({})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Unmatched text is not an error; the reply asks for a clearer goal.
    let json = body_json(
        post_json(app, "/api/ai/recommend", json!({ "text": "skinny jeans" })).await,
    )
    .await;
    assert!(json["tags"].as_array().unwrap().is_empty());
    assert!(json["message"].as_str().unwrap().contains("couldn't match"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn chat_keeps_context_across_turns(pool: PgPool) {
    create_product(&pool, "lions-mane", 2400, 10, &["focus"]).await;
    create_product(&pool, "glucosamine", 1900, 10, &["joints"]).await;
    let (_user, token) = customer_token(&pool, "c@example.com").await;
    let app = build_test_app(pool);

    let response = post_json_auth(
        app.clone(),
        "/api/ai/chat",
        json!({ "message": "I have terrible brain fog lately" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let first = body_json(response).await;
    let conversation_id = first["conversation_id"].as_i64().unwrap();
    assert_eq!(first["tags"], json!(["focus"]));
    assert!(first["reply"].as_str().unwrap().contains("lions mane"));

    let second = body_json(
        post_json_auth(
            app.clone(),
            "/api/ai/chat",
            json!({ "message": "my knees hurt too", "conversation_id": conversation_id }),
            &token,
        )
        .await,
    )
    .await;
    assert_eq!(second["conversation_id"], conversation_id);
    assert_eq!(second["tags"], json!(["focus", "joints"]));
    assert_eq!(second["products"].as_array().unwrap().len(), 2);

    let json = body_json(
        get_auth(
            app.clone(),
            &format!("/api/ai/conversations/{conversation_id}"),
            &token,
        )
        .await,
    )
    .await;
    let messages = json["data"]["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[1]["role"], "assistant");
    assert_eq!(json["data"]["title"], "I have terrible brain fog lately");

    let json = body_json(get_auth(app, "/api/ai/conversations", &token).await).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
    assert_eq!(json["data"][0]["message_count"], 4);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn chat_rejects_blank_messages_and_guests(pool: PgPool) {
    let (_user, token) = customer_token(&pool, "c@example.com").await;
    let app = build_test_app(pool);

    let response =
        post_json_auth(app.clone(), "/api/ai/chat", json!({ "message": "   " }), &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json(app, "/api/ai/chat", json!({ "message": "hello" })).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn conversations_are_private(pool: PgPool) {
    let (_owner, owner_token) = customer_token(&pool, "owner@example.com").await;
    let (_other, other_token) = customer_token(&pool, "other@example.com").await;
    let app = build_test_app(pool);

    let json = body_json(
        post_json_auth(
            app.clone(),
            "/api/ai/chat",
            json!({ "message": "Help me sleep" }),
            &owner_token,
        )
        .await,
    )
    .await;
    let id = json["conversation_id"].as_i64().unwrap();
    let uri = format!("/api/ai/conversations/{id}");

    let response = get_auth(app.clone(), &uri, &other_token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = post_json_auth(
        app.clone(),
        "/api/ai/chat",
        json!({ "message": "hijack", "conversation_id": id }),
        &other_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = delete_auth(app.clone(), &uri, &other_token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = delete_auth(app.clone(), &uri, &owner_token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = get_auth(app, &uri, &owner_token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

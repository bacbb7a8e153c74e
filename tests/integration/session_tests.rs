//! Platform session storage tests

use axum::{body::Body, http::Request};
use serde_json::json;

use crate::common::{TestApp, TestResponse};

const SESSION_KEY: &str = "session-gate-key";

fn session(id: &str, shop: &str) -> serde_json::Value {
    json!({
        "id": id,
        "shop": shop,
        "state": "nonce-123",
        "isOnline": true,
        "scope": "read_products",
        "expires": "2030-01-01T00:00:00Z",
        "accessToken": format!("shpat_{}", id),
        "userId": 902541635,
        "email": "owner@example.com",
        "accountOwner": true,
    })
}

async fn delete_batch(app: &TestApp, ids: &[&str], token: Option<&str>) -> TestResponse {
    let mut builder = Request::builder()
        .method("DELETE")
        .uri("/api/sessions/batch")
        .header("Content-Type", "application/json");
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    app.request(
        builder
            .body(Body::from(json!({ "ids": ids }).to_string()))
            .unwrap(),
    )
    .await
}

#[tokio::test]
async fn test_store_and_load_session() {
    let app = TestApp::new().await;

    let stored = app
        .post_json("/api/sessions", session("online_1", "Acme.myshopify.com"))
        .await;
    stored.assert_ok();
    assert_eq!(stored.json::<serde_json::Value>()["success"], true);

    let loaded = app.get("/api/sessions/online_1").await;
    loaded.assert_ok();
    let body: serde_json::Value = loaded.json();
    assert_eq!(body["id"], "online_1");
    assert_eq!(body["shop"], "acme.myshopify.com");
    assert_eq!(body["accessToken"], "shpat_online_1");
    assert_eq!(body["isOnline"], true);
    assert_eq!(body["userId"], 902541635);
    assert_eq!(body["accountOwner"], true);
}

#[tokio::test]
async fn test_access_token_is_sealed_at_rest() {
    let app = TestApp::new().await;
    app.post_json("/api/sessions", session("sealed_1", "acme.myshopify.com"))
        .await
        .assert_ok();

    let stored: Vec<u8> = sqlx::query_scalar(
        "SELECT encrypted_access_token FROM platform_sessions WHERE id = ?",
    )
    .bind("sealed_1")
    .fetch_one(&app.state.db)
    .await
    .unwrap();

    let needle = b"shpat_sealed_1";
    assert!(!stored.windows(needle.len()).any(|w| w == needle));
}

#[tokio::test]
async fn test_store_requires_fields() {
    let app = TestApp::new().await;

    app.post_json(
        "/api/sessions",
        json!({ "id": "x", "shop": "acme.myshopify.com", "state": "s" }),
    )
    .await
    .assert_bad_request();
}

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    let app = TestApp::new().await;
    app.get("/api/sessions/missing").await.assert_not_found();
}

#[tokio::test]
async fn test_sessions_by_shop_and_deletion() {
    let app = TestApp::new().await;
    for id in ["a", "b", "c"] {
        app.post_json("/api/sessions", session(id, "multi.myshopify.com"))
            .await
            .assert_ok();
    }
    app.post_json("/api/sessions", session("other", "elsewhere.myshopify.com"))
        .await
        .assert_ok();

    let listed: Vec<serde_json::Value> = app
        .get("/api/sessions/shop/multi.myshopify.com")
        .await
        .json();
    assert_eq!(listed.len(), 3);

    app.delete("/api/sessions/a").await.assert_no_content();
    app.delete("/api/sessions/a").await.assert_no_content();

    let response = delete_batch(&app, &["b", "c", "nope"], None).await;
    response.assert_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["deleted"], 2);

    let listed: Vec<serde_json::Value> = app
        .get("/api/sessions/shop/multi.myshopify.com")
        .await
        .json();
    assert!(listed.is_empty());
    app.get("/api/sessions/other").await.assert_ok();
}

#[tokio::test]
async fn test_batch_delete_rejects_empty_list() {
    let app = TestApp::new().await;
    delete_batch(&app, &[], None).await.assert_bad_request();
}

#[tokio::test]
async fn test_session_key_gate() {
    let app = TestApp::with_session_key(SESSION_KEY).await;

    app.post_json("/api/sessions", session("gated", "acme.myshopify.com"))
        .await
        .assert_unauthorized();

    app.post_json_with_auth(
        "/api/sessions",
        session("gated", "acme.myshopify.com"),
        "wrong-key",
    )
    .await
    .assert_invalid_credentials();

    app.post_json_with_auth(
        "/api/sessions",
        session("gated", "acme.myshopify.com"),
        SESSION_KEY,
    )
    .await
    .assert_ok();

    app.get("/api/sessions/gated").await.assert_unauthorized();
    app.get_with_auth("/api/sessions/gated", SESSION_KEY)
        .await
        .assert_ok();
    delete_batch(&app, &["gated"], Some(SESSION_KEY))
        .await
        .assert_ok();
}

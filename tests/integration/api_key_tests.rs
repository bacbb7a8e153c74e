//! Tenant API key lifecycle tests

use std::time::Duration;

use chrono::Utc;
use serde_json::json;

use crate::common::{create_client, generate_key, register_user, TestApp, TestResponse};

async fn scope_with_key(app: &TestApp, client_name: &str, key: &str) -> TestResponse {
    app.get_with_header(
        &format!("/api/v1/clients/{}/scope", client_name),
        "X-API-Key",
        key,
    )
    .await
}

#[tokio::test]
async fn test_generated_key_is_shown_once() {
    let app = TestApp::new().await;
    let user = register_user(&app, "keys@example.com").await;
    let client = create_client(&app, &user.token, "keys-co").await;

    let response = app
        .post_json_with_auth(
            &format!("/api/clients/{}/api-keys", client.id),
            json!({ "name": "production", "permissions": ["read"] }),
            &user.token,
        )
        .await;
    response.assert_created();
    let generated: serde_json::Value = response.json();
    let raw = generated["key"].as_str().unwrap();
    let prefix = generated["key_prefix"].as_str().unwrap();
    assert!(raw.starts_with(prefix));
    assert!(generated.get("key_hash").is_none());

    let listed = app
        .get_with_auth(&format!("/api/clients/{}/api-keys", client.id), &user.token)
        .await;
    listed.assert_ok();
    let keys: Vec<serde_json::Value> = listed.json();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0]["name"], "production");
    assert!(keys[0].get("key").is_none());
    assert!(keys[0].get("key_hash").is_none());
    assert!(!listed.text().contains(raw));
}

#[tokio::test]
async fn test_key_accepted_from_header_or_bearer() {
    let app = TestApp::new().await;
    let user = register_user(&app, "keys@example.com").await;
    let client = create_client(&app, &user.token, "keys-co").await;
    let (_, key) = generate_key(&app, &user.token, &client.id, &[]).await;

    scope_with_key(&app, &client.name, &key).await.assert_ok();
    app.get_with_auth(&format!("/api/v1/clients/{}/scope", client.name), &key)
        .await
        .assert_ok();
}

#[tokio::test]
async fn test_missing_and_unknown_keys() {
    let app = TestApp::new().await;
    let user = register_user(&app, "keys@example.com").await;
    let client = create_client(&app, &user.token, "keys-co").await;

    let missing = app
        .get(&format!("/api/v1/clients/{}/scope", client.name))
        .await;
    missing.assert_unauthorized();
    let body: serde_json::Value = missing.json();
    assert_eq!(body["message"], "Missing credentials");

    scope_with_key(&app, &client.name, "mgs_doesnotexist")
        .await
        .assert_invalid_credentials();
}

#[tokio::test]
async fn test_revoked_key_is_rejected_like_unknown_key() {
    let app = TestApp::new().await;
    let user = register_user(&app, "keys@example.com").await;
    let client = create_client(&app, &user.token, "keys-co").await;
    let (key_id, key) = generate_key(&app, &user.token, &client.id, &["read"]).await;

    scope_with_key(&app, &client.name, &key).await.assert_ok();

    app.delete_with_auth(
        &format!("/api/clients/{}/api-keys/{}", client.id, key_id),
        &user.token,
    )
    .await
    .assert_no_content();

    let revoked = scope_with_key(&app, &client.name, &key).await;
    let unknown = scope_with_key(&app, &client.name, "mgs_doesnotexist").await;
    revoked.assert_invalid_credentials();
    assert_eq!(revoked.body, unknown.body);

    let keys: Vec<serde_json::Value> = app
        .get_with_auth(&format!("/api/clients/{}/api-keys", client.id), &user.token)
        .await
        .json();
    assert_eq!(keys[0]["is_active"], false);
}

#[tokio::test]
async fn test_revoking_twice_succeeds() {
    let app = TestApp::new().await;
    let user = register_user(&app, "keys@example.com").await;
    let client = create_client(&app, &user.token, "keys-co").await;
    let (key_id, _) = generate_key(&app, &user.token, &client.id, &[]).await;
    let uri = format!("/api/clients/{}/api-keys/{}", client.id, key_id);

    app.delete_with_auth(&uri, &user.token).await.assert_no_content();
    app.delete_with_auth(&uri, &user.token).await.assert_no_content();
}

#[tokio::test]
async fn test_revoking_unknown_key_is_not_found() {
    let app = TestApp::new().await;
    let user = register_user(&app, "keys@example.com").await;
    let client = create_client(&app, &user.token, "keys-co").await;

    app.delete_with_auth(
        &format!("/api/clients/{}/api-keys/{}", client.id, uuid::Uuid::new_v4()),
        &user.token,
    )
    .await
    .assert_not_found();
}

#[tokio::test]
async fn test_expired_key_is_rejected() {
    let app = TestApp::new().await;
    let user = register_user(&app, "keys@example.com").await;
    let client = create_client(&app, &user.token, "keys-co").await;

    let expires_at = Utc::now() + chrono::Duration::seconds(1);
    let generated: serde_json::Value = app
        .post_json_with_auth(
            &format!("/api/clients/{}/api-keys", client.id),
            json!({ "name": "short-lived", "expires_at": expires_at }),
            &user.token,
        )
        .await
        .json();
    let key = generated["key"].as_str().unwrap().to_string();

    tokio::time::sleep(Duration::from_millis(1500)).await;

    let response = scope_with_key(&app, &client.name, &key).await;
    response.assert_unauthorized();
    let body: serde_json::Value = response.json();
    assert_eq!(body["message"], "Credentials have expired");
}

#[tokio::test]
async fn test_key_generation_validation() {
    let app = TestApp::new().await;
    let user = register_user(&app, "keys@example.com").await;
    let client = create_client(&app, &user.token, "keys-co").await;
    let uri = format!("/api/clients/{}/api-keys", client.id);

    app.post_json_with_auth(
        &uri,
        json!({ "name": "admin", "permissions": ["admin"] }),
        &user.token,
    )
    .await
    .assert_bad_request();

    app.post_json_with_auth(
        &uri,
        json!({ "name": "stale", "expires_at": Utc::now() - chrono::Duration::hours(1) }),
        &user.token,
    )
    .await
    .assert_bad_request();
}

#[tokio::test]
async fn test_key_for_unknown_client_name_is_not_found() {
    let app = TestApp::new().await;
    let user = register_user(&app, "keys@example.com").await;
    let client = create_client(&app, &user.token, "keys-co").await;
    let (_, key) = generate_key(&app, &user.token, &client.id, &[]).await;

    scope_with_key(&app, "no-such-client", &key)
        .await
        .assert_not_found();
}

//! Tenant isolation tests
//!
//! Every cross-tenant attempt must be denied, whatever the credential.

use axum::http::StatusCode;
use serde_json::json;

use crate::common::{create_client, generate_key, install_store, register_user, TestApp};

#[tokio::test]
async fn test_create_client_makes_caller_a_member() {
    let app = TestApp::new().await;
    let user = register_user(&app, "owner@example.com").await;

    let response = app
        .post_json_with_auth(
            "/api/clients",
            json!({ "name": "acme", "description": "Acme storefront search" }),
            &user.token,
        )
        .await;
    response.assert_created();

    let body: serde_json::Value = response.json();
    assert_eq!(body["name"], "acme");
    assert_eq!(body["member_ids"], json!([user.id]));
    assert_eq!(body["api_keys"], json!([]));

    let listed = app.get_with_auth("/api/clients", &user.token).await;
    listed.assert_ok();
    let clients: Vec<serde_json::Value> = listed.json();
    assert_eq!(clients.len(), 1);
    assert_eq!(clients[0]["name"], "acme");
}

#[tokio::test]
async fn test_client_name_rules() {
    let app = TestApp::new().await;
    let user = register_user(&app, "names@example.com").await;

    for bad in ["1acme", "acme corp", "acme/../x"] {
        let response = app
            .post_json_with_auth("/api/clients", json!({ "name": bad }), &user.token)
            .await;
        response.assert_bad_request();
    }

    create_client(&app, &user.token, "acme").await;
    let duplicate = app
        .post_json_with_auth("/api/clients", json!({ "name": "acme" }), &user.token)
        .await;
    duplicate.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_non_member_cannot_read_client() {
    let app = TestApp::new().await;
    let alice = register_user(&app, "alice@example.com").await;
    let mallory = register_user(&app, "mallory@example.com").await;
    let client = create_client(&app, &alice.token, "alice-co").await;

    app.get_with_auth(&format!("/api/clients/{}", client.id), &alice.token)
        .await
        .assert_ok();
    app.get_with_auth(&format!("/api/clients/{}", client.id), &mallory.token)
        .await
        .assert_forbidden();

    let listed: Vec<serde_json::Value> = app
        .get_with_auth("/api/clients", &mallory.token)
        .await
        .json();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn test_non_member_cannot_manage_keys() {
    let app = TestApp::new().await;
    let alice = register_user(&app, "alice@example.com").await;
    let mallory = register_user(&app, "mallory@example.com").await;
    let client = create_client(&app, &alice.token, "alice-co").await;
    let (key_id, _) = generate_key(&app, &alice.token, &client.id, &[]).await;

    app.post_json_with_auth(
        &format!("/api/clients/{}/api-keys", client.id),
        json!({ "name": "stolen" }),
        &mallory.token,
    )
    .await
    .assert_forbidden();

    app.get_with_auth(&format!("/api/clients/{}/api-keys", client.id), &mallory.token)
        .await
        .assert_forbidden();

    app.delete_with_auth(
        &format!("/api/clients/{}/api-keys/{}", client.id, key_id),
        &mallory.token,
    )
    .await
    .assert_forbidden();
}

#[tokio::test]
async fn test_unknown_client_is_not_found() {
    let app = TestApp::new().await;
    let user = register_user(&app, "ghost@example.com").await;

    app.get_with_auth(
        &format!("/api/clients/{}", uuid::Uuid::new_v4()),
        &user.token,
    )
    .await
    .assert_not_found();
}

#[tokio::test]
async fn test_added_member_gains_access() {
    let app = TestApp::new().await;
    let alice = register_user(&app, "alice@example.com").await;
    let bob = register_user(&app, "bob@example.com").await;
    let client = create_client(&app, &alice.token, "shared-co").await;

    app.get_with_auth(&format!("/api/clients/{}", client.id), &bob.token)
        .await
        .assert_forbidden();

    let response = app
        .post_json_with_auth(
            &format!("/api/clients/{}/members", client.id),
            json!({ "email": "bob@example.com" }),
            &alice.token,
        )
        .await;
    response.assert_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["member_ids"].as_array().unwrap().len(), 2);

    app.get_with_auth(&format!("/api/clients/{}", client.id), &bob.token)
        .await
        .assert_ok();
}

#[tokio::test]
async fn test_api_key_bound_to_its_own_client() {
    let app = TestApp::new().await;
    let alice = register_user(&app, "alice@example.com").await;
    let bob = register_user(&app, "bob@example.com").await;
    let alice_co = create_client(&app, &alice.token, "alice-co").await;
    let bob_co = create_client(&app, &bob.token, "bob-co").await;
    let (_, alice_key) = generate_key(&app, &alice.token, &alice_co.id, &["read"]).await;

    let own = app
        .get_with_header(
            &format!("/api/v1/clients/{}/scope", alice_co.name),
            "X-API-Key",
            &alice_key,
        )
        .await;
    own.assert_ok();
    let body: serde_json::Value = own.json();
    assert_eq!(body["client_id"], alice_co.id.as_str());
    assert_eq!(body["permissions"], json!(["read"]));

    app.get_with_header(
        &format!("/api/v1/clients/{}/scope", bob_co.name),
        "X-API-Key",
        &alice_key,
    )
    .await
    .assert_forbidden();
}

#[tokio::test]
async fn test_api_key_cannot_use_user_routes() {
    let app = TestApp::new().await;
    let alice = register_user(&app, "alice@example.com").await;
    let client = create_client(&app, &alice.token, "alice-co").await;
    let (_, key) = generate_key(&app, &alice.token, &client.id, &[]).await;

    app.get_with_auth(&format!("/api/clients/{}", client.id), &key)
        .await
        .assert_unauthorized();
}

#[tokio::test]
async fn test_store_session_cannot_reach_tenant_routes() {
    let app = TestApp::new().await;
    let store = install_store(&app, "isolated.myshopify.com").await;

    app.get_with_auth("/api/v1/clients/anything/scope", &store.token)
        .await
        .assert_unauthorized();
    app.get_with_auth("/api/clients", &store.token)
        .await
        .assert_unauthorized();
}

#[tokio::test]
async fn test_store_sessions_are_isolated() {
    let app = TestApp::new().await;
    let first = install_store(&app, "first-shop.myshopify.com").await;
    let second = install_store(&app, "second-shop.myshopify.com").await;

    let mine: serde_json::Value = app
        .get_with_auth("/api/stores/current", &first.token)
        .await
        .json();
    assert_eq!(mine["id"], first.id.as_str());

    let theirs: serde_json::Value = app
        .get_with_auth("/api/stores/current", &second.token)
        .await
        .json();
    assert_eq!(theirs["id"], second.id.as_str());
    assert_ne!(mine["index_uid"], theirs["index_uid"]);
}

//! Test fixtures for common test data
//!
//! Secrets the test configuration is built from, a fake platform token
//! exchange, and helpers that drive the API into a known state.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::json;

use mgsearch::services::{
    signature::{sign_oauth_params, sign_webhook},
    AccessTokenExchange, AccessTokenGrant, AuthError,
};

use super::test_app::TestApp;

pub const SIGNING_KEY: &str = "integration-test-signing-key-at-least-32-chars";
pub const ENCRYPTION_KEY_HEX: &str =
    "1111111111111111111111111111111111111111111111111111111111111111";
pub const WEBHOOK_SECRET: &str = "integration-webhook-secret";
pub const SHOPIFY_API_KEY: &str = "integration-app-key";
pub const SHOPIFY_API_SECRET: &str = "integration-app-secret";
pub const SEARCH_API_KEY: &str = "integration-search-master-key";
pub const DEFAULT_PASSWORD: &str = "correct-horse-battery";

/// Authorization code the fake exchange refuses
pub const REJECTED_CODE: &str = "rejected-code";

/// Platform token exchange that never leaves the process
#[derive(Debug, Default)]
pub struct FakeExchange;

#[async_trait]
impl AccessTokenExchange for FakeExchange {
    async fn exchange_code(&self, shop: &str, code: &str) -> Result<AccessTokenGrant, AuthError> {
        if code == REJECTED_CODE {
            return Err(AuthError::Upstream("authorization code rejected".to_string()));
        }
        Ok(AccessTokenGrant {
            access_token: format!("shpat_{}", shop.split('.').next().unwrap_or(shop)),
            scope: "read_products".to_string(),
        })
    }
}

/// A user registered through the API
#[derive(Debug, Clone)]
pub struct RegisteredUser {
    pub id: String,
    pub email: String,
    pub token: String,
}

/// A tenant created through the API
#[derive(Debug, Clone)]
pub struct CreatedClient {
    pub id: String,
    pub name: String,
}

/// A store installed through the OAuth flow
#[derive(Debug, Clone)]
pub struct InstalledStore {
    pub id: String,
    pub shop: String,
    pub token: String,
    pub storefront_key: String,
    pub index_uid: String,
}

/// Register a user and return its session
pub async fn register_user(app: &TestApp, email: &str) -> RegisteredUser {
    let response = app
        .post_json(
            "/api/users/register",
            json!({
                "email": email,
                "password": DEFAULT_PASSWORD,
                "first_name": "Test",
                "last_name": "User",
            }),
        )
        .await;
    response.assert_created();

    let body: serde_json::Value = response.json();
    RegisteredUser {
        id: body["user"]["id"].as_str().unwrap().to_string(),
        email: body["user"]["email"].as_str().unwrap().to_string(),
        token: body["token"].as_str().unwrap().to_string(),
    }
}

/// Create a tenant owned by the holder of `token`
pub async fn create_client(app: &TestApp, token: &str, name: &str) -> CreatedClient {
    let response = app
        .post_json_with_auth("/api/clients", json!({ "name": name }), token)
        .await;
    response.assert_created();

    let body: serde_json::Value = response.json();
    CreatedClient {
        id: body["id"].as_str().unwrap().to_string(),
        name: body["name"].as_str().unwrap().to_string(),
    }
}

/// Generate an API key on `client_id`; returns `(key_id, raw_key)`
pub async fn generate_key(
    app: &TestApp,
    token: &str,
    client_id: &str,
    permissions: &[&str],
) -> (String, String) {
    let response = app
        .post_json_with_auth(
            &format!("/api/clients/{}/api-keys", client_id),
            json!({
                "name": format!("key-{}", uuid::Uuid::new_v4().simple()),
                "permissions": permissions,
            }),
            token,
        )
        .await;
    response.assert_created();

    let body: serde_json::Value = response.json();
    (
        body["id"].as_str().unwrap().to_string(),
        body["key"].as_str().unwrap().to_string(),
    )
}

/// Start an install for `shop` and return the state token
pub async fn begin_install(app: &TestApp, shop: &str) -> String {
    let response = app
        .post_json("/api/auth/shopify/begin", json!({ "shop": shop }))
        .await;
    response.assert_ok();

    let body: serde_json::Value = response.json();
    body["state"].as_str().unwrap().to_string()
}

/// Signed callback query string for the given parameters
pub fn signed_callback_query(params: &[(&str, &str)]) -> String {
    signed_callback_query_with(SHOPIFY_API_SECRET, params)
}

pub fn signed_callback_query_with(secret: &str, params: &[(&str, &str)]) -> String {
    let map: BTreeMap<String, String> = params
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let hmac = sign_oauth_params(secret, &map).unwrap();

    let mut pairs: Vec<String> = map
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect();
    pairs.push(format!("hmac={}", hmac));
    pairs.join("&")
}

/// Run the full install flow for `shop`
pub async fn install_store(app: &TestApp, shop: &str) -> InstalledStore {
    let state = begin_install(app, shop).await;
    let query = signed_callback_query(&[
        ("code", "auth-code"),
        ("shop", shop),
        ("state", &state),
        ("timestamp", "1700000000"),
    ]);

    let response = app
        .get(&format!("/api/auth/shopify/callback?{}", query))
        .await;
    response.assert_ok();

    let body: serde_json::Value = response.json();
    InstalledStore {
        id: body["store"]["id"].as_str().unwrap().to_string(),
        shop: body["store"]["shop_domain"].as_str().unwrap().to_string(),
        token: body["token"].as_str().unwrap().to_string(),
        storefront_key: body["store"]["storefront_key"].as_str().unwrap().to_string(),
        index_uid: body["store"]["index_uid"].as_str().unwrap().to_string(),
    }
}

/// Base64 webhook signature under the deployment-wide secret
pub fn webhook_signature(body: &[u8]) -> String {
    sign_webhook(WEBHOOK_SECRET, body).unwrap()
}

/// Deliver a webhook signed with `signature`
pub async fn send_webhook(
    app: &TestApp,
    topic: &str,
    shop: &str,
    body: &serde_json::Value,
    signature: &str,
) -> super::TestResponse {
    app.post_raw(
        &format!("/webhooks/shopify/{}", topic),
        body.to_string().into_bytes(),
        &[
            ("X-Shopify-Hmac-Sha256", signature),
            ("X-Shopify-Shop-Domain", shop),
        ],
    )
    .await
}

/// Deliver a correctly signed webhook
pub async fn send_signed_webhook(
    app: &TestApp,
    topic: &str,
    shop: &str,
    body: &serde_json::Value,
) -> super::TestResponse {
    let signature = webhook_signature(body.to_string().as_bytes());
    send_webhook(app, topic, shop, body, &signature).await
}

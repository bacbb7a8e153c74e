//! Store session and storefront key tests

use crate::common::{install_store, TestApp, SEARCH_API_KEY};

#[tokio::test]
async fn test_search_credentials_for_own_store() {
    let app = TestApp::new().await;
    let store = install_store(&app, "searchy.myshopify.com").await;

    let response = app
        .get_with_auth("/api/stores/search-credentials", &store.token)
        .await;
    response.assert_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["api_key"], SEARCH_API_KEY);
    assert_eq!(body["index_uid"], store.index_uid.as_str());
    assert_eq!(body["search_url"], "http://search.example.test:7700");
}

#[tokio::test]
async fn test_store_routes_require_store_session() {
    let app = TestApp::new().await;
    let store = install_store(&app, "searchy.myshopify.com").await;

    app.get("/api/stores/current").await.assert_unauthorized();
    app.get_with_auth("/api/stores/current", &store.storefront_key)
        .await
        .assert_unauthorized();
}

#[tokio::test]
async fn test_storefront_key_grants_read_scope() {
    let app = TestApp::new().await;
    let store = install_store(&app, "front.myshopify.com").await;

    let response = app
        .get_with_header(
            "/api/v1/storefront/scope",
            "X-Storefront-Key",
            &store.storefront_key,
        )
        .await;
    response.assert_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["scheme"], "storefront");
    assert_eq!(body["store_id"], store.id.as_str());
    assert_eq!(body["shop"], "front.myshopify.com");
    assert_eq!(body["index_uid"], store.index_uid.as_str());
}

#[tokio::test]
async fn test_storefront_key_failures() {
    let app = TestApp::new().await;
    install_store(&app, "front.myshopify.com").await;

    app.get("/api/v1/storefront/scope")
        .await
        .assert_unauthorized();
    app.get_with_header("/api/v1/storefront/scope", "X-Storefront-Key", "sf_unknown")
        .await
        .assert_invalid_credentials();
}

#[tokio::test]
async fn test_storefront_key_is_not_a_session() {
    let app = TestApp::new().await;
    let store = install_store(&app, "front.myshopify.com").await;

    app.get_with_header("/api/stores/search-credentials", "X-Storefront-Key", &store.storefront_key)
        .await
        .assert_unauthorized();
}

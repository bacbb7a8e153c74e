//! Platform install steps

use cucumber::{given, then, when};
use mgsearch::db::MerchantStore;

use crate::common::{begin_install, signed_callback_query};
use crate::features::support::TestWorld;

#[given(expr = "an install was started for {string}")]
async fn install_started(world: &mut TestWorld, shop: String) {
    let state = begin_install(world.app().await, &shop).await;
    world.oauth_states.insert(shop, state);
}

#[when(expr = "the platform redirects back for {string} with the state for {string}")]
async fn platform_redirects(world: &mut TestWorld, shop: String, state_shop: String) {
    let state = world
        .oauth_states
        .get(&state_shop)
        .cloned()
        .unwrap_or_else(|| panic!("no install started for {}", state_shop));
    let query = signed_callback_query(&[
        ("code", "auth-code"),
        ("shop", &shop),
        ("state", &state),
        ("timestamp", "1700000000"),
    ]);

    let response = world
        .app()
        .await
        .get(&format!("/api/auth/shopify/callback?{}", query))
        .await;
    world.last_response = Some(response);
}

#[then("the response should contain a store session")]
async fn contains_store_session(world: &mut TestWorld) {
    let body: serde_json::Value = world.response().json();
    assert_eq!(body["token_type"], "Bearer");
    assert!(!body["token"].as_str().unwrap_or_default().is_empty());
    assert!(body["store"]["id"].is_string());
}

#[then(expr = "no store is registered for {string}")]
async fn no_store_registered(world: &mut TestWorld, shop: String) {
    let app = world.app().await;
    let store = app.state.stores.find_store_by_shop(&shop).await.unwrap();
    assert!(store.is_none());
}

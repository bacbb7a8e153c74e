//! Tenant API key steps

use cucumber::{given, when};

use crate::common::generate_key;
use crate::features::support::TestWorld;

#[given(expr = "an API key for the client {string}")]
async fn api_key_for_client(world: &mut TestWorld, name: String) {
    let client_id = world.client_id(&name).to_string();
    let owner = world
        .client_owners
        .get(&name)
        .cloned()
        .unwrap_or_else(|| panic!("client {} has no owner", name));
    let owner_token = world.user(&owner).token.clone();
    let key = generate_key(world.app().await, &owner_token, &client_id, &["read"]).await;
    world.api_key = Some(key);
}

#[when(expr = "the API key requests the scope of {string}")]
async fn api_key_requests_scope(world: &mut TestWorld, name: String) {
    let (_, raw_key) = world.api_key.clone().expect("no API key generated");
    let uri = format!("/api/v1/clients/{}/scope", name);
    let response = world
        .app()
        .await
        .get_with_header(&uri, "X-API-Key", &raw_key)
        .await;
    world.last_response = Some(response);
}

#[when(expr = "{string} revokes the API key on {string}")]
async fn revoke_api_key(world: &mut TestWorld, email: String, name: String) {
    let (key_id, _) = world.api_key.clone().expect("no API key generated");
    let token = world.user(&email).token.clone();
    let uri = format!("/api/clients/{}/api-keys/{}", world.client_id(&name), key_id);
    let response = world.app().await.delete_with_auth(&uri, &token).await;
    world.last_response = Some(response);
}

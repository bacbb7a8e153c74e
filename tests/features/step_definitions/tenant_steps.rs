//! Tenant membership steps

use cucumber::{given, when};

use crate::common::{create_client, register_user};
use crate::features::support::TestWorld;

async fn ensure_user(world: &mut TestWorld, email: &str) {
    if world.users.contains_key(email) {
        return;
    }
    let user = register_user(world.app().await, email).await;
    world.users.insert(email.to_string(), user);
}

#[given(expr = "a registered user {string}")]
async fn registered_user(world: &mut TestWorld, email: String) {
    ensure_user(world, &email).await;
}

#[given(expr = "a user {string} owning the client {string}")]
async fn user_owning_client(world: &mut TestWorld, email: String, name: String) {
    ensure_user(world, &email).await;
    let token = world.user(&email).token.clone();
    let client = create_client(world.app().await, &token, &name).await;
    world.clients.insert(name.clone(), client.id);
    world.client_owners.insert(name, email);
}

#[when(expr = "{string} reads the client {string}")]
async fn user_reads_client(world: &mut TestWorld, email: String, name: String) {
    let token = world.user(&email).token.clone();
    let uri = format!("/api/clients/{}", world.client_id(&name));
    let response = world.app().await.get_with_auth(&uri, &token).await;
    world.last_response = Some(response);
}

#[when(expr = "an anonymous caller reads the client {string}")]
async fn anonymous_reads_client(world: &mut TestWorld, name: String) {
    let uri = format!("/api/clients/{}", world.client_id(&name));
    let response = world.app().await.get(&uri).await;
    world.last_response = Some(response);
}

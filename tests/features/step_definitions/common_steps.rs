//! Common step definitions used across features

use cucumber::then;

use crate::features::support::TestWorld;

#[then(expr = "the response status should be {int}")]
async fn response_status(world: &mut TestWorld, status: u16) {
    let response = world.response();
    assert_eq!(
        response.status.as_u16(),
        status,
        "Body: {}",
        response.text()
    );
}

#[then("the response should contain an error")]
async fn response_contains_error(world: &mut TestWorld) {
    let body: serde_json::Value = world.response().json();
    assert!(body.get("error").is_some());
}

#[then(expr = "the response message should be {string}")]
async fn response_message(world: &mut TestWorld, message: String) {
    let body: serde_json::Value = world.response().json();
    assert_eq!(body["message"], message.as_str());
}

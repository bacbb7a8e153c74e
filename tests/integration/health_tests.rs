//! Health endpoint tests

use crate::common::TestApp;

#[tokio::test]
async fn test_health_endpoint_returns_ok() {
    let app = TestApp::new().await;
    let response = app.get("/health").await;

    response.assert_ok();

    let json: serde_json::Value = response.json();
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn test_readiness_probe() {
    let app = TestApp::new().await;
    app.get("/health/ready").await.assert_ok();
}

#[tokio::test]
async fn test_health_needs_no_credentials() {
    let app = TestApp::new().await;
    let response = app.get_with_auth("/health", "garbage").await;
    response.assert_ok();
}

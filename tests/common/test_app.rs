//! Test application setup utilities
//!
//! Provides utilities for setting up test instances of the application
//! with throwaway SQLite databases and a fake platform token exchange.

use std::sync::Arc;

use axum::{body::Body, http::Request, Router};
use tower::ServiceExt;
use uuid::Uuid;

use mgsearch::{
    api,
    config::{AppConfig, DatabaseConfig},
    db, AppState,
};

use super::fixtures::{self, FakeExchange};

/// Test application wrapper for integration testing
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl std::fmt::Debug for TestApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestApp").finish_non_exhaustive()
    }
}

impl TestApp {
    /// Create a new test application with a fresh database
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    /// Create a test application whose session endpoints require `key`
    pub async fn with_session_key(key: &str) -> Self {
        let mut config = test_config();
        config.auth.session_api_key = Some(key.to_string());
        Self::with_config(config).await
    }

    /// Create a new test application with custom configuration
    pub async fn with_config(config: AppConfig) -> Self {
        let db = db::init_pool(&config.database)
            .await
            .expect("Failed to initialize test database");

        let state = AppState::with_exchange(config, db, Arc::new(FakeExchange))
            .expect("Failed to build application state");

        let router = api::create_router(state.clone());

        Self { router, state }
    }

    /// Make a GET request to the test application
    pub async fn get(&self, uri: &str) -> TestResponse {
        self.request(
            Request::builder()
                .method("GET")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    /// Make a GET request with a bearer token
    pub async fn get_with_auth(&self, uri: &str, token: &str) -> TestResponse {
        self.get_with_header(uri, "Authorization", &format!("Bearer {}", token))
            .await
    }

    /// Make a GET request carrying one extra header
    pub async fn get_with_header(&self, uri: &str, name: &str, value: &str) -> TestResponse {
        self.request(
            Request::builder()
                .method("GET")
                .uri(uri)
                .header(name, value)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    /// Make a POST request with JSON body
    pub async fn post_json(&self, uri: &str, body: serde_json::Value) -> TestResponse {
        self.request(json_request("POST", uri, &body)).await
    }

    /// Make a POST request with JSON body and a bearer token
    pub async fn post_json_with_auth(
        &self,
        uri: &str,
        body: serde_json::Value,
        token: &str,
    ) -> TestResponse {
        self.request_with_auth(json_request("POST", uri, &body), token)
            .await
    }

    /// Make a POST request with JSON body and extra headers
    pub async fn post_json_with_headers(
        &self,
        uri: &str,
        body: serde_json::Value,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        self.post_raw(uri, body.to_string().into_bytes(), headers).await
    }

    /// Make a POST request with a raw body and extra headers
    pub async fn post_raw(&self, uri: &str, body: Vec<u8>, headers: &[(&str, &str)]) -> TestResponse {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        self.request(builder.body(Body::from(body)).unwrap()).await
    }

    /// Make a PUT request with JSON body and a bearer token
    pub async fn put_json_with_auth(
        &self,
        uri: &str,
        body: serde_json::Value,
        token: &str,
    ) -> TestResponse {
        self.request_with_auth(json_request("PUT", uri, &body), token)
            .await
    }

    /// Make a DELETE request
    pub async fn delete(&self, uri: &str) -> TestResponse {
        self.request(
            Request::builder()
                .method("DELETE")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    /// Make a DELETE request with a bearer token
    pub async fn delete_with_auth(&self, uri: &str, token: &str) -> TestResponse {
        self.request_with_auth(
            Request::builder()
                .method("DELETE")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
            token,
        )
        .await
    }

    /// Make a request with authentication
    pub async fn request_with_auth(&self, request: Request<Body>, token: &str) -> TestResponse {
        let (mut parts, body) = request.into_parts();
        parts.headers.insert(
            "Authorization",
            format!("Bearer {}", token).parse().unwrap(),
        );
        self.request(Request::from_parts(parts, body)).await
    }

    /// Make an arbitrary request
    pub async fn request(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request");

        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read response body");

        TestResponse {
            status,
            headers,
            body,
        }
    }
}

fn json_request(method: &str, uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: axum::http::StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: bytes::Bytes,
}

impl TestResponse {
    /// Get the response body as a string
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    /// Parse the response body as JSON
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.body).expect("Failed to parse response as JSON")
    }

    /// Check if the response status is successful (2xx)
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Assert the response status
    pub fn assert_status(&self, expected: axum::http::StatusCode) -> &Self {
        assert_eq!(
            self.status,
            expected,
            "Expected status {}, got {}. Body: {}",
            expected,
            self.status,
            self.text()
        );
        self
    }

    /// Assert the response status is OK (200)
    pub fn assert_ok(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::OK)
    }

    /// Assert the response status is Created (201)
    pub fn assert_created(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::CREATED)
    }

    /// Assert the response status is No Content (204)
    pub fn assert_no_content(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::NO_CONTENT)
    }

    /// Assert the response status is Bad Request (400)
    pub fn assert_bad_request(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::BAD_REQUEST)
    }

    /// Assert the response status is Unauthorized (401)
    pub fn assert_unauthorized(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::UNAUTHORIZED)
    }

    /// Assert the response status is Forbidden (403)
    pub fn assert_forbidden(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::FORBIDDEN)
    }

    /// Assert the response status is Not Found (404)
    pub fn assert_not_found(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::NOT_FOUND)
    }

    /// Assert the body carries the uniform invalid-credential denial
    pub fn assert_invalid_credentials(&self) -> &Self {
        self.assert_unauthorized();
        let body: serde_json::Value = self.json();
        assert_eq!(body["message"], "Invalid credentials", "Body: {}", self.text());
        self
    }
}

/// Create a test configuration with a temporary SQLite database
pub fn test_config() -> AppConfig {
    // Use a unique temp file for each test to avoid conflicts
    let db_path = std::env::temp_dir().join(format!(
        "mgsearch_test_{}.db",
        Uuid::new_v4().simple()
    ));

    let mut config = AppConfig::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 3000;
    config.database = DatabaseConfig {
        url: format!("sqlite://{}?mode=rwc", db_path.display()),
        max_connections: 1,
        connect_timeout_secs: 30,
    };
    config.auth.signing_key = fixtures::SIGNING_KEY.to_string();
    config.auth.encryption_key = fixtures::ENCRYPTION_KEY_HEX.to_string();
    config.auth.webhook_secret = fixtures::WEBHOOK_SECRET.to_string();
    config.auth.password_min_length = 8;
    config.shopify.api_key = fixtures::SHOPIFY_API_KEY.to_string();
    config.shopify.api_secret = fixtures::SHOPIFY_API_SECRET.to_string();
    config.shopify.app_url = "https://app.example.test".to_string();
    config.search.url = "http://search.example.test:7700".to_string();
    config.search.api_key = fixtures::SEARCH_API_KEY.to_string();
    config
}

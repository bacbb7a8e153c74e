//! Platform token exchange
//!
//! The OAuth installer only depends on [`AccessTokenExchange`]; the reqwest
//! client here is the production implementation.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::AuthError;
use crate::config::ShopifyConfig;

/// Access token granted for a shop
#[derive(Clone, Deserialize)]
pub struct AccessTokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub scope: String,
}

impl std::fmt::Debug for AccessTokenGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessTokenGrant")
            .field("access_token", &"<redacted>")
            .field("scope", &self.scope)
            .finish()
    }
}

/// Exchanges an OAuth authorization code for a shop access token
#[async_trait]
pub trait AccessTokenExchange: Send + Sync {
    async fn exchange_code(&self, shop: &str, code: &str) -> Result<AccessTokenGrant, AuthError>;
}

#[derive(Serialize)]
struct AccessTokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    code: &'a str,
}

pub struct ShopifyClient {
    client: reqwest::Client,
    api_key: String,
    api_secret: String,
    /// Replaces `https://{shop}` when set
    base_url: Option<String>,
}

impl ShopifyClient {
    pub fn new(config: &ShopifyConfig) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AuthError::ConfigurationFatal(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            base_url: None,
        })
    }

    /// Send every request to `base_url` instead of the shop's own host
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into().trim_end_matches('/').to_string());
        self
    }

    fn token_url(&self, shop: &str) -> String {
        match &self.base_url {
            Some(base) => format!("{}/admin/oauth/access_token", base),
            None => format!("https://{}/admin/oauth/access_token", shop),
        }
    }
}

#[async_trait]
impl AccessTokenExchange for ShopifyClient {
    async fn exchange_code(&self, shop: &str, code: &str) -> Result<AccessTokenGrant, AuthError> {
        let body = AccessTokenRequest {
            client_id: &self.api_key,
            client_secret: &self.api_secret,
            code,
        };

        let response = self
            .client
            .post(self.token_url(shop))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!(shop = %shop, error = %e, "Token exchange request failed");
                if e.is_timeout() {
                    AuthError::Timeout("token exchange".to_string())
                } else {
                    AuthError::Upstream("token exchange request failed".to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(shop = %shop, status = %status, "Token exchange rejected");
            return Err(AuthError::Upstream(format!("token exchange returned {}", status)));
        }

        let grant: AccessTokenGrant = response
            .json()
            .await
            .map_err(|_| AuthError::Upstream("invalid token exchange response".to_string()))?;

        if grant.access_token.is_empty() {
            return Err(AuthError::Upstream("empty access token".to_string()));
        }

        debug!(shop = %shop, scope = %grant.scope, "Access token obtained");
        Ok(grant)
    }
}

//! API key lifecycle
//!
//! Keys are 32 random bytes, hex encoded. Only the SHA-256 digest is stored;
//! the raw value is returned once by [`ApiKeyService::generate`] and cannot be
//! recovered afterwards.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::AuthError;
use crate::config::AuthConfig;
use crate::db::TenantStore;
use crate::models::{
    ApiKey, ApiKeyPublic, ApiKeyStatus, GenerateApiKeyRequest, GeneratedApiKey, TenantCredential,
};
use crate::utils::validation::validate_permissions;

/// Random bytes per key
pub const KEY_BYTES: usize = 32;

/// Length of the non-secret display prefix
pub const PREFIX_LEN: usize = 8;

/// Generate a raw API key
pub fn generate_raw_key() -> String {
    let mut bytes = [0u8; KEY_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// One-way digest stored in place of the raw key
pub fn hash_api_key(raw_key: &str) -> String {
    hex::encode(Sha256::digest(raw_key.as_bytes()))
}

/// A successfully resolved key and its owning tenant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedApiKey {
    pub client_id: Uuid,
    pub client_name: String,
    pub key_id: Uuid,
    pub permissions: Vec<String>,
}

impl From<ResolvedApiKey> for TenantCredential {
    fn from(key: ResolvedApiKey) -> Self {
        TenantCredential::ApiKey {
            client_id: key.client_id,
            client_name: key.client_name,
            key_id: key.key_id,
            permissions: key.permissions,
        }
    }
}

pub struct ApiKeyService {
    tenants: Arc<dyn TenantStore>,
    lookup_timeout: Duration,
    touch_timeout: Duration,
}

impl ApiKeyService {
    pub fn new(tenants: Arc<dyn TenantStore>, lookup_timeout: Duration, touch_timeout: Duration) -> Self {
        Self {
            tenants,
            lookup_timeout,
            touch_timeout,
        }
    }

    pub fn from_config(tenants: Arc<dyn TenantStore>, config: &AuthConfig) -> Self {
        Self::new(
            tenants,
            Duration::from_millis(config.api_key_lookup_timeout_ms),
            Duration::from_millis(config.last_used_update_timeout_ms),
        )
    }

    /// Create a key for `client_id` and return the raw value exactly once
    ///
    /// Label uniqueness is enforced by the store's unique index.
    pub async fn generate(
        &self,
        client_id: Uuid,
        req: &GenerateApiKeyRequest,
    ) -> Result<GeneratedApiKey, AuthError> {
        let name = req.name.trim();
        if name.is_empty() {
            return Err(AuthError::InvalidInput("API key name is required".to_string()));
        }
        if !validate_permissions(&req.permissions) {
            return Err(AuthError::InvalidInput(
                "permissions may only contain \"read\" and \"write\"".to_string(),
            ));
        }
        let now = Utc::now();
        if req.expires_at.is_some_and(|exp| exp <= now) {
            return Err(AuthError::InvalidInput("expires_at must be in the future".to_string()));
        }

        let raw_key = generate_raw_key();
        let key = ApiKey {
            id: Uuid::new_v4(),
            client_id,
            key_hash: hash_api_key(&raw_key),
            name: name.to_string(),
            key_prefix: raw_key[..PREFIX_LEN].to_string(),
            permissions: req.permissions.clone(),
            is_active: true,
            last_used_at: None,
            created_at: now,
            expires_at: req.expires_at,
        };

        self.tenants.insert_api_key(&key).await?;

        info!(
            client_id = %client_id,
            key_id = %key.id,
            prefix = %key.key_prefix,
            "API key generated"
        );

        Ok(GeneratedApiKey {
            api_key: ApiKeyPublic::from(key),
            key: raw_key,
        })
    }

    /// Resolve a presented raw key to its tenant
    pub async fn resolve(&self, raw_key: &str) -> Result<ResolvedApiKey, AuthError> {
        self.resolve_at(raw_key, Utc::now()).await
    }

    pub async fn resolve_at(
        &self,
        raw_key: &str,
        now: DateTime<Utc>,
    ) -> Result<ResolvedApiKey, AuthError> {
        let raw_key = raw_key.trim();
        if raw_key.is_empty() {
            return Err(AuthError::MissingCredential);
        }

        let digest = hash_api_key(raw_key);
        let lookup = tokio::time::timeout(self.lookup_timeout, self.tenants.find_api_key_by_hash(&digest))
            .await
            .map_err(|_| AuthError::Timeout("API key lookup".to_string()))??
            .ok_or(AuthError::InvalidCredential)?;

        match lookup.key.status_at(now) {
            ApiKeyStatus::Revoked => return Err(AuthError::RevokedCredential),
            ApiKeyStatus::Expired => return Err(AuthError::ExpiredCredential),
            ApiKeyStatus::Active => {}
        }
        if !lookup.client_active {
            return Err(AuthError::InvalidCredential);
        }

        self.touch_in_background(lookup.key.id, now);

        Ok(ResolvedApiKey {
            client_id: lookup.client_id,
            client_name: lookup.client_name,
            key_id: lookup.key.id,
            permissions: lookup.key.permissions,
        })
    }

    /// Record last use without blocking or failing the request
    fn touch_in_background(&self, key_id: Uuid, at: DateTime<Utc>) {
        let tenants = Arc::clone(&self.tenants);
        let timeout = self.touch_timeout;

        tokio::spawn(async move {
            match tokio::time::timeout(timeout, tenants.touch_api_key(key_id, at)).await {
                Ok(Ok(())) => debug!(key_id = %key_id, "API key last-used updated"),
                Ok(Err(e)) => warn!(key_id = %key_id, error = %e, "Failed to update API key last-used"),
                Err(_) => warn!(key_id = %key_id, "Timed out updating API key last-used"),
            }
        });
    }

    /// Revoke a key; revoking an already revoked key succeeds
    pub async fn revoke(&self, client_id: Uuid, key_id: Uuid) -> Result<(), AuthError> {
        if !self.tenants.revoke_api_key(client_id, key_id).await? {
            return Err(AuthError::NotFound("API key".to_string()));
        }

        info!(client_id = %client_id, key_id = %key_id, "API key revoked");
        Ok(())
    }

    /// List a tenant's keys without digests
    pub async fn list(&self, client_id: Uuid) -> Result<Vec<ApiKeyPublic>, AuthError> {
        let client = self
            .tenants
            .find_client_by_id(client_id)
            .await?
            .ok_or_else(|| AuthError::NotFound("Client".to_string()))?;

        Ok(client.api_keys.into_iter().map(ApiKeyPublic::from).collect())
    }
}

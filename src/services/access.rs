//! Tenant access control
//!
//! Binds a verified identity to the tenant or store it is acting on. A
//! missing tenant is `NotFound`; an existing tenant the identity may not touch
//! is `AuthorizationDenied`. The two are never substituted for each other.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;
use uuid::Uuid;

use super::AuthError;
use crate::db::TenantStore;
use crate::models::{Access, Client, TenantCredential, VerifiedIdentity, PERMISSION_WRITE};

/// Whether an API key's permission tags allow `access`
///
/// An empty tag list grants full access; "write" implies "read".
pub fn permits(permissions: &[String], access: Access) -> bool {
    permissions.is_empty()
        || permissions
            .iter()
            .any(|p| p == access.permission_tag() || p == PERMISSION_WRITE)
}

pub struct AccessControl {
    tenants: Arc<dyn TenantStore>,
    lookup_timeout: Duration,
}

impl AccessControl {
    pub fn new(tenants: Arc<dyn TenantStore>, lookup_timeout: Duration) -> Self {
        Self {
            tenants,
            lookup_timeout,
        }
    }

    async fn load_client(&self, client_id: Uuid) -> Result<Client, AuthError> {
        tokio::time::timeout(self.lookup_timeout, self.tenants.find_client_by_id(client_id))
            .await
            .map_err(|_| AuthError::Timeout("tenant lookup".to_string()))??
            .filter(|c| c.is_active)
            .ok_or_else(|| AuthError::NotFound("Client".to_string()))
    }

    /// Load an active tenant and check `user_id` is one of its members
    pub async fn verify_membership(&self, client_id: Uuid, user_id: Uuid) -> Result<Client, AuthError> {
        let client = self.load_client(client_id).await?;
        if !client.has_member(user_id) {
            warn!(client_id = %client_id, user_id = %user_id, "Tenant access denied: not a member");
            return Err(AuthError::AuthorizationDenied(
                "not a member of this client".to_string(),
            ));
        }
        Ok(client)
    }

    /// Authorize `identity` for `access` on tenant `client_id`
    pub async fn authorize_client(
        &self,
        identity: &VerifiedIdentity,
        client_id: Uuid,
        access: Access,
    ) -> Result<Client, AuthError> {
        match identity {
            VerifiedIdentity::User(user) => self.verify_membership(client_id, user.user_id).await,
            VerifiedIdentity::Tenant(TenantCredential::ApiKey {
                client_id: key_client,
                key_id,
                permissions,
                ..
            }) => {
                let client = self.load_client(client_id).await?;
                if *key_client != client.id {
                    warn!(client_id = %client_id, key_id = %key_id, "Tenant access denied: key belongs to another client");
                    return Err(AuthError::AuthorizationDenied(
                        "API key is not valid for this client".to_string(),
                    ));
                }
                if !permits(permissions, access) {
                    return Err(AuthError::AuthorizationDenied(format!(
                        "API key lacks {} permission",
                        access.permission_tag()
                    )));
                }
                Ok(client)
            }
            VerifiedIdentity::Tenant(_) => Err(AuthError::AuthorizationDenied(
                "credential cannot act on clients".to_string(),
            )),
        }
    }

    /// Authorize `identity` for `access` on the tenant named in the URL
    pub async fn authorize_client_by_name(
        &self,
        identity: &VerifiedIdentity,
        client_name: &str,
        access: Access,
    ) -> Result<Client, AuthError> {
        let client_id = tokio::time::timeout(self.lookup_timeout, self.tenants.find_client_by_name(client_name))
            .await
            .map_err(|_| AuthError::Timeout("tenant lookup".to_string()))??
            .map(|c| c.id)
            .ok_or_else(|| AuthError::NotFound("Client".to_string()))?;

        self.authorize_client(identity, client_id, access).await
    }

    /// Authorize `identity` for `access` on merchant store `store_id`
    ///
    /// Storefront identities are read-only.
    pub fn authorize_store(
        &self,
        identity: &VerifiedIdentity,
        store_id: Uuid,
        access: Access,
    ) -> Result<(), AuthError> {
        let allowed = match identity {
            VerifiedIdentity::Tenant(TenantCredential::StoreSession { store_id: id, .. }) => {
                *id == store_id
            }
            VerifiedIdentity::Tenant(TenantCredential::Storefront { store_id: id, .. }) => {
                *id == store_id && access == Access::Read
            }
            VerifiedIdentity::Tenant(TenantCredential::Webhook {
                store_id: Some(id), ..
            }) => *id == store_id,
            _ => false,
        };

        if allowed {
            Ok(())
        } else {
            Err(AuthError::AuthorizationDenied(
                "credential cannot act on this store".to_string(),
            ))
        }
    }
}

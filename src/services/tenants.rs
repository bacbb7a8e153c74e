//! Tenant management
//!
//! Every operation re-derives authorization from the caller's verified
//! identity through [`AccessControl`]; a tenant id from a URL is never
//! trusted on its own.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use super::{AccessControl, AccountService, ApiKeyService, AuthError};
use crate::db::TenantStore;
use crate::models::{
    Access, ApiKeyPublic, Client, CreateClientRequest, GenerateApiKeyRequest, GeneratedApiKey,
    UserIdentity, VerifiedIdentity,
};
use crate::utils::validation::validate_client_name;

pub struct TenantService {
    tenants: Arc<dyn TenantStore>,
    accounts: Arc<AccountService>,
    access: Arc<AccessControl>,
    api_keys: Arc<ApiKeyService>,
}

fn require_user(identity: &VerifiedIdentity) -> Result<&UserIdentity, AuthError> {
    identity.as_user().ok_or_else(|| {
        AuthError::AuthorizationDenied("operation requires a user session".to_string())
    })
}

impl TenantService {
    pub fn new(
        tenants: Arc<dyn TenantStore>,
        accounts: Arc<AccountService>,
        access: Arc<AccessControl>,
        api_keys: Arc<ApiKeyService>,
    ) -> Self {
        Self {
            tenants,
            accounts,
            access,
            api_keys,
        }
    }

    /// Create a tenant with the caller as its sole member
    pub async fn create(
        &self,
        identity: &VerifiedIdentity,
        req: &CreateClientRequest,
    ) -> Result<Client, AuthError> {
        let user = require_user(identity)?;
        let name = req.name.trim();
        if !validate_client_name(name) {
            return Err(AuthError::InvalidInput(
                "client name must start with a letter and contain only letters, digits, '-' or '_'"
                    .to_string(),
            ));
        }

        let description = req
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);
        let client = Client::new(name.to_string(), description, user.user_id);
        self.tenants.create_client(&client).await?;

        info!(client_id = %client.id, user_id = %user.user_id, "Client created");
        Ok(client)
    }

    /// Active tenants the calling user belongs to
    pub async fn list(&self, identity: &VerifiedIdentity) -> Result<Vec<Client>, AuthError> {
        let user = require_user(identity)?;
        Ok(self.tenants.list_clients_for_user(user.user_id).await?)
    }

    pub async fn get(&self, identity: &VerifiedIdentity, client_id: Uuid) -> Result<Client, AuthError> {
        self.access.authorize_client(identity, client_id, Access::Read).await
    }

    /// Add an existing user to a tenant; adding a current member is a no-op
    pub async fn add_member(
        &self,
        identity: &VerifiedIdentity,
        client_id: Uuid,
        email: &str,
    ) -> Result<Client, AuthError> {
        require_user(identity)?;
        self.access
            .authorize_client(identity, client_id, Access::Write)
            .await?;

        let member = self.accounts.find_active_by_email(email).await?;
        self.tenants.add_member(client_id, member.id).await?;
        info!(client_id = %client_id, user_id = %member.id, "Client member added");

        self.tenants
            .find_client_by_id(client_id)
            .await?
            .ok_or_else(|| AuthError::NotFound("Client".to_string()))
    }

    pub async fn generate_api_key(
        &self,
        identity: &VerifiedIdentity,
        client_id: Uuid,
        req: &GenerateApiKeyRequest,
    ) -> Result<GeneratedApiKey, AuthError> {
        require_user(identity)?;
        let client = self
            .access
            .authorize_client(identity, client_id, Access::Write)
            .await?;
        self.api_keys.generate(client.id, req).await
    }

    pub async fn list_api_keys(
        &self,
        identity: &VerifiedIdentity,
        client_id: Uuid,
    ) -> Result<Vec<ApiKeyPublic>, AuthError> {
        require_user(identity)?;
        let client = self
            .access
            .authorize_client(identity, client_id, Access::Read)
            .await?;
        Ok(client.api_keys.into_iter().map(ApiKeyPublic::from).collect())
    }

    pub async fn revoke_api_key(
        &self,
        identity: &VerifiedIdentity,
        client_id: Uuid,
        key_id: Uuid,
    ) -> Result<(), AuthError> {
        require_user(identity)?;
        let client = self
            .access
            .authorize_client(identity, client_id, Access::Write)
            .await?;
        self.api_keys.revoke(client.id, key_id).await
    }

    /// Tenant an API key may act on, named in the URL
    pub async fn scope(
        &self,
        identity: &VerifiedIdentity,
        client_name: &str,
    ) -> Result<Client, AuthError> {
        self.access
            .authorize_client_by_name(identity, client_name, Access::Read)
            .await
    }
}

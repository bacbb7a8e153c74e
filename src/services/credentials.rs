//! Credential verification
//!
//! [`Authenticator::verify`] is the single entry point that turns whatever a
//! request presented into a [`VerifiedIdentity`]. Each credential scheme has
//! exactly one verifier; nothing falls through from one scheme to another.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::{ApiKeyService, AuthError, SignatureVerifier, StorefrontResolver, TokenService};
use crate::db::{MerchantStore, UserStore};
use crate::models::{
    normalize_shop_domain, Credential, Store, TenantCredential, UserIdentity, VerifiedIdentity,
};

pub struct Authenticator {
    tokens: Arc<TokenService>,
    users: Arc<dyn UserStore>,
    api_keys: Arc<ApiKeyService>,
    storefront: Arc<StorefrontResolver>,
    signatures: Arc<SignatureVerifier>,
    stores: Arc<dyn MerchantStore>,
    lookup_timeout: Duration,
}

impl Authenticator {
    pub fn new(
        tokens: Arc<TokenService>,
        users: Arc<dyn UserStore>,
        api_keys: Arc<ApiKeyService>,
        storefront: Arc<StorefrontResolver>,
        signatures: Arc<SignatureVerifier>,
        stores: Arc<dyn MerchantStore>,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            tokens,
            users,
            api_keys,
            storefront,
            signatures,
            stores,
            lookup_timeout,
        }
    }

    pub async fn verify(&self, credential: Credential<'_>) -> Result<VerifiedIdentity, AuthError> {
        let scheme = credential.scheme();
        let result = match credential {
            Credential::UserToken(token) => self.verify_user_token(token).await,
            Credential::StoreToken(token) => self.verify_store_token(token).await,
            Credential::ApiKey(raw) => self
                .api_keys
                .resolve(raw)
                .await
                .map(|key| VerifiedIdentity::Tenant(key.into())),
            Credential::StorefrontKey(key) => {
                self.storefront.resolve(key).await.map(VerifiedIdentity::Tenant)
            }
            Credential::WebhookSignature {
                shop,
                signature,
                body,
            } => self.verify_webhook(shop, signature, body).await,
        };

        match &result {
            Ok(identity) => debug!(scheme, identity = %identity.describe(), "Credential verified"),
            Err(e) => debug!(scheme, error = %e, "Credential rejected"),
        }
        result
    }

    async fn find_store_by_shop(&self, shop: &str) -> Result<Option<Store>, AuthError> {
        tokio::time::timeout(self.lookup_timeout, self.stores.find_store_by_shop(shop))
            .await
            .map_err(|_| AuthError::Timeout("store lookup".to_string()))?
            .map_err(AuthError::from)
    }

    /// A user token only resolves while its account is still active
    async fn verify_user_token(&self, token: &str) -> Result<VerifiedIdentity, AuthError> {
        let user = self.tokens.verify_user_session(token)?;

        let account = tokio::time::timeout(self.lookup_timeout, self.users.find_user_by_id(user.user_id))
            .await
            .map_err(|_| AuthError::Timeout("user lookup".to_string()))??;

        match account {
            Some(account) if account.is_active => Ok(VerifiedIdentity::User(UserIdentity {
                user_id: user.user_id,
                email: account.email,
            })),
            _ => Err(AuthError::InvalidCredential),
        }
    }

    /// A store token only resolves while its store is still installed
    async fn verify_store_token(&self, token: &str) -> Result<VerifiedIdentity, AuthError> {
        let (store_id, shop) = self.tokens.verify_store_session(token)?;

        let store = tokio::time::timeout(self.lookup_timeout, self.stores.find_store_by_id(store_id))
            .await
            .map_err(|_| AuthError::Timeout("store lookup".to_string()))??;

        match store {
            Some(store) if store.is_active() && store.shop_domain == shop => Ok(VerifiedIdentity::Tenant(
                TenantCredential::StoreSession { store_id, shop },
            )),
            _ => Err(AuthError::InvalidCredential),
        }
    }

    async fn verify_webhook(
        &self,
        shop: &str,
        signature: &str,
        body: &[u8],
    ) -> Result<VerifiedIdentity, AuthError> {
        let shop = normalize_shop_domain(shop)
            .ok_or_else(|| AuthError::MalformedCredential("invalid shop domain".to_string()))?;

        let store = match self.find_store_by_shop(&shop).await {
            Ok(store) => store,
            Err(e) => {
                warn!(shop = %shop, error = %e, "Store lookup failed during webhook verification");
                None
            }
        };

        self.signatures
            .verify_webhook(body, signature, store.as_ref().map(|s| s.webhook_secret.as_str()))?;

        Ok(VerifiedIdentity::Tenant(TenantCredential::Webhook {
            store_id: store.map(|s| s.id),
            shop,
        }))
    }
}

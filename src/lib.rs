//! mgsearch library
//!
//! Credential verification and tenant isolation for a multi-tenant search
//! backend: user accounts, tenants with API keys, merchant stores installed
//! through the platform OAuth flow, storefront keys and signed webhooks.

use std::sync::Arc;
use std::time::Duration;

pub mod api;
pub mod config;
pub mod db;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

pub use config::AppConfig;
pub use db::DbPool;
pub use middleware::Identity;
pub use services::AuthError;

use db::{MerchantStore, SessionRepository, StoreRepository, TenantRepository, UserRepository};
use services::{
    AccessControl, AccessTokenExchange, AccountService, ApiKeyService, Authenticator,
    OAuthInstaller, SessionService, ShopifyClient, SignatureVerifier, StorefrontResolver,
    TenantService, TokenService, TokenVault,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: DbPool,
    pub tokens: Arc<TokenService>,
    pub authenticator: Arc<Authenticator>,
    pub accounts: Arc<AccountService>,
    pub tenants: Arc<TenantService>,
    pub access: Arc<AccessControl>,
    pub oauth: Arc<OAuthInstaller>,
    pub sessions: Arc<SessionService>,
    pub stores: Arc<dyn MerchantStore>,
}

impl AppState {
    /// Wire every service against `db`, using the real platform client
    pub fn new(config: AppConfig, db: DbPool) -> Result<Self, AuthError> {
        let exchange = Arc::new(ShopifyClient::new(&config.shopify)?);
        Self::with_exchange(config, db, exchange)
    }

    /// Wire every service with a caller-supplied token exchange
    pub fn with_exchange(
        config: AppConfig,
        db: DbPool,
        exchange: Arc<dyn AccessTokenExchange>,
    ) -> Result<Self, AuthError> {
        config.validate()?;

        let lookup_timeout = Duration::from_millis(config.auth.api_key_lookup_timeout_ms);

        let users = Arc::new(UserRepository::new(db.clone()));
        let tenant_store = Arc::new(TenantRepository::new(db.clone()));
        let stores: Arc<dyn MerchantStore> = Arc::new(StoreRepository::new(db.clone()));
        let session_store = Arc::new(SessionRepository::new(db.clone()));

        let tokens = Arc::new(TokenService::from_config(&config.auth)?);
        let vault = Arc::new(TokenVault::new(&config.auth.encryption_key_bytes()?)?);
        let signatures = Arc::new(SignatureVerifier::new(
            &config.shopify.api_secret,
            &config.auth.webhook_secret,
        )?);

        let api_keys = Arc::new(ApiKeyService::from_config(tenant_store.clone(), &config.auth));
        let storefront = Arc::new(StorefrontResolver::new(stores.clone(), lookup_timeout));
        let access = Arc::new(AccessControl::new(tenant_store.clone(), lookup_timeout));
        let accounts = Arc::new(AccountService::new(
            users.clone(),
            tokens.clone(),
            config.auth.password_min_length,
        ));
        let tenants = Arc::new(TenantService::new(
            tenant_store,
            accounts.clone(),
            access.clone(),
            api_keys.clone(),
        ));
        let authenticator = Arc::new(Authenticator::new(
            tokens.clone(),
            users,
            api_keys,
            storefront,
            signatures.clone(),
            stores.clone(),
            lookup_timeout,
        ));
        let oauth = Arc::new(OAuthInstaller::new(
            config.shopify.clone(),
            config.search.clone(),
            tokens.clone(),
            vault.clone(),
            signatures,
            stores.clone(),
            exchange,
            lookup_timeout,
        ));
        let sessions = Arc::new(SessionService::new(session_store, vault));

        Ok(Self {
            config,
            db,
            tokens,
            authenticator,
            accounts,
            tenants,
            access,
            oauth,
            sessions,
            stores,
        })
    }
}

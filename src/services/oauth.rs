//! OAuth installation flow
//!
//! `begin` hands the merchant a platform authorize URL carrying a short-lived
//! state token bound to the shop. `callback` accepts the redirect only after
//! the query signature and the state binding both check out.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use rand::{rngs::OsRng, RngCore};
use tracing::{info, warn};
use uuid::Uuid;

use super::storefront::generate_storefront_key;
use super::{AccessTokenExchange, AuthError, SignatureVerifier, TokenKind, TokenService, TokenVault};
use crate::config::{SearchConfig, ShopifyConfig};
use crate::db::MerchantStore;
use crate::models::{
    index_uid_for_shop, normalize_shop_domain, shop_name_from_domain, InstallRedirect,
    InstallResponse, SearchCredentials, Store, StoreInstall, StorePublic,
};

/// Random bytes per generated webhook secret
pub const WEBHOOK_SECRET_BYTES: usize = 32;

fn generate_webhook_secret() -> String {
    let mut bytes = [0u8; WEBHOOK_SECRET_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn required_param<'a>(params: &'a BTreeMap<String, String>, name: &str) -> Result<&'a str, AuthError> {
    params
        .get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AuthError::InvalidInput(format!("missing {} parameter", name)))
}

pub struct OAuthInstaller {
    shopify: ShopifyConfig,
    search: SearchConfig,
    tokens: Arc<TokenService>,
    vault: Arc<TokenVault>,
    signatures: Arc<SignatureVerifier>,
    stores: Arc<dyn MerchantStore>,
    exchange: Arc<dyn AccessTokenExchange>,
    lookup_timeout: Duration,
}

impl OAuthInstaller {
    pub fn new(
        shopify: ShopifyConfig,
        search: SearchConfig,
        tokens: Arc<TokenService>,
        vault: Arc<TokenVault>,
        signatures: Arc<SignatureVerifier>,
        stores: Arc<dyn MerchantStore>,
        exchange: Arc<dyn AccessTokenExchange>,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            shopify,
            search,
            tokens,
            vault,
            signatures,
            stores,
            exchange,
            lookup_timeout,
        }
    }

    /// Start an install for `shop`
    pub fn begin(&self, shop: &str, redirect_uri: Option<&str>) -> Result<InstallRedirect, AuthError> {
        let shop = normalize_shop_domain(shop)
            .ok_or_else(|| AuthError::InvalidInput("invalid shop domain".to_string()))?;

        let redirect_uri = match redirect_uri.map(str::trim).filter(|r| !r.is_empty()) {
            Some(uri) => uri.to_string(),
            None => self.shopify.default_redirect_uri(),
        };

        let state = self.tokens.issue_oauth_state(&shop)?;

        let authorize_url = format!(
            "https://{}/admin/oauth/authorize?client_id={}&scope={}&redirect_uri={}&state={}&grant_options[]=per-user",
            shop,
            urlencoding::encode(&self.shopify.api_key),
            urlencoding::encode(&self.shopify.scopes),
            urlencoding::encode(&redirect_uri),
            urlencoding::encode(&state),
        );

        info!(shop = %shop, "OAuth install started");
        Ok(InstallRedirect { authorize_url, state })
    }

    /// Complete an install from the redirect query parameters
    pub async fn callback(&self, params: &BTreeMap<String, String>) -> Result<InstallResponse, AuthError> {
        self.signatures.verify_oauth_callback(params).inspect_err(|e| {
            warn!(error = %e, "OAuth callback signature rejected");
        })?;

        let shop = normalize_shop_domain(required_param(params, "shop")?)
            .ok_or_else(|| AuthError::InvalidInput("invalid shop domain".to_string()))?;
        let code = required_param(params, "code")?;
        let state = required_param(params, "state")?;

        self.tokens.validate_oauth_state(state, &shop).inspect_err(|e| {
            warn!(shop = %shop, error = %e, "OAuth state rejected");
        })?;

        let grant = self.exchange.exchange_code(&shop, code).await?;

        let index_uid = index_uid_for_shop(&shop);
        let install = StoreInstall {
            shop_name: shop_name_from_domain(&shop),
            encrypted_access_token: self.vault.encrypt_str(&grant.access_token)?,
            storefront_key: generate_storefront_key(),
            encrypted_search_api_key: self.vault.encrypt_str(&self.search.api_key)?,
            search_url: self.search.url.clone(),
            vector_collection: index_uid.clone(),
            index_uid,
            webhook_secret: generate_webhook_secret(),
            shop_domain: shop,
        };

        let store = self.stores.upsert_store(&install).await?;
        let token = self.tokens.issue_store_session(store.id, &store.shop_domain)?;

        info!(shop = %store.shop_domain, store_id = %store.id, "Store installed");

        Ok(InstallResponse {
            token,
            token_type: "Bearer".to_string(),
            expires_in: self.tokens.ttl_for(TokenKind::StoreSession).num_seconds(),
            store: StorePublic::from(&store),
        })
    }

    /// Load an installed store by id
    pub async fn store(&self, store_id: Uuid) -> Result<Store, AuthError> {
        tokio::time::timeout(self.lookup_timeout, self.stores.find_store_by_id(store_id))
            .await
            .map_err(|_| AuthError::Timeout("store lookup".to_string()))??
            .filter(Store::is_active)
            .ok_or_else(|| AuthError::NotFound("store".to_string()))
    }

    /// Decrypt the search-engine access of a store
    pub async fn search_credentials(&self, store_id: Uuid) -> Result<SearchCredentials, AuthError> {
        let store = self.store(store_id).await?;
        Ok(SearchCredentials {
            api_key: self.vault.decrypt_string(&store.encrypted_search_api_key)?,
            search_url: store.search_url,
            index_uid: store.index_uid,
            vector_collection: store.vector_collection,
        })
    }

    /// Decrypt the platform access token of a store
    pub async fn access_token(&self, store_id: Uuid) -> Result<String, AuthError> {
        let store = self.store(store_id).await?;
        self.vault.decrypt_string(&store.encrypted_access_token)
    }
}

//! Merchant store model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Suffix every installable shop domain must carry
pub const SHOP_DOMAIN_SUFFIX: &str = ".myshopify.com";

/// Default document type for indexed products
pub const DEFAULT_DOCUMENT_TYPE: &str = "product";

/// Default plan assigned on install
pub const DEFAULT_PLAN_LEVEL: &str = "free";

/// Store lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreStatus {
    Active,
    Inactive,
    Uninstalled,
}

impl StoreStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreStatus::Active => "active",
            StoreStatus::Inactive => "inactive",
            StoreStatus::Uninstalled => "uninstalled",
        }
    }

    /// Unknown values are treated as inactive
    pub fn parse(s: &str) -> Self {
        match s {
            "active" => StoreStatus::Active,
            "uninstalled" => StoreStatus::Uninstalled,
            _ => StoreStatus::Inactive,
        }
    }
}

/// Merchant store onboarded through the OAuth install flow
///
/// The upstream access token and the search-engine key are only ever held as
/// vault-sealed blobs; the storefront key is plaintext and non-secret.
#[derive(Debug, Clone)]
pub struct Store {
    pub id: Uuid,
    pub shop_domain: String,
    pub shop_name: String,
    pub encrypted_access_token: Vec<u8>,
    pub storefront_key: String,
    pub encrypted_search_api_key: Vec<u8>,
    pub search_url: String,
    pub index_uid: String,
    pub vector_collection: String,
    pub document_type: String,
    pub plan_level: String,
    pub status: StoreStatus,
    pub webhook_secret: String,
    pub installed_at: DateTime<Utc>,
    pub uninstalled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Store {
    pub fn is_active(&self) -> bool {
        self.status == StoreStatus::Active
    }
}

/// Store fields written on install or reinstall
#[derive(Debug, Clone)]
pub struct StoreInstall {
    pub shop_domain: String,
    pub shop_name: String,
    pub encrypted_access_token: Vec<u8>,
    /// Used only when the shop has no storefront key yet
    pub storefront_key: String,
    pub encrypted_search_api_key: Vec<u8>,
    pub search_url: String,
    pub index_uid: String,
    pub vector_collection: String,
    pub webhook_secret: String,
}

/// Dashboard-facing store view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorePublic {
    pub id: Uuid,
    pub shop_domain: String,
    pub shop_name: String,
    pub plan_level: String,
    pub status: StoreStatus,
    pub index_uid: String,
    pub vector_collection: String,
    pub document_type: String,
    pub search_url: String,
    pub storefront_key: String,
    pub installed_at: DateTime<Utc>,
}

impl From<&Store> for StorePublic {
    fn from(store: &Store) -> Self {
        Self {
            id: store.id,
            shop_domain: store.shop_domain.clone(),
            shop_name: store.shop_name.clone(),
            plan_level: store.plan_level.clone(),
            status: store.status,
            index_uid: store.index_uid.clone(),
            vector_collection: store.vector_collection.clone(),
            document_type: store.document_type.clone(),
            search_url: store.search_url.clone(),
            storefront_key: store.storefront_key.clone(),
            installed_at: store.installed_at,
        }
    }
}

/// Redirect target returned when an install begins
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallRedirect {
    pub authorize_url: String,
    pub state: String,
}

/// Result of a completed install
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub store: StorePublic,
}

/// Decrypted search-engine access for the owning store only
#[derive(Clone, Serialize, Deserialize)]
pub struct SearchCredentials {
    pub search_url: String,
    pub api_key: String,
    pub index_uid: String,
    pub vector_collection: String,
}

impl std::fmt::Debug for SearchCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchCredentials")
            .field("search_url", &self.search_url)
            .field("api_key", &"<redacted>")
            .field("index_uid", &self.index_uid)
            .finish_non_exhaustive()
    }
}

/// Normalize a shop domain and check it belongs to the platform
///
/// The shop must be a single label directly under the platform suffix, so
/// each shop maps to exactly one index uid.
pub fn normalize_shop_domain(shop: &str) -> Option<String> {
    let shop = shop.trim().to_lowercase();
    let label = shop.strip_suffix(SHOP_DOMAIN_SUFFIX)?;
    if label.is_empty()
        || !label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return None;
    }
    Some(shop)
}

/// Index identifier for a shop: first label, dashes to underscores
pub fn index_uid_for_shop(shop_domain: &str) -> String {
    let label = shop_domain.split('.').next().unwrap_or(shop_domain);
    format!("{}_all_products", label.replace('-', "_"))
}

/// Display name derived from the shop's first label
pub fn shop_name_from_domain(shop_domain: &str) -> String {
    let label = shop_domain.split('.').next().unwrap_or(shop_domain);
    label.replace('-', " ")
}

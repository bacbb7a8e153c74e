//! Storefront key resolver
//!
//! Storefront keys are public, non-expiring and read-only. Every failure
//! (unknown key, inactive or uninstalled store, lookup error) collapses into
//! the same `InvalidCredential` so the response never says which it was.

use std::sync::Arc;
use std::time::Duration;

use rand::{rngs::OsRng, RngCore};
use tracing::warn;

use super::AuthError;
use crate::db::MerchantStore;
use crate::models::TenantCredential;

/// Random bytes per storefront key
pub const STOREFRONT_KEY_BYTES: usize = 16;

/// Generate a new storefront key
pub fn generate_storefront_key() -> String {
    let mut bytes = [0u8; STOREFRONT_KEY_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub struct StorefrontResolver {
    stores: Arc<dyn MerchantStore>,
    lookup_timeout: Duration,
}

impl StorefrontResolver {
    pub fn new(stores: Arc<dyn MerchantStore>, lookup_timeout: Duration) -> Self {
        Self {
            stores,
            lookup_timeout,
        }
    }

    /// Resolve a storefront key to the read-only scope of its store
    pub async fn resolve(&self, key: &str) -> Result<TenantCredential, AuthError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(AuthError::MissingCredential);
        }

        let lookup = tokio::time::timeout(self.lookup_timeout, self.stores.find_store_by_storefront_key(key)).await;

        let store = match lookup {
            Ok(Ok(Some(store))) if store.is_active() => store,
            Ok(Ok(_)) => return Err(AuthError::InvalidCredential),
            Ok(Err(e)) => {
                warn!(error = %e, "Storefront key lookup failed");
                return Err(AuthError::InvalidCredential);
            }
            Err(_) => {
                warn!("Storefront key lookup timed out");
                return Err(AuthError::InvalidCredential);
            }
        };

        Ok(TenantCredential::Storefront {
            store_id: store.id,
            shop: store.shop_domain,
            index_uid: store.index_uid,
            vector_collection: store.vector_collection,
        })
    }
}

//! Credentials and verified identities
//!
//! A request carries exactly one [`Credential`]. Verification turns it into a
//! [`VerifiedIdentity`], which is either a user or a tenant-scoped credential,
//! never both.

use std::fmt;

use serde::Serialize;
use uuid::Uuid;

use super::tenant::{PERMISSION_READ, PERMISSION_WRITE};

/// A credential as presented on the wire, borrowed from the request
#[derive(Clone, Copy)]
pub enum Credential<'a> {
    /// Signed user-session token
    UserToken(&'a str),
    /// Signed store-session token
    StoreToken(&'a str),
    /// Raw API key
    ApiKey(&'a str),
    /// Public storefront key
    StorefrontKey(&'a str),
    /// Webhook delivery: shop domain header, base64 signature header, raw body
    WebhookSignature {
        shop: &'a str,
        signature: &'a str,
        body: &'a [u8],
    },
}

impl Credential<'_> {
    pub fn scheme(&self) -> &'static str {
        match self {
            Credential::UserToken(_) => "user_token",
            Credential::StoreToken(_) => "store_token",
            Credential::ApiKey(_) => "api_key",
            Credential::StorefrontKey(_) => "storefront_key",
            Credential::WebhookSignature { .. } => "webhook_signature",
        }
    }
}

// Credential material must never reach logs.
impl fmt::Debug for Credential<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::WebhookSignature { shop, body, .. } => f
                .debug_struct("WebhookSignature")
                .field("shop", shop)
                .field("body_len", &body.len())
                .finish_non_exhaustive(),
            other => write!(f, "Credential::{}(<redacted>)", other.scheme()),
        }
    }
}

/// Outcome of a successful verification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VerifiedIdentity {
    User(UserIdentity),
    Tenant(TenantCredential),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserIdentity {
    pub user_id: Uuid,
    pub email: String,
}

/// Identity bound to exactly one tenant or store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum TenantCredential {
    ApiKey {
        client_id: Uuid,
        client_name: String,
        key_id: Uuid,
        permissions: Vec<String>,
    },
    StoreSession {
        store_id: Uuid,
        shop: String,
    },
    /// Read-only search scope of one store
    Storefront {
        store_id: Uuid,
        shop: String,
        index_uid: String,
        vector_collection: String,
    },
    /// Verified webhook sender; `store_id` is set when the shop is registered
    Webhook {
        store_id: Option<Uuid>,
        shop: String,
    },
}

/// Kind of access requested on a tenant resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

impl Access {
    pub fn permission_tag(&self) -> &'static str {
        match self {
            Access::Read => PERMISSION_READ,
            Access::Write => PERMISSION_WRITE,
        }
    }
}

impl VerifiedIdentity {
    pub fn as_user(&self) -> Option<&UserIdentity> {
        match self {
            VerifiedIdentity::User(user) => Some(user),
            VerifiedIdentity::Tenant(_) => None,
        }
    }

    pub fn as_tenant(&self) -> Option<&TenantCredential> {
        match self {
            VerifiedIdentity::Tenant(tenant) => Some(tenant),
            VerifiedIdentity::User(_) => None,
        }
    }

    /// Short label for logs
    pub fn describe(&self) -> String {
        match self {
            VerifiedIdentity::User(u) => format!("user:{}", u.user_id),
            VerifiedIdentity::Tenant(TenantCredential::ApiKey { key_id, .. }) => {
                format!("api_key:{}", key_id)
            }
            VerifiedIdentity::Tenant(TenantCredential::StoreSession { store_id, .. }) => {
                format!("store:{}", store_id)
            }
            VerifiedIdentity::Tenant(TenantCredential::Storefront { store_id, .. }) => {
                format!("storefront:{}", store_id)
            }
            VerifiedIdentity::Tenant(TenantCredential::Webhook { shop, .. }) => {
                format!("webhook:{}", shop)
            }
        }
    }
}

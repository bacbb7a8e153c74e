//! Tenant ("client") and API key models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Permission tag granting read access through an API key
pub const PERMISSION_READ: &str = "read";
/// Permission tag granting write access through an API key
pub const PERMISSION_WRITE: &str = "write";

/// Tenant record
///
/// Owns zero or more API keys. Members are user ids; only active users are
/// listed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub member_ids: Vec<Uuid>,
    /// Ordered by creation time
    pub api_keys: Vec<ApiKey>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Client {
    pub fn new(name: String, description: Option<String>, owner: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            description,
            member_ids: vec![owner],
            api_keys: Vec::new(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_member(&self, user_id: Uuid) -> bool {
        self.member_ids.iter().any(|id| *id == user_id)
    }
}

/// Tenant data safe to return to members
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientPublic {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub member_ids: Vec<Uuid>,
    pub api_keys: Vec<ApiKeyPublic>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Client> for ClientPublic {
    fn from(client: Client) -> Self {
        Self {
            id: client.id,
            name: client.name,
            description: client.description,
            member_ids: client.member_ids,
            api_keys: client.api_keys.into_iter().map(ApiKeyPublic::from).collect(),
            is_active: client.is_active,
            created_at: client.created_at,
            updated_at: client.updated_at,
        }
    }
}

/// Stored API key record
///
/// The raw key is never part of this record; only its SHA-256 digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    pub id: Uuid,
    pub client_id: Uuid,
    #[serde(skip_serializing)]
    pub key_hash: String,
    pub name: String,
    pub key_prefix: String,
    pub permissions: Vec<String>,
    pub is_active: bool,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Lifecycle state of an API key at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiKeyStatus {
    Active,
    Expired,
    Revoked,
}

impl ApiKey {
    /// Revocation wins over expiry; a revoked key never comes back.
    pub fn status_at(&self, now: DateTime<Utc>) -> ApiKeyStatus {
        if !self.is_active {
            ApiKeyStatus::Revoked
        } else if self.expires_at.is_some_and(|exp| now >= exp) {
            ApiKeyStatus::Expired
        } else {
            ApiKeyStatus::Active
        }
    }
}

/// API key data without the digest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyPublic {
    pub id: Uuid,
    pub name: String,
    pub key_prefix: String,
    pub permissions: Vec<String>,
    pub is_active: bool,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<ApiKey> for ApiKeyPublic {
    fn from(key: ApiKey) -> Self {
        Self {
            id: key.id,
            name: key.name,
            key_prefix: key.key_prefix,
            permissions: key.permissions,
            is_active: key.is_active,
            last_used_at: key.last_used_at,
            created_at: key.created_at,
            expires_at: key.expires_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateClientRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddMemberRequest {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GenerateApiKeyRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Optional expiry (RFC3339 timestamp)
    pub expires_at: Option<DateTime<Utc>>,
}

/// Returned exactly once, when a key is generated
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedApiKey {
    #[serde(flatten)]
    pub api_key: ApiKeyPublic,
    /// Plaintext API key (only returned on creation)
    pub key: String,
}

//! Platform session model
//!
//! Sessions created by the platform's app libraries on the admin frontend.
//! The wire shape uses camelCase field names to match those libraries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Session as exchanged with the admin frontend (plaintext access token)
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformSession {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub shop: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub is_online: bool,
    #[serde(default)]
    pub scope: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,
    #[serde(default)]
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub account_owner: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for PlatformSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformSession")
            .field("id", &self.id)
            .field("shop", &self.shop)
            .field("is_online", &self.is_online)
            .field("access_token", &"<redacted>")
            .finish_non_exhaustive()
    }
}

/// Session as persisted, with the access token vault-sealed
#[derive(Debug, Clone)]
pub struct SealedSession {
    pub id: String,
    pub shop: String,
    pub state: String,
    pub is_online: bool,
    pub scope: String,
    pub expires: Option<DateTime<Utc>>,
    pub encrypted_access_token: Vec<u8>,
    pub user_id: Option<i64>,
    pub email: Option<String>,
    pub account_owner: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteSessionsRequest {
    #[serde(default)]
    pub ids: Vec<String>,
}

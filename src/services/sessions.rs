//! Platform session storage
//!
//! Access tokens are sealed by the vault before they reach persistence and
//! opened again only on the way out to the gated session endpoints.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use super::{AuthError, TokenVault};
use crate::db::SessionStore;
use crate::models::{PlatformSession, SealedSession};

fn require_field(value: &str, name: &str) -> Result<(), AuthError> {
    if value.trim().is_empty() {
        return Err(AuthError::InvalidInput(format!("missing required field: {}", name)));
    }
    Ok(())
}

pub struct SessionService {
    sessions: Arc<dyn SessionStore>,
    vault: Arc<TokenVault>,
}

impl SessionService {
    pub fn new(sessions: Arc<dyn SessionStore>, vault: Arc<TokenVault>) -> Self {
        Self { sessions, vault }
    }

    fn seal(&self, session: PlatformSession) -> Result<SealedSession, AuthError> {
        let now = Utc::now();
        Ok(SealedSession {
            encrypted_access_token: self.vault.encrypt_str(&session.access_token)?,
            id: session.id,
            shop: session.shop.trim().to_lowercase(),
            state: session.state,
            is_online: session.is_online,
            scope: session.scope,
            expires: session.expires,
            user_id: session.user_id,
            email: session.email,
            account_owner: session.account_owner,
            created_at: session.created_at.unwrap_or(now),
            updated_at: now,
        })
    }

    fn open(&self, sealed: SealedSession) -> Result<PlatformSession, AuthError> {
        Ok(PlatformSession {
            access_token: self.vault.decrypt_string(&sealed.encrypted_access_token)?,
            id: sealed.id,
            shop: sealed.shop,
            state: sealed.state,
            is_online: sealed.is_online,
            scope: sealed.scope,
            expires: sealed.expires,
            user_id: sealed.user_id,
            email: sealed.email,
            account_owner: sealed.account_owner,
            created_at: Some(sealed.created_at),
            updated_at: Some(sealed.updated_at),
        })
    }

    /// Insert or replace a session
    pub async fn store(&self, session: PlatformSession) -> Result<(), AuthError> {
        require_field(&session.id, "id")?;
        require_field(&session.shop, "shop")?;
        require_field(&session.state, "state")?;
        require_field(&session.access_token, "accessToken")?;

        let sealed = self.seal(session)?;
        self.sessions.upsert_session(&sealed).await?;

        info!(session_id = %sealed.id, shop = %sealed.shop, "Platform session stored");
        Ok(())
    }

    pub async fn load(&self, id: &str) -> Result<PlatformSession, AuthError> {
        let sealed = self
            .sessions
            .find_session(id)
            .await?
            .ok_or_else(|| AuthError::NotFound("session".to_string()))?;
        self.open(sealed)
    }

    /// Idempotent
    pub async fn delete(&self, id: &str) -> Result<(), AuthError> {
        let removed = self.sessions.delete_sessions(&[id.to_string()]).await?;
        debug!(session_id = %id, removed, "Platform session deleted");
        Ok(())
    }

    pub async fn delete_many(&self, ids: &[String]) -> Result<u64, AuthError> {
        if ids.is_empty() {
            return Err(AuthError::InvalidInput("ids cannot be empty".to_string()));
        }
        Ok(self.sessions.delete_sessions(ids).await?)
    }

    pub async fn find_by_shop(&self, shop: &str) -> Result<Vec<PlatformSession>, AuthError> {
        let shop = shop.trim().to_lowercase();
        self.sessions
            .find_sessions_by_shop(&shop)
            .await?
            .into_iter()
            .map(|sealed| self.open(sealed))
            .collect()
    }

    /// Drop every session of a shop; used when the app is uninstalled
    pub async fn purge_shop(&self, shop: &str) -> Result<u64, AuthError> {
        Ok(self.sessions.delete_sessions_for_shop(shop).await?)
    }
}

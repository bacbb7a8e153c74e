//! Database layer
//!
//! Persistence collaborator for users, tenants, API keys, merchant stores and
//! platform sessions. Services depend on the store traits below; the SQLite
//! repositories here are the production implementations.

pub mod session_repository;
pub mod store_repository;
pub mod tenant_repository;
pub mod user_repository;

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};
use thiserror::Error;
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::models::{ApiKey, Client, SealedSession, Store, StoreInstall, User};

pub use session_repository::SessionRepository;
pub use store_repository::StoreRepository;
pub use tenant_repository::TenantRepository;
pub use user_repository::UserRepository;

/// Database connection pool type
pub type DbPool = Pool<Sqlite>;

/// Initialize the database connection pool and run migrations
pub async fn init_pool(config: &DatabaseConfig) -> Result<DbPool> {
    let mut options = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs));

    // Each in-memory connection is its own database; pin a single one.
    if config.url.contains(":memory:") {
        options = options
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    }

    let pool = options.connect(&config.url).await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// Check the database answers queries
pub async fn ping(pool: &DbPool) -> Result<()> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Persistence failures
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A uniqueness constraint rejected the write
    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("{0} not found")]
    NotFound(String),

    /// A stored value could not be decoded
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl RepositoryError {
    /// Map a failed write, turning unique-constraint violations into `AlreadyExists`
    pub fn from_write(err: sqlx::Error, what: &str) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                RepositoryError::AlreadyExists(what.to_string())
            }
            _ => RepositoryError::Database(err),
        }
    }
}

pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

/// API key joined with its owning tenant
#[derive(Debug, Clone)]
pub struct ApiKeyLookup {
    pub client_id: Uuid,
    pub client_name: String,
    pub client_active: bool,
    pub key: ApiKey,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(&self, user: &User) -> RepositoryResult<()>;
    async fn find_user_by_id(&self, id: Uuid) -> RepositoryResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> RepositoryResult<Option<User>>;
    async fn update_user_profile(
        &self,
        id: Uuid,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> RepositoryResult<Option<User>>;
    /// Soft delete; returns false when the user does not exist
    async fn deactivate_user(&self, id: Uuid) -> RepositoryResult<bool>;
}

#[async_trait]
pub trait TenantStore: Send + Sync {
    /// Insert the tenant and its initial members in one transaction
    async fn create_client(&self, client: &Client) -> RepositoryResult<()>;
    async fn find_client_by_id(&self, id: Uuid) -> RepositoryResult<Option<Client>>;
    async fn find_client_by_name(&self, name: &str) -> RepositoryResult<Option<Client>>;
    /// Active tenants the user belongs to
    async fn list_clients_for_user(&self, user_id: Uuid) -> RepositoryResult<Vec<Client>>;
    /// Idempotent
    async fn add_member(&self, client_id: Uuid, user_id: Uuid) -> RepositoryResult<()>;
    async fn insert_api_key(&self, key: &ApiKey) -> RepositoryResult<()>;
    /// Lookup regardless of the key's active flag
    async fn find_api_key_by_hash(&self, key_hash: &str) -> RepositoryResult<Option<ApiKeyLookup>>;
    /// Returns false when the key does not belong to the tenant
    async fn revoke_api_key(&self, client_id: Uuid, key_id: Uuid) -> RepositoryResult<bool>;
    async fn touch_api_key(&self, key_id: Uuid, at: DateTime<Utc>) -> RepositoryResult<()>;
}

#[async_trait]
pub trait MerchantStore: Send + Sync {
    /// Insert or refresh by shop domain; an existing storefront key is kept
    async fn upsert_store(&self, install: &StoreInstall) -> RepositoryResult<Store>;
    async fn find_store_by_id(&self, id: Uuid) -> RepositoryResult<Option<Store>>;
    async fn find_store_by_shop(&self, shop_domain: &str) -> RepositoryResult<Option<Store>>;
    async fn find_store_by_storefront_key(&self, key: &str) -> RepositoryResult<Option<Store>>;
    async fn mark_uninstalled(&self, shop_domain: &str, at: DateTime<Utc>) -> RepositoryResult<bool>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert or replace by session id; `created_at` of an existing row is kept
    async fn upsert_session(&self, session: &SealedSession) -> RepositoryResult<()>;
    async fn find_session(&self, id: &str) -> RepositoryResult<Option<SealedSession>>;
    async fn find_sessions_by_shop(&self, shop: &str) -> RepositoryResult<Vec<SealedSession>>;
    /// Returns the number of rows removed; unknown ids are ignored
    async fn delete_sessions(&self, ids: &[String]) -> RepositoryResult<u64>;
    async fn delete_sessions_for_shop(&self, shop: &str) -> RepositoryResult<u64>;
}

pub(crate) fn parse_db_timestamp(ts: &str) -> RepositoryResult<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(ts, "%Y-%m-%d %H:%M:%S") {
        return Ok(DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc));
    }
    Err(RepositoryError::Corrupt(format!("invalid timestamp {:?}", ts)))
}

pub(crate) fn parse_optional_timestamp(ts: Option<&str>) -> RepositoryResult<Option<DateTime<Utc>>> {
    ts.map(parse_db_timestamp).transpose()
}

pub(crate) fn parse_uuid(value: &str, what: &str) -> RepositoryResult<Uuid> {
    Uuid::parse_str(value).map_err(|_| RepositoryError::Corrupt(format!("invalid {} id", what)))
}

#[cfg(test)]
pub(crate) async fn test_pool() -> DbPool {
    init_pool(&DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        connect_timeout_secs: 5,
    })
    .await
    .expect("in-memory database")
}

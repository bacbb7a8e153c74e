//! Merchant store repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{
    parse_db_timestamp, parse_optional_timestamp, parse_uuid, MerchantStore, RepositoryError,
    RepositoryResult,
};
use crate::models::{
    Store, StoreInstall, StoreStatus, DEFAULT_DOCUMENT_TYPE, DEFAULT_PLAN_LEVEL,
};

#[derive(Debug, sqlx::FromRow)]
struct StoreRow {
    id: String,
    shop_domain: String,
    shop_name: String,
    encrypted_access_token: Vec<u8>,
    storefront_key: String,
    encrypted_search_api_key: Vec<u8>,
    search_url: String,
    index_uid: String,
    vector_collection: String,
    document_type: String,
    plan_level: String,
    status: String,
    webhook_secret: String,
    installed_at: String,
    uninstalled_at: Option<String>,
    created_at: String,
    updated_at: String,
}

const STORE_COLUMNS: &str = "id, shop_domain, shop_name, encrypted_access_token, storefront_key, \
     encrypted_search_api_key, search_url, index_uid, vector_collection, document_type, plan_level, \
     status, webhook_secret, installed_at, uninstalled_at, created_at, updated_at";

impl TryFrom<StoreRow> for Store {
    type Error = RepositoryError;

    fn try_from(row: StoreRow) -> Result<Self, Self::Error> {
        Ok(Store {
            id: parse_uuid(&row.id, "store")?,
            shop_domain: row.shop_domain,
            shop_name: row.shop_name,
            encrypted_access_token: row.encrypted_access_token,
            storefront_key: row.storefront_key,
            encrypted_search_api_key: row.encrypted_search_api_key,
            search_url: row.search_url,
            index_uid: row.index_uid,
            vector_collection: row.vector_collection,
            document_type: row.document_type,
            plan_level: row.plan_level,
            status: StoreStatus::parse(&row.status),
            webhook_secret: row.webhook_secret,
            installed_at: parse_db_timestamp(&row.installed_at)?,
            uninstalled_at: parse_optional_timestamp(row.uninstalled_at.as_deref())?,
            created_at: parse_db_timestamp(&row.created_at)?,
            updated_at: parse_db_timestamp(&row.updated_at)?,
        })
    }
}

pub struct StoreRepository {
    pool: SqlitePool,
}

impl StoreRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn find_store(&self, column: &str, value: String) -> RepositoryResult<Option<Store>> {
        let row = sqlx::query_as::<_, StoreRow>(&format!(
            "SELECT {} FROM stores WHERE {} = ?",
            STORE_COLUMNS, column
        ))
        .bind(value)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Store::try_from).transpose()
    }
}

#[async_trait]
impl MerchantStore for StoreRepository {
    async fn upsert_store(&self, install: &StoreInstall) -> RepositoryResult<Store> {
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO stores (
                id, shop_domain, shop_name, encrypted_access_token, storefront_key,
                encrypted_search_api_key, search_url, index_uid, vector_collection,
                document_type, plan_level, status, webhook_secret, installed_at,
                uninstalled_at, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL, ?, ?)
            ON CONFLICT(shop_domain) DO UPDATE SET
                shop_name = excluded.shop_name,
                encrypted_access_token = excluded.encrypted_access_token,
                encrypted_search_api_key = excluded.encrypted_search_api_key,
                search_url = excluded.search_url,
                index_uid = excluded.index_uid,
                vector_collection = excluded.vector_collection,
                webhook_secret = excluded.webhook_secret,
                status = excluded.status,
                installed_at = excluded.installed_at,
                uninstalled_at = NULL,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&install.shop_domain)
        .bind(&install.shop_name)
        .bind(&install.encrypted_access_token)
        .bind(&install.storefront_key)
        .bind(&install.encrypted_search_api_key)
        .bind(&install.search_url)
        .bind(&install.index_uid)
        .bind(&install.vector_collection)
        .bind(DEFAULT_DOCUMENT_TYPE)
        .bind(DEFAULT_PLAN_LEVEL)
        .bind(StoreStatus::Active.as_str())
        .bind(&install.webhook_secret)
        .bind(&now)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "Store"))?;

        self.find_store_by_shop(&install.shop_domain)
            .await?
            .ok_or_else(|| RepositoryError::NotFound("Store".to_string()))
    }

    async fn find_store_by_id(&self, id: Uuid) -> RepositoryResult<Option<Store>> {
        self.find_store("id", id.to_string()).await
    }

    async fn find_store_by_shop(&self, shop_domain: &str) -> RepositoryResult<Option<Store>> {
        self.find_store("shop_domain", shop_domain.to_string()).await
    }

    async fn find_store_by_storefront_key(&self, key: &str) -> RepositoryResult<Option<Store>> {
        self.find_store("storefront_key", key.to_string()).await
    }

    async fn mark_uninstalled(&self, shop_domain: &str, at: DateTime<Utc>) -> RepositoryResult<bool> {
        let result = sqlx::query(
            "UPDATE stores SET status = ?, uninstalled_at = ?, updated_at = ? WHERE shop_domain = ?",
        )
        .bind(StoreStatus::Uninstalled.as_str())
        .bind(at.to_rfc3339())
        .bind(at.to_rfc3339())
        .bind(shop_domain)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

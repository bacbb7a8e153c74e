//! Tenant ("client"), membership and API key repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{
    parse_db_timestamp, parse_optional_timestamp, parse_uuid, ApiKeyLookup, RepositoryError,
    RepositoryResult, TenantStore,
};
use crate::models::{ApiKey, Client};

#[derive(Debug, sqlx::FromRow)]
struct ClientRow {
    id: String,
    name: String,
    description: Option<String>,
    is_active: bool,
    created_at: String,
    updated_at: String,
}

#[derive(Debug, sqlx::FromRow)]
struct ApiKeyRow {
    id: String,
    client_id: String,
    key_hash: String,
    name: String,
    key_prefix: String,
    permissions: String,
    is_active: bool,
    last_used_at: Option<String>,
    created_at: String,
    expires_at: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct ApiKeyLookupRow {
    #[sqlx(flatten)]
    key: ApiKeyRow,
    client_name: String,
    client_active: bool,
}

const API_KEY_COLUMNS: &str = "k.id, k.client_id, k.key_hash, k.name, k.key_prefix, k.permissions, \
     k.is_active, k.last_used_at, k.created_at, k.expires_at";

pub struct TenantRepository {
    pool: SqlitePool,
}

impl TenantRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn row_to_client(&self, row: ClientRow) -> RepositoryResult<Client> {
        let id = parse_uuid(&row.id, "client")?;

        Ok(Client {
            id,
            name: row.name,
            description: row.description,
            member_ids: self.get_member_ids(id).await?,
            api_keys: self.get_api_keys(id).await?,
            is_active: row.is_active,
            created_at: parse_db_timestamp(&row.created_at)?,
            updated_at: parse_db_timestamp(&row.updated_at)?,
        })
    }

    /// Only active users count as members
    async fn get_member_ids(&self, client_id: Uuid) -> RepositoryResult<Vec<Uuid>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT cm.user_id
            FROM client_members cm
            INNER JOIN users u ON u.id = cm.user_id
            WHERE cm.client_id = ? AND u.is_active = 1
            ORDER BY cm.added_at
            "#,
        )
        .bind(client_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(|(id,)| parse_uuid(id, "user")).collect()
    }

    async fn get_api_keys(&self, client_id: Uuid) -> RepositoryResult<Vec<ApiKey>> {
        let rows = sqlx::query_as::<_, ApiKeyRow>(&format!(
            "SELECT {} FROM api_keys k WHERE k.client_id = ? ORDER BY k.created_at, k.rowid",
            API_KEY_COLUMNS
        ))
        .bind(client_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_api_key).collect()
    }

    async fn find_client(&self, column: &str, value: String) -> RepositoryResult<Option<Client>> {
        let row = sqlx::query_as::<_, ClientRow>(&format!(
            "SELECT id, name, description, is_active, created_at, updated_at FROM clients WHERE {} = ?",
            column
        ))
        .bind(value)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.row_to_client(row).await?)),
            None => Ok(None),
        }
    }
}

fn row_to_api_key(row: ApiKeyRow) -> RepositoryResult<ApiKey> {
    let permissions: Vec<String> = serde_json::from_str(&row.permissions)
        .map_err(|_| RepositoryError::Corrupt("invalid api key permissions".to_string()))?;

    Ok(ApiKey {
        id: parse_uuid(&row.id, "api key")?,
        client_id: parse_uuid(&row.client_id, "client")?,
        key_hash: row.key_hash,
        name: row.name,
        key_prefix: row.key_prefix,
        permissions,
        is_active: row.is_active,
        last_used_at: parse_optional_timestamp(row.last_used_at.as_deref())?,
        created_at: parse_db_timestamp(&row.created_at)?,
        expires_at: parse_optional_timestamp(row.expires_at.as_deref())?,
    })
}

#[async_trait]
impl TenantStore for TenantRepository {
    async fn create_client(&self, client: &Client) -> RepositoryResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO clients (id, name, description, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(client.id.to_string())
        .bind(&client.name)
        .bind(&client.description)
        .bind(client.is_active)
        .bind(client.created_at.to_rfc3339())
        .bind(client.updated_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_write(e, "Client"))?;

        for user_id in &client.member_ids {
            sqlx::query("INSERT INTO client_members (client_id, user_id, added_at) VALUES (?, ?, ?)")
                .bind(client.id.to_string())
                .bind(user_id.to_string())
                .bind(client.created_at.to_rfc3339())
                .execute(&mut *tx)
                .await
                .map_err(|e| RepositoryError::from_write(e, "Client member"))?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn find_client_by_id(&self, id: Uuid) -> RepositoryResult<Option<Client>> {
        self.find_client("id", id.to_string()).await
    }

    async fn find_client_by_name(&self, name: &str) -> RepositoryResult<Option<Client>> {
        self.find_client("name", name.to_string()).await
    }

    async fn list_clients_for_user(&self, user_id: Uuid) -> RepositoryResult<Vec<Client>> {
        let rows = sqlx::query_as::<_, ClientRow>(
            r#"
            SELECT c.id, c.name, c.description, c.is_active, c.created_at, c.updated_at
            FROM clients c
            INNER JOIN client_members cm ON cm.client_id = c.id
            INNER JOIN users u ON u.id = cm.user_id
            WHERE cm.user_id = ? AND c.is_active = 1 AND u.is_active = 1
            ORDER BY c.name
            "#,
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        let mut clients = Vec::with_capacity(rows.len());
        for row in rows {
            clients.push(self.row_to_client(row).await?);
        }
        Ok(clients)
    }

    async fn add_member(&self, client_id: Uuid, user_id: Uuid) -> RepositoryResult<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO client_members (client_id, user_id, added_at) VALUES (?, ?, ?)",
        )
        .bind(client_id.to_string())
        .bind(user_id.to_string())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_api_key(&self, key: &ApiKey) -> RepositoryResult<()> {
        let permissions = serde_json::to_string(&key.permissions)
            .map_err(|e| RepositoryError::Corrupt(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO api_keys (id, client_id, key_hash, name, key_prefix, permissions, is_active, last_used_at, created_at, expires_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(key.id.to_string())
        .bind(key.client_id.to_string())
        .bind(&key.key_hash)
        .bind(&key.name)
        .bind(&key.key_prefix)
        .bind(permissions)
        .bind(key.is_active)
        .bind(key.last_used_at.map(|d| d.to_rfc3339()))
        .bind(key.created_at.to_rfc3339())
        .bind(key.expires_at.map(|d| d.to_rfc3339()))
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "API key"))?;

        Ok(())
    }

    async fn find_api_key_by_hash(&self, key_hash: &str) -> RepositoryResult<Option<ApiKeyLookup>> {
        let row = sqlx::query_as::<_, ApiKeyLookupRow>(&format!(
            r#"
            SELECT {}, c.name AS client_name, c.is_active AS client_active
            FROM api_keys k
            INNER JOIN clients c ON c.id = k.client_id
            WHERE k.key_hash = ?
            "#,
            API_KEY_COLUMNS
        ))
        .bind(key_hash)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let key = row_to_api_key(row.key)?;
        Ok(Some(ApiKeyLookup {
            client_id: key.client_id,
            client_name: row.client_name,
            client_active: row.client_active,
            key,
        }))
    }

    async fn revoke_api_key(&self, client_id: Uuid, key_id: Uuid) -> RepositoryResult<bool> {
        let result = sqlx::query("UPDATE api_keys SET is_active = 0 WHERE id = ? AND client_id = ?")
            .bind(key_id.to_string())
            .bind(client_id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn touch_api_key(&self, key_id: Uuid, at: DateTime<Utc>) -> RepositoryResult<()> {
        sqlx::query("UPDATE api_keys SET last_used_at = ? WHERE id = ?")
            .bind(at.to_rfc3339())
            .bind(key_id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

//! Platform session repository

use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use super::{parse_db_timestamp, parse_optional_timestamp, RepositoryError, RepositoryResult, SessionStore};
use crate::models::SealedSession;

#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    id: String,
    shop: String,
    state: String,
    is_online: bool,
    scope: String,
    expires: Option<String>,
    encrypted_access_token: Vec<u8>,
    user_id: Option<i64>,
    email: Option<String>,
    account_owner: bool,
    created_at: String,
    updated_at: String,
}

const SESSION_COLUMNS: &str = "id, shop, state, is_online, scope, expires, encrypted_access_token, \
     user_id, email, account_owner, created_at, updated_at";

impl TryFrom<SessionRow> for SealedSession {
    type Error = RepositoryError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        Ok(SealedSession {
            id: row.id,
            shop: row.shop,
            state: row.state,
            is_online: row.is_online,
            scope: row.scope,
            expires: parse_optional_timestamp(row.expires.as_deref())?,
            encrypted_access_token: row.encrypted_access_token,
            user_id: row.user_id,
            email: row.email,
            account_owner: row.account_owner,
            created_at: parse_db_timestamp(&row.created_at)?,
            updated_at: parse_db_timestamp(&row.updated_at)?,
        })
    }
}

pub struct SessionRepository {
    pool: SqlitePool,
}

impl SessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for SessionRepository {
    async fn upsert_session(&self, session: &SealedSession) -> RepositoryResult<()> {
        sqlx::query(
            r#"
            INSERT INTO platform_sessions (
                id, shop, state, is_online, scope, expires, encrypted_access_token,
                user_id, email, account_owner, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                shop = excluded.shop,
                state = excluded.state,
                is_online = excluded.is_online,
                scope = excluded.scope,
                expires = excluded.expires,
                encrypted_access_token = excluded.encrypted_access_token,
                user_id = excluded.user_id,
                email = excluded.email,
                account_owner = excluded.account_owner,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&session.id)
        .bind(&session.shop)
        .bind(&session.state)
        .bind(session.is_online)
        .bind(&session.scope)
        .bind(session.expires.map(|e| e.to_rfc3339()))
        .bind(&session.encrypted_access_token)
        .bind(session.user_id)
        .bind(&session.email)
        .bind(session.account_owner)
        .bind(session.created_at.to_rfc3339())
        .bind(session.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "Session"))?;

        Ok(())
    }

    async fn find_session(&self, id: &str) -> RepositoryResult<Option<SealedSession>> {
        let row = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {} FROM platform_sessions WHERE id = ?",
            SESSION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(SealedSession::try_from).transpose()
    }

    async fn find_sessions_by_shop(&self, shop: &str) -> RepositoryResult<Vec<SealedSession>> {
        let rows = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {} FROM platform_sessions WHERE shop = ? ORDER BY created_at",
            SESSION_COLUMNS
        ))
        .bind(shop)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(SealedSession::try_from).collect()
    }

    async fn delete_sessions(&self, ids: &[String]) -> RepositoryResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("DELETE FROM platform_sessions WHERE id IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn delete_sessions_for_shop(&self, shop: &str) -> RepositoryResult<u64> {
        let result = sqlx::query("DELETE FROM platform_sessions WHERE shop = ?")
            .bind(shop)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

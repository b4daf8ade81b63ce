//! Session repository.

use admin_gate_access::{Principal, Session, SessionKey, SessionStore, StoreError};
use async_trait::async_trait;
use rootcause::Report;
use sqlx::{FromRow, PgPool};

/// Row type for session queries.
#[derive(FromRow)]
struct SessionRow {
    id: String,
    data: serde_json::Value,
}

impl SessionRow {
    fn try_into_session(self) -> Result<Session, StoreError> {
        serde_json::from_value(self.data).map_err(|e| StoreError::Serialization {
            reason: format!("invalid session '{}': {}", self.id, e),
        })
    }
}

/// Sessions stored as JSON documents keyed by session key.
///
/// Updates never recreate a deleted row, so a logged-out session stays gone.
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    /// Creates a new session store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn encode(session: &Session) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(session).map_err(|e| StoreError::Serialization {
        reason: e.to_string(),
    })
}

fn principal_id(session: &Session) -> Option<String> {
    session.principal().map(|p: &Principal| p.id().to_string())
}

fn storage_failed(e: sqlx::Error) -> StoreError {
    StoreError::StorageFailed {
        reason: e.to_string(),
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn load(&self, key: &SessionKey) -> Result<Option<Session>, Report<StoreError>> {
        let row: Option<SessionRow> = sqlx::query_as(
            r#"
            SELECT id, data
            FROM sessions
            WHERE id = $1
            "#,
        )
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_failed)?;

        match row {
            Some(r) => Ok(Some(r.try_into_session()?)),
            None => Ok(None),
        }
    }

    async fn insert(&self, session: &Session) -> Result<(), Report<StoreError>> {
        let data = encode(session)?;

        sqlx::query(
            r#"
            INSERT INTO sessions (id, principal_id, data, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(session.key().as_str())
        .bind(principal_id(session))
        .bind(data)
        .bind(session.created_at())
        .bind(session.expires_at())
        .execute(&self.pool)
        .await
        .map_err(storage_failed)?;

        Ok(())
    }

    async fn update(&self, session: &Session) -> Result<bool, Report<StoreError>> {
        let data = encode(session)?;

        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET principal_id = $2, data = $3, expires_at = $4
            WHERE id = $1
            "#,
        )
        .bind(session.key().as_str())
        .bind(principal_id(session))
        .bind(data)
        .bind(session.expires_at())
        .execute(&self.pool)
        .await
        .map_err(storage_failed)?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove(&self, key: &SessionKey) -> Result<(), Report<StoreError>> {
        sqlx::query(
            r#"
            DELETE FROM sessions
            WHERE id = $1
            "#,
        )
        .bind(key.as_str())
        .execute(&self.pool)
        .await
        .map_err(storage_failed)?;

        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, Report<StoreError>> {
        let result = sqlx::query(
            r#"
            DELETE FROM sessions
            WHERE expires_at < NOW()
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_failed)?;

        Ok(result.rows_affected())
    }
}

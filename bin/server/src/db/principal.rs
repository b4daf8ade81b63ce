//! Principal repository.

use admin_gate_access::{Principal, PrincipalDirectory, Role, StoreError};
use admin_gate_core::PrincipalId;
use async_trait::async_trait;
use chrono::Utc;
use rootcause::Report;
use sqlx::{FromRow, PgPool};
use std::str::FromStr;

/// Row type for principal queries.
#[derive(FromRow)]
struct PrincipalRow {
    id: String,
    username: String,
    credentials_hash: String,
    roles: serde_json::Value,
    is_active: bool,
}

impl PrincipalRow {
    fn try_into_principal(self) -> Result<Principal, StoreError> {
        let id = PrincipalId::from_str(&self.id).map_err(|e| StoreError::Serialization {
            reason: format!("invalid principal id '{}': {}", self.id, e),
        })?;
        let roles: Vec<Role> =
            serde_json::from_value(self.roles).map_err(|e| StoreError::Serialization {
                reason: format!("invalid roles for principal '{}': {}", self.id, e),
            })?;
        Ok(Principal::with_all_fields(
            id,
            self.username,
            self.credentials_hash,
            roles,
            self.is_active,
        ))
    }
}

fn storage_failed(e: sqlx::Error) -> StoreError {
    StoreError::StorageFailed {
        reason: e.to_string(),
    }
}

/// Admin principals stored in the `principals` table.
pub struct PgPrincipalDirectory {
    pool: PgPool,
}

impl PgPrincipalDirectory {
    /// Creates a new principal directory.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a principal, or updates the one with the same username.
    ///
    /// Returns the stored principal, which keeps the existing ID on update.
    pub async fn upsert(&self, principal: &Principal) -> Result<Principal, Report<StoreError>> {
        let roles = serde_json::to_value(principal.roles()).map_err(|e| {
            StoreError::Serialization {
                reason: e.to_string(),
            }
        })?;

        let row: PrincipalRow = sqlx::query_as(
            r#"
            INSERT INTO principals (id, username, credentials_hash, roles, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            ON CONFLICT (username) DO UPDATE
            SET credentials_hash = EXCLUDED.credentials_hash,
                roles = EXCLUDED.roles,
                is_active = EXCLUDED.is_active,
                updated_at = EXCLUDED.updated_at
            RETURNING id, username, credentials_hash, roles, is_active
            "#,
        )
        .bind(principal.id().to_string())
        .bind(principal.username())
        .bind(principal.credentials_hash())
        .bind(roles)
        .bind(principal.is_active())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(storage_failed)?;

        Ok(row.try_into_principal()?)
    }
}

#[async_trait]
impl PrincipalDirectory for PgPrincipalDirectory {
    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Principal>, Report<StoreError>> {
        let row: Option<PrincipalRow> = sqlx::query_as(
            r#"
            SELECT id, username, credentials_hash, roles, is_active
            FROM principals
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_failed)?;

        match row {
            Some(r) => Ok(Some(r.try_into_principal()?)),
            None => Ok(None),
        }
    }

    async fn find_by_id(&self, id: PrincipalId) -> Result<Option<Principal>, Report<StoreError>> {
        let row: Option<PrincipalRow> = sqlx::query_as(
            r#"
            SELECT id, username, credentials_hash, roles, is_active
            FROM principals
            WHERE id = $1
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_failed)?;

        match row {
            Some(r) => Ok(Some(r.try_into_principal()?)),
            None => Ok(None),
        }
    }
}

//! Persistent source of principals.

use admin_gate_core::PrincipalId;
use async_trait::async_trait;
use rootcause::Report;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::principal::Principal;

/// Lookup of admin principals.
#[async_trait]
pub trait PrincipalDirectory: Send + Sync {
    /// Finds a principal by login name.
    async fn find_by_username(&self, username: &str)
    -> Result<Option<Principal>, Report<StoreError>>;

    /// Finds a principal by ID. Used to reload the principal attached to a session.
    async fn find_by_id(&self, id: PrincipalId) -> Result<Option<Principal>, Report<StoreError>>;
}

/// Process-local principal directory.
#[derive(Debug, Default)]
pub struct InMemoryPrincipalDirectory {
    principals: RwLock<HashMap<PrincipalId, Principal>>,
}

impl InMemoryPrincipalDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a principal.
    pub async fn upsert(&self, principal: Principal) {
        self.principals
            .write()
            .await
            .insert(principal.id(), principal);
    }

    /// Deletes a principal.
    pub async fn remove(&self, id: PrincipalId) -> Option<Principal> {
        self.principals.write().await.remove(&id)
    }
}

#[async_trait]
impl PrincipalDirectory for InMemoryPrincipalDirectory {
    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Principal>, Report<StoreError>> {
        Ok(self
            .principals
            .read()
            .await
            .values()
            .find(|p| p.username() == username)
            .cloned())
    }

    async fn find_by_id(&self, id: PrincipalId) -> Result<Option<Principal>, Report<StoreError>> {
        Ok(self.principals.read().await.get(&id).cloned())
    }
}

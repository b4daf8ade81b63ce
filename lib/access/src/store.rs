//! Shared session storage.
//!
//! Each request loads its own copy of the client's [`Session`], works on it,
//! and writes it back. The store allows concurrent reads and serializes
//! writes; two requests from the same client racing to update resolve as
//! last-write-wins. Updates never recreate a removed key, so a session
//! destroyed by logout stays destroyed.

use async_trait::async_trait;
use chrono::Utc;
use rootcause::Report;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::session::{Session, SessionKey};

/// Key to session persistence.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Loads a session by key. Returns `None` if it does not exist.
    async fn load(&self, key: &SessionKey) -> Result<Option<Session>, Report<StoreError>>;

    /// Stores a session under a newly generated key.
    async fn insert(&self, session: &Session) -> Result<(), Report<StoreError>>;

    /// Overwrites a stored session.
    ///
    /// Returns false without writing if the key no longer exists.
    async fn update(&self, session: &Session) -> Result<bool, Report<StoreError>>;

    /// Deletes a session (logout).
    async fn remove(&self, key: &SessionKey) -> Result<(), Report<StoreError>>;

    /// Deletes every expired session, returning how many were removed.
    async fn purge_expired(&self) -> Result<u64, Report<StoreError>>;
}

/// Process-local session store.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionKey, Session>>,
}

impl InMemorySessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Returns true if no sessions are stored.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, key: &SessionKey) -> Result<Option<Session>, Report<StoreError>> {
        Ok(self.sessions.read().await.get(key).cloned())
    }

    async fn insert(&self, session: &Session) -> Result<(), Report<StoreError>> {
        self.sessions
            .write()
            .await
            .insert(session.key().clone(), session.clone());
        Ok(())
    }

    async fn update(&self, session: &Session) -> Result<bool, Report<StoreError>> {
        match self.sessions.write().await.get_mut(session.key()) {
            Some(stored) => {
                *stored = session.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove(&self, key: &SessionKey) -> Result<(), Report<StoreError>> {
        self.sessions.write().await.remove(key);
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, Report<StoreError>> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.expires_at() > now);
        Ok((before - sessions.len()) as u64)
    }
}

//! Admin sessions.
//!
//! A session is created (anonymous) on a client's first request and is
//! mutated on every authenticated request: its expiry is prolonged and its
//! permission cache refreshed. It is destroyed on logout or once it expires.
//! A session without a principal is never logged in.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::principal::Principal;
use crate::role::PermissionSet;

/// Opaque key identifying a client's session, carried in the session cookie.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionKey(String);

impl SessionKey {
    /// Creates a session key from a string.
    #[must_use]
    pub fn new(key: String) -> Self {
        Self(key)
    }

    /// Generates a new unique key.
    #[must_use]
    pub fn generate() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SessionKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Server-side state for one client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    key: SessionKey,
    /// The authenticated principal, if any.
    principal: Option<Principal>,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    /// Permission cache derived from the principal's roles.
    permissions: PermissionSet,
}

impl Session {
    /// Creates an unauthenticated session valid for `lifetime`.
    #[must_use]
    pub fn anonymous(key: SessionKey, lifetime: Duration) -> Self {
        let now = Utc::now();
        Self {
            key,
            principal: None,
            created_at: now,
            expires_at: now + lifetime,
            permissions: PermissionSet::none(),
        }
    }

    #[must_use]
    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    #[must_use]
    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    #[must_use]
    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }

    /// Returns true if the session has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Returns true if a principal is attached and the session has not expired.
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.principal.is_some() && !self.is_expired()
    }

    /// Attaches a principal and starts a fresh expiry window.
    pub fn attach(&mut self, principal: Principal, lifetime: Duration) {
        self.principal = Some(principal);
        self.prolong(lifetime);
    }

    /// Replaces the attached principal with a freshly loaded copy.
    ///
    /// Does not touch expiry; a reload is not activity.
    pub fn replace_principal(&mut self, principal: Principal) {
        self.principal = Some(principal);
    }

    /// Removes the principal and its cached permissions.
    pub fn detach(&mut self) -> Option<Principal> {
        self.permissions = PermissionSet::none();
        self.principal.take()
    }

    /// Extends the expiry to `lifetime` from now.
    pub fn prolong(&mut self, lifetime: Duration) {
        self.expires_at = Utc::now() + lifetime;
    }

    /// Moves the session to a freshly generated key, returning the old one.
    pub fn regenerate_key(&mut self) -> SessionKey {
        std::mem::replace(&mut self.key, SessionKey::generate())
    }

    /// Replaces the permission cache.
    pub fn set_permissions(&mut self, permissions: PermissionSet) {
        self.permissions = permissions;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::Role;

    fn anonymous() -> Session {
        Session::anonymous(SessionKey::from("sess_test"), Duration::minutes(15))
    }

    #[test]
    fn generated_keys_are_unique() {
        assert_ne!(SessionKey::generate(), SessionKey::generate());
    }

    #[test]
    fn anonymous_session_is_not_logged_in() {
        let session = anonymous();
        assert!(session.principal().is_none());
        assert!(!session.is_logged_in());
        assert!(!session.is_expired());
        assert!(session.permissions().is_empty());
    }

    #[test]
    fn attach_logs_in() {
        let mut session = anonymous();
        session.attach(Principal::new("admin", "hash"), Duration::minutes(15));
        assert!(session.is_logged_in());
        assert_eq!(session.principal().map(Principal::username), Some("admin"));
    }

    #[test]
    fn expired_session_is_not_logged_in() {
        let mut session = anonymous();
        session.attach(Principal::new("admin", "hash"), Duration::seconds(-1));
        assert!(session.principal().is_some());
        assert!(session.is_expired());
        assert!(!session.is_logged_in());
    }

    #[test]
    fn prolong_moves_expiry_forward() {
        let mut session = Session::anonymous(SessionKey::from("k"), Duration::seconds(1));
        let before = session.expires_at();
        session.prolong(Duration::hours(1));
        assert!(session.expires_at() > before);
    }

    #[test]
    fn detach_clears_permissions() {
        let mut session = anonymous();
        let principal = Principal::new("admin", "hash").with_roles(vec![Role::administrator()]);
        session.set_permissions(principal.permissions());
        session.attach(principal, Duration::minutes(15));

        let detached = session.detach();
        assert!(detached.is_some());
        assert!(!session.is_logged_in());
        assert!(session.permissions().is_empty());
    }

    #[test]
    fn regenerate_key_keeps_state() {
        let mut session = anonymous();
        session.attach(Principal::new("admin", "hash"), Duration::minutes(15));

        let old = session.regenerate_key();

        assert_eq!(old.as_str(), "sess_test");
        assert_ne!(session.key(), &old);
        assert!(session.is_logged_in());
    }

    #[test]
    fn session_serialization_roundtrip() {
        let mut session = anonymous();
        session.attach(Principal::new("admin", ""), Duration::minutes(15));
        let json = serde_json::to_string(&session).expect("serialize");
        let parsed: Session = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(session, parsed);
    }

    #[test]
    fn stored_session_carries_no_password_hash() {
        let hash = crate::credentials::hash_password("s3cret").expect("hash");
        let mut session = anonymous();
        session.attach(Principal::new("admin", hash.clone()), Duration::minutes(15));

        let json = serde_json::to_string(&session).expect("serialize");

        assert!(!json.contains(&hash));
        assert!(json.contains("admin"));
    }
}

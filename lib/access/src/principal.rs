//! The admin principal: the identity a session is authenticated as.
//!
//! Principals are loaded from the [`PrincipalDirectory`](crate::directory::PrincipalDirectory)
//! and treated as immutable for the duration of a request. The gate reloads
//! the attached principal on each dispatch so a concurrent deactivation or
//! role change takes effect on the next request.

use admin_gate_core::PrincipalId;
use serde::{Deserialize, Serialize};

use crate::credentials::verify_password;
use crate::role::{PermissionSet, Role};

/// An admin account able to sign in to the panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Internal principal ID.
    id: PrincipalId,
    /// Login name, unique within the directory.
    username: String,
    /// Argon2 PHC string of the password. Never serialized into sessions.
    #[serde(skip)]
    credentials_hash: String,
    /// Roles granting admin resources.
    roles: Vec<Role>,
    /// Whether the account may sign in.
    is_active: bool,
}

impl Principal {
    /// Creates an active principal with a freshly generated ID.
    #[must_use]
    pub fn new(username: impl Into<String>, credentials_hash: impl Into<String>) -> Self {
        Self {
            id: PrincipalId::new(),
            username: username.into(),
            credentials_hash: credentials_hash.into(),
            roles: Vec::new(),
            is_active: true,
        }
    }

    /// Creates a principal with all fields specified.
    ///
    /// Use this when reconstituting a principal from storage.
    #[must_use]
    pub fn with_all_fields(
        id: PrincipalId,
        username: String,
        credentials_hash: String,
        roles: Vec<Role>,
        is_active: bool,
    ) -> Self {
        Self {
            id,
            username,
            credentials_hash,
            roles,
            is_active,
        }
    }

    /// Returns a copy of this principal carrying the given roles.
    #[must_use]
    pub fn with_roles(mut self, roles: Vec<Role>) -> Self {
        self.roles = roles;
        self
    }

    /// Returns a copy of this principal with the active flag set.
    #[must_use]
    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    #[must_use]
    pub fn id(&self) -> PrincipalId {
        self.id
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn credentials_hash(&self) -> &str {
        &self.credentials_hash
    }

    #[must_use]
    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Returns true if the password matches the stored hash.
    #[must_use]
    pub fn verify_password(&self, password: &str) -> bool {
        verify_password(&self.credentials_hash, password)
    }

    /// Returns the permissions granted by this principal's roles.
    #[must_use]
    pub fn permissions(&self) -> PermissionSet {
        PermissionSet::from_roles(&self.roles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::hash_password;

    #[test]
    fn new_principal_is_active_without_roles() {
        let principal = Principal::new("admin", "hash");
        assert!(principal.is_active());
        assert!(principal.roles().is_empty());
        assert!(principal.permissions().is_empty());
        assert!(principal.id().to_string().starts_with("prn_"));
    }

    #[test]
    fn verify_password_uses_stored_hash() {
        let hash = hash_password("s3cret").expect("hash");
        let principal = Principal::new("admin", hash);
        assert!(principal.verify_password("s3cret"));
        assert!(!principal.verify_password("S3cret"));
    }

    #[test]
    fn permissions_follow_roles() {
        let principal =
            Principal::new("viewer", "hash").with_roles(vec![Role::new("Viewers", ["dashboard"])]);
        let perms = principal.permissions();
        assert!(perms.allows("dashboard"));
        assert!(!perms.allows("system"));
    }

    #[test]
    fn serialization_omits_credentials_hash() {
        let hash = hash_password("s3cret").expect("hash");
        let principal = Principal::new("admin", hash.clone());

        let json = serde_json::to_string(&principal).expect("serialize");
        assert!(!json.contains(&hash));
        assert!(!json.contains("credentials_hash"));

        let parsed: Principal = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed.id(), principal.id());
        assert_eq!(parsed.credentials_hash(), "");
        assert!(!parsed.verify_password("s3cret"));
    }

    #[test]
    fn with_all_fields_preserves_values() {
        let id = PrincipalId::new();
        let principal = Principal::with_all_fields(
            id,
            "ops".to_string(),
            "hash".to_string(),
            vec![Role::administrator()],
            false,
        );
        assert_eq!(principal.id(), id);
        assert_eq!(principal.username(), "ops");
        assert_eq!(principal.credentials_hash(), "hash");
        assert!(!principal.is_active());
        assert_eq!(principal.roles().len(), 1);
    }
}

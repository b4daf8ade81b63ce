//! Roles and the permission set derived from them.
//!
//! A role grants a set of admin resources (`dashboard`, `system`, ...).
//! The `all` resource grants every resource. A session caches the union of
//! its principal's role grants as a [`PermissionSet`], recomputed whenever
//! the gate refreshes permissions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Resource identifier granting access to every resource.
pub const ALL_RESOURCES: &str = "all";

/// A named bundle of resource grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    name: String,
    resources: BTreeSet<String>,
}

impl Role {
    /// Creates a role granting the given resources.
    #[must_use]
    pub fn new<I, S>(name: impl Into<String>, resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            resources: resources.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates a role granting every resource.
    #[must_use]
    pub fn administrator() -> Self {
        Self::new("Administrators", [ALL_RESOURCES])
    }

    /// Returns the role name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the resources granted by this role.
    #[must_use]
    pub fn resources(&self) -> &BTreeSet<String> {
        &self.resources
    }
}

/// Resources a session is currently allowed to access.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet {
    resources: BTreeSet<String>,
}

impl PermissionSet {
    /// Creates an empty permission set.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Merges the grants of every role.
    #[must_use]
    pub fn from_roles(roles: &[Role]) -> Self {
        let resources = roles
            .iter()
            .flat_map(|role| role.resources.iter().cloned())
            .collect();
        Self { resources }
    }

    /// Returns true if the resource is granted, directly or through `all`.
    #[must_use]
    pub fn allows(&self, resource: &str) -> bool {
        self.resources.contains(ALL_RESOURCES) || self.resources.contains(resource)
    }

    /// Returns true if nothing is granted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Iterates over the granted resource identifiers.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.resources.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_set_allows_nothing() {
        let perms = PermissionSet::none();
        assert!(perms.is_empty());
        assert!(!perms.allows("dashboard"));
    }

    #[test]
    fn from_roles_merges_grants() {
        let roles = vec![
            Role::new("Viewers", ["dashboard"]),
            Role::new("Operators", ["dashboard", "system"]),
        ];
        let perms = PermissionSet::from_roles(&roles);
        assert!(perms.allows("dashboard"));
        assert!(perms.allows("system"));
        assert!(!perms.allows("sales"));
        assert_eq!(perms.iter().count(), 2);
    }

    #[test]
    fn all_grants_every_resource() {
        let perms = PermissionSet::from_roles(&[Role::administrator()]);
        assert!(perms.allows("dashboard"));
        assert!(perms.allows("anything/else"));
    }

    #[test]
    fn permission_set_serializes_as_list() {
        let perms = PermissionSet::from_roles(&[Role::new("Viewers", ["dashboard"])]);
        let json = serde_json::to_string(&perms).expect("serialize");
        assert_eq!(json, r#"["dashboard"]"#);
    }
}

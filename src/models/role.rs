//! Role types, persisted identifiers and the desired-state container.

use super::{Action, Conditions, PermissionSpec};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Store-assigned identifier of a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleId(pub i64);

/// Store-assigned identifier of a permission row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionId(pub i64);

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for PermissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A permission row as held by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPermission {
    /// Row identifier.
    pub id: PermissionId,
    /// Granted verb.
    pub action: Action,
    /// Protected resource type, or `"all"`.
    pub subject: String,
    /// Conditions last written for this `(action, subject)` pair.
    pub conditions: Option<Conditions>,
}

impl StoredPermission {
    /// Returns the grant without its store identity.
    #[must_use]
    pub fn to_spec(&self) -> PermissionSpec {
        PermissionSpec {
            action: self.action,
            subject: self.subject.clone(),
            conditions: self.conditions.clone(),
        }
    }
}

/// A persisted role together with the permissions bound to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    /// Row identifier.
    pub id: RoleId,
    /// Unique role name.
    pub name: String,
    /// Bound permissions, ordered by permission id.
    pub permissions: Vec<StoredPermission>,
}

impl Role {
    /// Returns the bound permissions as plain grants.
    #[must_use]
    pub fn permission_specs(&self) -> Vec<PermissionSpec> {
        self.permissions.iter().map(StoredPermission::to_spec).collect()
    }
}

/// One role of the desired state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleDefinition {
    /// Role name.
    pub name: String,
    /// Desired permissions in declaration order.
    pub permissions: Vec<PermissionSpec>,
}

impl RoleDefinition {
    /// Creates a role definition.
    #[must_use]
    pub fn new(name: impl Into<String>, permissions: Vec<PermissionSpec>) -> Self {
        Self {
            name: name.into(),
            permissions,
        }
    }
}

/// Desired catalog: role definitions in declaration order.
///
/// Order carries no meaning for reconciliation; it only keeps reports
/// deterministic. Role names are unique.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DesiredState {
    roles: Vec<RoleDefinition>,
}

impl DesiredState {
    /// Creates an empty desired state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a role, replacing any earlier definition with the same name in place.
    pub fn insert(&mut self, definition: RoleDefinition) {
        if let Some(existing) = self.roles.iter_mut().find(|r| r.name == definition.name) {
            *existing = definition;
        } else {
            self.roles.push(definition);
        }
    }

    /// Builder-style variant of [`Self::insert`].
    #[must_use]
    pub fn with_role(mut self, name: impl Into<String>, permissions: Vec<PermissionSpec>) -> Self {
        self.insert(RoleDefinition::new(name, permissions));
        self
    }

    /// Looks up a role definition by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RoleDefinition> {
        self.roles.iter().find(|r| r.name == name)
    }

    /// Iterates role definitions in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &RoleDefinition> {
        self.roles.iter()
    }

    /// Returns the role names in declaration order.
    #[must_use]
    pub fn role_names(&self) -> Vec<&str> {
        self.roles.iter().map(|r| r.name.as_str()).collect()
    }

    /// Number of roles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.roles.len()
    }

    /// Returns true if no roles are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Restricts the state to the named roles.
    ///
    /// Returns the retained subset (declaration order kept) and the requested
    /// names that are not declared. `None` keeps every role.
    #[must_use]
    pub fn scoped(&self, names: Option<&[String]>) -> (Self, Vec<String>) {
        let Some(names) = names else {
            return (self.clone(), Vec::new());
        };

        let roles = self
            .roles
            .iter()
            .filter(|r| names.iter().any(|n| n == &r.name))
            .cloned()
            .collect();
        let mut unknown: Vec<String> = Vec::new();
        for name in names {
            if self.get(name).is_none() && !unknown.contains(name) {
                unknown.push(name.clone());
            }
        }

        (Self { roles }, unknown)
    }
}

impl<'a> IntoIterator for &'a DesiredState {
    type Item = &'a RoleDefinition;
    type IntoIter = std::slice::Iter<'a, RoleDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.roles.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DesiredState {
        DesiredState::new()
            .with_role("Admin", vec![PermissionSpec::new(Action::Manage, "all")])
            .with_role("Editor", vec![PermissionSpec::new(Action::Update, "Post")])
            .with_role("Guest", vec![PermissionSpec::new(Action::Read, "Post")])
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut state = sample();
        state.insert(RoleDefinition::new("Editor", Vec::new()));
        assert_eq!(state.role_names(), vec!["Admin", "Editor", "Guest"]);
        assert!(state.get("Editor").unwrap().permissions.is_empty());
    }

    #[test]
    fn test_scoped_none_keeps_everything() {
        let (scoped, unknown) = sample().scoped(None);
        assert_eq!(scoped.len(), 3);
        assert!(unknown.is_empty());
    }

    #[test]
    fn test_scoped_keeps_declaration_order() {
        let names = vec!["Guest".to_string(), "Admin".to_string()];
        let (scoped, unknown) = sample().scoped(Some(&names));
        assert_eq!(scoped.role_names(), vec!["Admin", "Guest"]);
        assert!(unknown.is_empty());
    }

    #[test]
    fn test_scoped_reports_unknown_names() {
        let names = vec!["Editor".to_string(), "Auditor".to_string()];
        let (scoped, unknown) = sample().scoped(Some(&names));
        assert_eq!(scoped.role_names(), vec!["Editor"]);
        assert_eq!(unknown, vec!["Auditor".to_string()]);
    }

    #[test]
    fn test_role_permission_specs() {
        let role = Role {
            id: RoleId(1),
            name: "Admin".to_string(),
            permissions: vec![StoredPermission {
                id: PermissionId(4),
                action: Action::Manage,
                subject: "all".to_string(),
                conditions: None,
            }],
        };
        assert_eq!(
            role.permission_specs(),
            vec![PermissionSpec::new(Action::Manage, "all")]
        );
    }
}

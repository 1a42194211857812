//! Permission identity resolution.
//!
//! A permission row is identified by its `(action, subject)` pair. Conditions
//! belong to the row, not to its identity: two grants with the same pair are
//! the same row, and the conditions written last are the ones kept.

use crate::models::{Action, PermissionId, PermissionSpec, StoredPermission};
use std::collections::{BTreeSet, HashSet};
use std::fmt;

/// Identity of a persisted permission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PermissionKey {
    /// Granted verb.
    pub action: Action,
    /// Protected resource type, or `"all"`.
    pub subject: String,
}

impl PermissionKey {
    /// Creates a key from its parts.
    #[must_use]
    pub fn new(action: Action, subject: impl Into<String>) -> Self {
        Self {
            action,
            subject: subject.into(),
        }
    }

    /// Identity of a desired grant.
    #[must_use]
    pub fn of(spec: &PermissionSpec) -> Self {
        Self::new(spec.action, spec.subject.clone())
    }

    /// Identity of a stored row.
    #[must_use]
    pub fn of_stored(permission: &StoredPermission) -> Self {
        Self::new(permission.action, permission.subject.clone())
    }
}

impl From<&PermissionSpec> for PermissionKey {
    fn from(spec: &PermissionSpec) -> Self {
        Self::of(spec)
    }
}

impl fmt::Display for PermissionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.action, self.subject)
    }
}

/// Drops repeated ids, keeping each at its first position.
///
/// Two desired grants that share an identity upsert to the same row, so the
/// id list handed to a bind call can contain repeats.
#[must_use]
pub fn distinct_ids(ids: impl IntoIterator<Item = PermissionId>) -> Vec<PermissionId> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

/// Identity set of a list of grants.
#[must_use]
pub fn identity_set<'a>(specs: impl IntoIterator<Item = &'a PermissionSpec>) -> BTreeSet<PermissionKey> {
    specs.into_iter().map(PermissionKey::of).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Conditions;

    fn owned_by(id: i64) -> Conditions {
        let mut c = Conditions::new();
        c.insert("authorId".to_string(), serde_json::json!(id));
        c
    }

    #[test]
    fn test_conditions_are_not_part_of_identity() {
        let plain = PermissionSpec::new(Action::Read, "Post");
        let narrowed = PermissionSpec::new(Action::Read, "Post").with_conditions(owned_by(1));
        assert_eq!(PermissionKey::of(&plain), PermissionKey::of(&narrowed));
        assert_ne!(
            PermissionKey::of(&plain),
            PermissionKey::of(&PermissionSpec::new(Action::Update, "Post"))
        );
    }

    #[test]
    fn test_stored_and_desired_keys_agree() {
        let stored = StoredPermission {
            id: PermissionId(3),
            action: Action::Manage,
            subject: "all".to_string(),
            conditions: Some(owned_by(2)),
        };
        assert_eq!(
            PermissionKey::of_stored(&stored),
            PermissionKey::new(Action::Manage, "all")
        );
    }

    #[test]
    fn test_distinct_ids_keeps_first_occurrence() {
        let ids = [PermissionId(4), PermissionId(2), PermissionId(4), PermissionId(9), PermissionId(2)];
        assert_eq!(
            distinct_ids(ids),
            vec![PermissionId(4), PermissionId(2), PermissionId(9)]
        );
    }

    #[test]
    fn test_identity_set_ignores_conditions() {
        let specs = vec![
            PermissionSpec::new(Action::Read, "Post").with_conditions(owned_by(1)),
            PermissionSpec::new(Action::Read, "Post"),
            PermissionSpec::new(Action::Create, "Comment"),
        ];
        let set = identity_set(&specs);
        assert_eq!(set.len(), 2);
        assert!(set.contains(&PermissionKey::new(Action::Create, "Comment")));
    }

    #[test]
    fn test_key_display() {
        assert_eq!(PermissionKey::new(Action::Read, "Post").to_string(), "read Post");
    }
}

//! Request-time permission checks.
//!
//! An [`Ability`] is built from a role's permissions and answers whether an
//! action on a subject is allowed. `manage` grants every action and the
//! subject `all` matches every subject. Conditions match when every
//! condition key is present in the supplied attributes with an equal value.

use crate::models::{Action, ALL_SUBJECTS, Conditions, PermissionSpec, Role};

/// Stateless permission evaluator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ability {
    rules: Vec<PermissionSpec>,
}

impl Ability {
    /// Builds an ability from a list of grants.
    #[must_use]
    pub fn from_permissions(permissions: impl IntoIterator<Item = PermissionSpec>) -> Self {
        Self {
            rules: permissions.into_iter().collect(),
        }
    }

    /// Builds an ability from a persisted role.
    #[must_use]
    pub fn for_role(role: &Role) -> Self {
        Self::from_permissions(role.permission_specs())
    }

    /// Returns true if no rule is defined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    fn matching<'a>(&'a self, action: Action, subject: &'a str) -> impl Iterator<Item = &'a PermissionSpec> {
        self.rules.iter().filter(move |rule| {
            (rule.action == Action::Manage || rule.action == action)
                && (rule.subject == ALL_SUBJECTS || rule.subject == subject)
        })
    }

    /// Checks the action against a subject type.
    ///
    /// Conditional rules count: a user who may update their own comments
    /// may update `Comment` in general.
    #[must_use]
    pub fn can(&self, action: Action, subject: &str) -> bool {
        self.matching(action, subject).next().is_some()
    }

    /// Checks the action against a concrete subject instance described by
    /// its attributes.
    #[must_use]
    pub fn can_on(&self, action: Action, subject: &str, attributes: &Conditions) -> bool {
        self.matching(action, subject).any(|rule| {
            rule.conditions.as_ref().is_none_or(|conditions| {
                conditions
                    .iter()
                    .all(|(key, expected)| attributes.get(key) == Some(expected))
            })
        })
    }

    /// Negation of [`Self::can`].
    #[must_use]
    pub fn cannot(&self, action: Action, subject: &str) -> bool {
        !self.can(action, subject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs(value: serde_json::Value) -> Conditions {
        value.as_object().cloned().unwrap_or_default()
    }

    fn user() -> Ability {
        Ability::from_permissions([
            PermissionSpec::new(Action::Read, "Post"),
            PermissionSpec::new(Action::Update, "Comment")
                .with_conditions(attrs(json!({"authorId": 7}))),
        ])
    }

    #[test]
    fn test_manage_all_allows_everything() {
        let ability = Ability::from_permissions([PermissionSpec::new(Action::Manage, "all")]);
        for action in Action::all() {
            assert!(ability.can(*action, "Invoice"));
        }
    }

    #[test]
    fn test_manage_is_scoped_to_subject() {
        let ability = Ability::from_permissions([PermissionSpec::new(Action::Manage, "Post")]);
        assert!(ability.can(Action::Delete, "Post"));
        assert!(ability.cannot(Action::Read, "Comment"));
    }

    #[test]
    fn test_exact_rules() {
        let ability = user();
        assert!(ability.can(Action::Read, "Post"));
        assert!(ability.cannot(Action::Delete, "Post"));
        assert!(Ability::default().cannot(Action::Read, "Post"));
    }

    #[test]
    fn test_conditions_on_instances() {
        let ability = user();
        assert!(ability.can(Action::Update, "Comment"));
        assert!(ability.can_on(Action::Update, "Comment", &attrs(json!({"authorId": 7, "id": 1}))));
        assert!(!ability.can_on(Action::Update, "Comment", &attrs(json!({"authorId": 8}))));
        assert!(!ability.can_on(Action::Update, "Comment", &Conditions::new()));
        assert!(ability.can_on(Action::Read, "Post", &Conditions::new()));
    }
}

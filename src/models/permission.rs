//! Permission types and the action vocabulary.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque structured predicate attached to a permission.
///
/// The catalog stores and compares conditions as data only; it never
/// interprets them. Evaluation lives in [`crate::ability`].
pub type Conditions = serde_json::Map<String, serde_json::Value>;

/// Verbs a permission can grant.
///
/// `Manage` implies every other action for the same subject when evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Every action on the subject.
    Manage,
    /// Create new instances of the subject.
    Create,
    /// Read instances of the subject.
    Read,
    /// Modify instances of the subject.
    Update,
    /// Remove instances of the subject.
    Delete,
}

impl Action {
    /// Returns all actions in vocabulary order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Manage,
            Self::Create,
            Self::Read,
            Self::Update,
            Self::Delete,
        ]
    }

    /// Returns the action as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Manage => "manage",
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    /// Parses an action name.
    ///
    /// Matching is exact: the vocabulary is lowercase and `"Read"` is rejected.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::all().iter().copied().find(|a| a.as_str() == s)
    }

    /// Returns the vocabulary as a comma-separated list for error messages.
    #[must_use]
    pub fn vocabulary() -> String {
        Self::all()
            .iter()
            .map(Self::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Action {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        Self::parse(s).ok_or_else(|| {
            crate::Error::InvalidInput(format!(
                "unknown action '{s}' (expected one of: {})",
                Self::vocabulary()
            ))
        })
    }
}

/// Subject sentinel meaning every subject.
pub const ALL_SUBJECTS: &str = "all";

/// A desired grant: one action on one subject, optionally narrowed by conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionSpec {
    /// Granted verb.
    pub action: Action,
    /// Protected resource type, or `"all"`.
    pub subject: String,
    /// Optional narrowing predicate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Conditions>,
}

impl PermissionSpec {
    /// Creates an unconditional permission.
    #[must_use]
    pub fn new(action: Action, subject: impl Into<String>) -> Self {
        Self {
            action,
            subject: subject.into(),
            conditions: None,
        }
    }

    /// Attaches conditions to the permission.
    #[must_use]
    pub fn with_conditions(mut self, conditions: Conditions) -> Self {
        self.conditions = Some(conditions);
        self
    }
}

impl fmt::Display for PermissionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.action, self.subject)?;
        if let Some(conditions) = &self.conditions {
            write!(f, " if {}", serde_json::Value::Object(conditions.clone()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_parse_is_exact() {
        assert_eq!(Action::parse("manage"), Some(Action::Manage));
        assert_eq!(Action::parse("delete"), Some(Action::Delete));
        assert_eq!(Action::parse("Read"), None);
        assert_eq!(Action::parse("publish"), None);
    }

    #[test]
    fn test_action_from_str_error_lists_vocabulary() {
        let err = "publish".parse::<Action>().unwrap_err();
        assert!(
            err.to_string()
                .contains("manage, create, read, update, delete")
        );
    }

    #[test]
    fn test_permission_spec_serde() {
        let spec: PermissionSpec = serde_json::from_str(
            r#"{"action":"update","subject":"Comment","conditions":{"authorId":"${user.id}"}}"#,
        )
        .unwrap();
        assert_eq!(spec.action, Action::Update);
        assert_eq!(spec.subject, "Comment");
        assert!(spec.conditions.is_some());

        let plain = serde_json::to_string(&PermissionSpec::new(Action::Read, "Post")).unwrap();
        assert_eq!(plain, r#"{"action":"read","subject":"Post"}"#);
    }

    #[test]
    fn test_permission_spec_display() {
        let mut conditions = Conditions::new();
        conditions.insert("authorId".to_string(), serde_json::json!(7));
        let spec = PermissionSpec::new(Action::Delete, "Comment").with_conditions(conditions);
        assert_eq!(spec.to_string(), r#"delete Comment if {"authorId":7}"#);
    }
}

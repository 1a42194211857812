//! Desired-state schema validation.

use super::loader::RawDesiredState;
use crate::models::{Action, DesiredState, PermissionSpec, RoleDefinition};
use serde_json::Value;
use std::fmt;
use thiserror::Error as ThisError;

/// Why a role definition was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationKind {
    /// The role's permissions are not a list.
    NotAList,
    /// A permission lacks `action` or `subject`.
    MissingField,
    /// The action is not one of the known verbs.
    InvalidAction(String),
    /// The subject is not a string.
    SubjectNotString,
    /// The conditions are present but not an object.
    ConditionsNotObject,
}

/// A desired-state schema violation.
///
/// `index` is the zero-based position of the offending permission within its
/// role, absent when the role as a whole is malformed.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
#[error("{message}")]
pub struct ValidationError {
    /// Role the violation belongs to.
    pub role: String,
    /// Position of the offending permission.
    pub index: Option<usize>,
    /// What is wrong.
    pub reason: ViolationKind,
    message: String,
}

impl ValidationError {
    /// Creates a validation error.
    #[must_use]
    pub fn new(role: impl Into<String>, index: Option<usize>, reason: ViolationKind) -> Self {
        let role = role.into();
        let message = render(&role, index, &reason);
        Self {
            role,
            index,
            reason,
            message,
        }
    }
}

fn render(role: &str, index: Option<usize>, reason: &ViolationKind) -> String {
    let at = Position(index);
    match reason {
        ViolationKind::NotAList => format!("Permissions for role \"{role}\" must be an array"),
        ViolationKind::MissingField => {
            format!("Permission {at} for role \"{role}\" must have \"action\" and \"subject\" properties")
        },
        ViolationKind::InvalidAction(action) => format!(
            "Invalid action \"{action}\" for role \"{role}\". Valid actions: {}",
            Action::vocabulary()
        ),
        ViolationKind::SubjectNotString => {
            format!("Subject must be a string for permission {at} in role \"{role}\"")
        },
        ViolationKind::ConditionsNotObject => {
            format!("Conditions must be an object for permission {at} in role \"{role}\"")
        },
    }
}

struct Position(Option<usize>);

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(index) => write!(f, "{index}"),
            None => f.write_str("?"),
        }
    }
}

/// Validates a raw desired state and converts it into typed role definitions.
///
/// Roles and permissions are checked in document order and the first
/// violation is returned.
///
/// # Errors
///
/// Returns a [`ValidationError`] describing the first violation.
pub fn validate_desired_state(raw: &RawDesiredState) -> Result<DesiredState, ValidationError> {
    let mut state = DesiredState::new();
    for (role, permissions) in raw {
        let Value::Array(entries) = permissions else {
            return Err(ValidationError::new(role, None, ViolationKind::NotAList));
        };

        let permissions = entries
            .iter()
            .enumerate()
            .map(|(index, entry)| validate_permission(role, index, entry))
            .collect::<Result<Vec<_>, _>>()?;
        state.insert(RoleDefinition::new(role.clone(), permissions));
    }
    Ok(state)
}

fn validate_permission(role: &str, index: usize, entry: &Value) -> Result<PermissionSpec, ValidationError> {
    let fail = |reason| ValidationError::new(role, Some(index), reason);

    let action = entry.get("action").filter(|v| is_present(v));
    let subject = entry.get("subject").filter(|v| is_present(v));
    let (Some(action), Some(subject)) = (action, subject) else {
        return Err(fail(ViolationKind::MissingField));
    };

    let action = match action {
        Value::String(name) => Action::parse(name)
            .ok_or_else(|| fail(ViolationKind::InvalidAction(name.clone())))?,
        other => return Err(fail(ViolationKind::InvalidAction(other.to_string()))),
    };

    let Value::String(subject) = subject else {
        return Err(fail(ViolationKind::SubjectNotString));
    };

    let conditions = match entry.get("conditions") {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) => Some(map.clone()),
        Some(_) => return Err(fail(ViolationKind::ConditionsNotObject)),
    };

    Ok(PermissionSpec {
        action,
        subject: subject.clone(),
        conditions,
    })
}

/// Empty strings, `false`, zero and `null` count as missing.
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Array(_) | Value::Object(_) => true,
    }
}

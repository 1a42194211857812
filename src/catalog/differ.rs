//! Desired-versus-actual role classification.

use crate::Result;
use crate::models::{PermissionSpec, Role, RoleDefinition, RoleId};
use crate::storage::RoleStore;

/// What reconciliation will do with one desired role.
///
/// The decision rests on existence and the force flag alone; permission
/// content is never compared.
#[derive(Debug, Clone, PartialEq)]
pub enum RolePlan {
    /// The role is absent from the store.
    Create {
        /// Role name.
        name: String,
        /// Desired permissions.
        permissions: Vec<PermissionSpec>,
    },
    /// The role exists and force mode replaces its permission set.
    Replace {
        /// Role name.
        name: String,
        /// Identifier of the existing role.
        role_id: RoleId,
        /// Desired permissions.
        permissions: Vec<PermissionSpec>,
    },
    /// The role exists and is left untouched.
    Skip {
        /// Role name.
        name: String,
    },
}

impl RolePlan {
    /// Name of the role the plan applies to.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Create { name, .. } | Self::Replace { name, .. } | Self::Skip { name } => name,
        }
    }

    /// Short label for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Replace { .. } => "replace",
            Self::Skip { .. } => "skip",
        }
    }
}

/// Classifies one desired role against its lookup result.
#[must_use]
pub fn classify(definition: &RoleDefinition, existing: Option<&Role>, force: bool) -> RolePlan {
    match existing {
        None => RolePlan::Create {
            name: definition.name.clone(),
            permissions: definition.permissions.clone(),
        },
        Some(role) if force => RolePlan::Replace {
            name: definition.name.clone(),
            role_id: role.id,
            permissions: definition.permissions.clone(),
        },
        Some(_) => RolePlan::Skip {
            name: definition.name.clone(),
        },
    }
}

/// Classifies desired roles by looking each one up in the store.
///
/// Performs exactly one read per role and never writes.
pub struct StateDiffer<'a, S: RoleStore + ?Sized> {
    store: &'a S,
    force: bool,
}

impl<'a, S: RoleStore + ?Sized> StateDiffer<'a, S> {
    /// Creates a differ over the given store.
    #[must_use]
    pub const fn new(store: &'a S, force: bool) -> Self {
        Self { store, force }
    }

    /// Looks the role up and classifies it.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    pub fn plan_role(&self, definition: &RoleDefinition) -> Result<RolePlan> {
        let existing = self.store.find_role_by_name(&definition.name)?;
        let plan = classify(definition, existing.as_ref(), self.force);
        tracing::debug!(role = %definition.name, plan = plan.kind(), "classified role");
        Ok(plan)
    }
}

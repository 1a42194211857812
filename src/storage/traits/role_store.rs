//! Role store trait.

use crate::Result;
use crate::models::{Action, Conditions, PermissionId, Role, RoleId};

/// Trait for role catalog stores.
///
/// Stores are the authoritative source of truth for roles and permission
/// rows. A permission row is identified by its `(action, subject)` pair and
/// may be bound to any number of roles; roles own only the bindings.
///
/// Every method is a single unit of work. Callers sequence them; the store
/// provides no cross-call transaction.
pub trait RoleStore: Send + Sync {
    /// Retrieves a role and its bound permissions by name.
    fn find_role_by_name(&self, name: &str) -> Result<Option<Role>>;

    /// Inserts the `(action, subject)` permission, or overwrites the
    /// conditions of the existing row with that identity.
    ///
    /// Never creates a second row for the same identity.
    fn upsert_permission(
        &self,
        action: Action,
        subject: &str,
        conditions: Option<&Conditions>,
    ) -> Result<PermissionId>;

    /// Binds the role to exactly the given permissions.
    ///
    /// Duplicate ids are bound once.
    fn replace_role_permissions(&self, role_id: RoleId, permissions: &[PermissionId])
    -> Result<()>;

    /// Creates a role bound to the given permissions.
    fn create_role(&self, name: &str, permissions: &[PermissionId]) -> Result<RoleId>;

    /// Removes every permission binding of the role.
    ///
    /// Permission rows are left in place.
    fn detach_all_permissions(&self, role_id: RoleId) -> Result<()>;

    /// Lists all roles ordered by name.
    fn list_roles(&self) -> Result<Vec<Role>>;
}

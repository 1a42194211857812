//! Data models for permsync.
//!
//! Permissions, roles, store identifiers and the desired-state container.

mod permission;
mod role;

pub use permission::{ALL_SUBJECTS, Action, Conditions, PermissionSpec};
pub use role::{DesiredState, PermissionId, Role, RoleDefinition, RoleId, StoredPermission};

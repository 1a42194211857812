//! In-memory role store.
//!
//! Mirrors the `SQLite` store's semantics (unique names, unique
//! `(action, subject)` identities, referential checks) without touching disk.
//! Used by tests, benchmarks and embedders that keep the catalog in process.

use crate::models::{Action, Conditions, PermissionId, Role, RoleId, StoredPermission};
use crate::storage::sqlite::{acquire_lock, record_operation_metrics, status_label};
use crate::storage::traits::RoleStore;
use crate::{Error, Result};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;
use std::time::Instant;
use tracing::instrument;

const BACKEND: &str = "memory";

#[derive(Debug, Default)]
struct RoleRow {
    name: String,
    permissions: BTreeSet<PermissionId>,
}

#[derive(Debug, Default)]
struct CatalogState {
    roles: BTreeMap<RoleId, RoleRow>,
    permissions: BTreeMap<PermissionId, StoredPermission>,
    identities: HashMap<(Action, String), PermissionId>,
    next_role_id: i64,
    next_permission_id: i64,
}

impl CatalogState {
    fn role_id_by_name(&self, name: &str) -> Option<RoleId> {
        self.roles
            .iter()
            .find(|(_, row)| row.name == name)
            .map(|(id, _)| *id)
    }

    fn materialize(&self, id: RoleId, row: &RoleRow) -> Role {
        Role {
            id,
            name: row.name.clone(),
            permissions: row
                .permissions
                .iter()
                .filter_map(|pid| self.permissions.get(pid).cloned())
                .collect(),
        }
    }

    fn check_permissions(&self, permissions: &[PermissionId]) -> Result<()> {
        match permissions
            .iter()
            .find(|pid| !self.permissions.contains_key(pid))
        {
            Some(missing) => Err(Error::OperationFailed {
                operation: "bind_permission".to_string(),
                cause: format!("permission {missing}: FOREIGN KEY constraint failed"),
            }),
            None => Ok(()),
        }
    }
}

/// In-memory role store guarded by a single mutex.
#[derive(Debug, Default)]
pub struct MemoryRoleStore {
    state: Mutex<CatalogState>,
}

impl MemoryRoleStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of permission rows, bound or not.
    #[must_use]
    pub fn permission_count(&self) -> usize {
        acquire_lock(&self.state).permissions.len()
    }
}

impl RoleStore for MemoryRoleStore {
    #[instrument(skip(self), fields(operation = "find_role_by_name", backend = BACKEND))]
    fn find_role_by_name(&self, name: &str) -> Result<Option<Role>> {
        let start = Instant::now();
        let state = acquire_lock(&self.state);
        let result: Result<Option<Role>> = Ok(state
            .roles
            .iter()
            .find(|(_, row)| row.name == name)
            .map(|(id, row)| state.materialize(*id, row)));
        record_operation_metrics(BACKEND, "find_role_by_name", start, status_label(&result));
        result
    }

    #[instrument(
        skip(self, conditions),
        fields(operation = "upsert_permission", backend = BACKEND, action = %action)
    )]
    fn upsert_permission(
        &self,
        action: Action,
        subject: &str,
        conditions: Option<&Conditions>,
    ) -> Result<PermissionId> {
        let start = Instant::now();
        let mut state = acquire_lock(&self.state);
        let key = (action, subject.to_string());

        let id = if let Some(id) = state.identities.get(&key).copied() {
            if let Some(row) = state.permissions.get_mut(&id) {
                row.conditions = conditions.cloned();
            }
            id
        } else {
            state.next_permission_id += 1;
            let id = PermissionId(state.next_permission_id);
            state.permissions.insert(
                id,
                StoredPermission {
                    id,
                    action,
                    subject: subject.to_string(),
                    conditions: conditions.cloned(),
                },
            );
            state.identities.insert(key, id);
            id
        };

        let result: Result<PermissionId> = Ok(id);
        record_operation_metrics(BACKEND, "upsert_permission", start, status_label(&result));
        result
    }

    #[instrument(skip(self, permissions), fields(operation = "replace_role_permissions", backend = BACKEND))]
    fn replace_role_permissions(
        &self,
        role_id: RoleId,
        permissions: &[PermissionId],
    ) -> Result<()> {
        let start = Instant::now();
        let mut state = acquire_lock(&self.state);
        let result = state.check_permissions(permissions).and_then(|()| {
            let row = state
                .roles
                .get_mut(&role_id)
                .ok_or_else(|| Error::NotFound(format!("role with id {role_id}")))?;
            row.permissions = permissions.iter().copied().collect();
            Ok(())
        });
        record_operation_metrics(
            BACKEND,
            "replace_role_permissions",
            start,
            status_label(&result),
        );
        result
    }

    #[instrument(skip(self, permissions), fields(operation = "create_role", backend = BACKEND))]
    fn create_role(&self, name: &str, permissions: &[PermissionId]) -> Result<RoleId> {
        let start = Instant::now();
        let mut state = acquire_lock(&self.state);
        let result: Result<RoleId> = (|| {
            if state.role_id_by_name(name).is_some() {
                return Err(Error::OperationFailed {
                    operation: "create_role".to_string(),
                    cause: format!("UNIQUE constraint failed: roles.name ({name})"),
                });
            }
            state.check_permissions(permissions)?;

            state.next_role_id += 1;
            let id = RoleId(state.next_role_id);
            state.roles.insert(
                id,
                RoleRow {
                    name: name.to_string(),
                    permissions: permissions.iter().copied().collect(),
                },
            );
            Ok(id)
        })();
        record_operation_metrics(BACKEND, "create_role", start, status_label(&result));
        result
    }

    #[instrument(skip(self), fields(operation = "detach_all_permissions", backend = BACKEND))]
    fn detach_all_permissions(&self, role_id: RoleId) -> Result<()> {
        let start = Instant::now();
        let mut state = acquire_lock(&self.state);
        let result = state
            .roles
            .get_mut(&role_id)
            .map(|row| row.permissions.clear())
            .ok_or_else(|| Error::NotFound(format!("role with id {role_id}")));
        record_operation_metrics(
            BACKEND,
            "detach_all_permissions",
            start,
            status_label(&result),
        );
        result
    }

    #[instrument(skip(self), fields(operation = "list_roles", backend = BACKEND))]
    fn list_roles(&self) -> Result<Vec<Role>> {
        let start = Instant::now();
        let state = acquire_lock(&self.state);
        let mut roles: Vec<Role> = state
            .roles
            .iter()
            .map(|(id, row)| state.materialize(*id, row))
            .collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        let result: Result<Vec<Role>> = Ok(roles);
        record_operation_metrics(BACKEND, "list_roles", start, status_label(&result));
        result
    }
}

//! `SQLite`-based role store.
//!
//! Provides durable storage of the role catalog using `SQLite` as the
//! authoritative source of truth.

use crate::models::{Action, Conditions, PermissionId, Role, RoleId, StoredPermission};
use crate::storage::sqlite::{
    acquire_lock, configure_connection, decode_action, decode_conditions, encode_conditions,
    initialize_schema, record_operation_metrics, status_label,
};
use crate::storage::traits::RoleStore;
use crate::{Error, Result, current_timestamp};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Instant;
use tracing::instrument;

const BACKEND: &str = "sqlite";

/// `SQLite`-based role store.
///
/// # Concurrency Model
///
/// Uses a `Mutex<Connection>` for thread-safe access. Each trait method holds
/// the lock for its whole unit of work; multi-statement methods run inside a
/// `BEGIN IMMEDIATE` transaction so a failure leaves no partial binding.
///
/// # Schema
///
/// - `roles (id, name UNIQUE, created_at, updated_at)`
/// - `permissions (id, action, subject, conditions, updated_at, UNIQUE(action, subject))`
/// - `role_permissions (role_id, permission_id)` with cascading deletes
pub struct SqliteRoleStore {
    /// Protected by Mutex because `rusqlite::Connection` is not `Sync`.
    conn: Mutex<Connection>,
    /// Path to the `SQLite` database (None for in-memory).
    db_path: Option<PathBuf>,
}

impl SqliteRoleStore {
    /// Opens (creating if needed) a role store at the given path.
    ///
    /// Missing parent directories are created.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::OperationFailed {
                operation: "create_database_dir".to_string(),
                cause: format!("{}: {e}", parent.display()),
            })?;
        }

        let conn = Connection::open(&db_path).map_err(|e| Error::OperationFailed {
            operation: "open_sqlite".to_string(),
            cause: format!("{}: {e}", db_path.display()),
        })?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path: Some(db_path),
        };
        store.initialize()?;
        Ok(store)
    }

    /// Creates an in-memory role store (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| Error::OperationFailed {
            operation: "open_sqlite_in_memory".to_string(),
            cause: e.to_string(),
        })?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path: None,
        };
        store.initialize()?;
        Ok(store)
    }

    /// Returns the database path (None for in-memory).
    #[must_use]
    pub const fn db_path(&self) -> Option<&PathBuf> {
        self.db_path.as_ref()
    }

    fn initialize(&self) -> Result<()> {
        let conn = acquire_lock(&self.conn);
        configure_connection(&conn)?;
        initialize_schema(&conn)
    }
}

/// Runs `op` inside an immediate transaction, committing on success.
fn in_transaction<T>(conn: &Connection, op: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
    conn.execute("BEGIN IMMEDIATE", [])
        .map_err(|e| Error::OperationFailed {
            operation: "begin_transaction".to_string(),
            cause: e.to_string(),
        })?;

    let result = op(conn);

    if result.is_ok() {
        if let Err(e) = conn.execute("COMMIT", []) {
            // A failed COMMIT can leave the transaction open.
            let _ = conn.execute("ROLLBACK", []);
            return Err(Error::OperationFailed {
                operation: "commit_transaction".to_string(),
                cause: e.to_string(),
            });
        }
    } else {
        let _ = conn.execute("ROLLBACK", []);
    }

    result
}

fn now_i64() -> i64 {
    i64::try_from(current_timestamp()).unwrap_or(i64::MAX)
}

/// Loads the permissions bound to a role, ordered by permission id.
fn load_permissions(conn: &Connection, role_id: RoleId) -> Result<Vec<StoredPermission>> {
    let mut stmt = conn
        .prepare(
            "SELECT p.id, p.action, p.subject, p.conditions
             FROM permissions p
             JOIN role_permissions rp ON rp.permission_id = p.id
             WHERE rp.role_id = ?1
             ORDER BY p.id",
        )
        .map_err(|e| Error::OperationFailed {
            operation: "prepare_load_permissions".to_string(),
            cause: e.to_string(),
        })?;

    let rows = stmt
        .query_map(params![role_id.0], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
            ))
        })
        .map_err(|e| Error::OperationFailed {
            operation: "load_permissions".to_string(),
            cause: e.to_string(),
        })?;

    let mut permissions = Vec::new();
    for row in rows {
        let (id, action, subject, conditions) = row.map_err(|e| Error::OperationFailed {
            operation: "read_permission_row".to_string(),
            cause: e.to_string(),
        })?;
        permissions.push(StoredPermission {
            id: PermissionId(id),
            action: decode_action(&action)?,
            subject,
            conditions: decode_conditions(conditions.as_deref())?,
        });
    }
    Ok(permissions)
}

/// Touches the role row, failing if it does not exist.
fn touch_role(conn: &Connection, role_id: RoleId) -> Result<()> {
    let updated = conn
        .execute(
            "UPDATE roles SET updated_at = ?1 WHERE id = ?2",
            params![now_i64(), role_id.0],
        )
        .map_err(|e| Error::OperationFailed {
            operation: "touch_role".to_string(),
            cause: e.to_string(),
        })?;

    if updated == 0 {
        return Err(Error::NotFound(format!("role with id {role_id}")));
    }
    Ok(())
}

fn bind_permissions(conn: &Connection, role_id: RoleId, permissions: &[PermissionId]) -> Result<()> {
    let mut stmt = conn
        .prepare("INSERT OR IGNORE INTO role_permissions (role_id, permission_id) VALUES (?1, ?2)")
        .map_err(|e| Error::OperationFailed {
            operation: "prepare_bind_permission".to_string(),
            cause: e.to_string(),
        })?;

    for permission in permissions {
        stmt.execute(params![role_id.0, permission.0])
            .map_err(|e| Error::OperationFailed {
                operation: "bind_permission".to_string(),
                cause: format!("permission {permission}: {e}"),
            })?;
    }
    Ok(())
}

fn unbind_all(conn: &Connection, role_id: RoleId) -> Result<()> {
    conn.execute(
        "DELETE FROM role_permissions WHERE role_id = ?1",
        params![role_id.0],
    )
    .map(|_| ())
    .map_err(|e| Error::OperationFailed {
        operation: "unbind_permissions".to_string(),
        cause: e.to_string(),
    })
}

impl RoleStore for SqliteRoleStore {
    #[instrument(skip(self), fields(operation = "find_role_by_name", backend = BACKEND))]
    fn find_role_by_name(&self, name: &str) -> Result<Option<Role>> {
        let start = Instant::now();
        let result: Result<Option<Role>> = (|| {
            let conn = acquire_lock(&self.conn);

            let row: Option<(i64, String)> = conn
                .query_row(
                    "SELECT id, name FROM roles WHERE name = ?1",
                    params![name],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()
                .map_err(|e| Error::OperationFailed {
                    operation: "find_role_by_name".to_string(),
                    cause: e.to_string(),
                })?;

            let Some((id, name)) = row else {
                return Ok(None);
            };
            let id = RoleId(id);
            let permissions = load_permissions(&conn, id)?;

            Ok(Some(Role {
                id,
                name,
                permissions,
            }))
        })();

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
        let result: Result<PermissionId> = (|| {
            let encoded = encode_conditions(conditions)?;
            let conn = acquire_lock(&self.conn);

            conn.query_row(
                "INSERT INTO permissions (action, subject, conditions, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (action, subject) DO UPDATE SET
                     conditions = excluded.conditions,
                     updated_at = excluded.updated_at
                 RETURNING id",
                params![action.as_str(), subject, encoded, now_i64()],
                |row| row.get::<_, i64>(0),
            )
            .map(PermissionId)
            .map_err(|e| Error::OperationFailed {
                operation: "upsert_permission".to_string(),
                cause: e.to_string(),
            })
        })();

        record_operation_metrics(BACKEND, "upsert_permission", start, status_label(&result));
        result
    }

    #[instrument(
        skip(self, permissions),
        fields(operation = "replace_role_permissions", backend = BACKEND, count = permissions.len())
    )]
    fn replace_role_permissions(
        &self,
        role_id: RoleId,
        permissions: &[PermissionId],
    ) -> Result<()> {
        let start = Instant::now();
        let result: Result<()> = (|| {
            let conn = acquire_lock(&self.conn);
            in_transaction(&conn, |conn| {
                touch_role(conn, role_id)?;
                unbind_all(conn, role_id)?;
                bind_permissions(conn, role_id, permissions)
            })
        })();

        record_operation_metrics(
            BACKEND,
            "replace_role_permissions",
            start,
            status_label(&result),
        );
        result
    }

    #[instrument(
        skip(self, permissions),
        fields(operation = "create_role", backend = BACKEND, count = permissions.len())
    )]
    fn create_role(&self, name: &str, permissions: &[PermissionId]) -> Result<RoleId> {
        let start = Instant::now();
        let result: Result<RoleId> = (|| {
            let conn = acquire_lock(&self.conn);
            in_transaction(&conn, |conn| {
                let now = now_i64();
                conn.execute(
                    "INSERT INTO roles (name, created_at, updated_at) VALUES (?1, ?2, ?3)",
                    params![name, now, now],
                )
                .map_err(|e| Error::OperationFailed {
                    operation: "create_role".to_string(),
                    cause: e.to_string(),
                })?;

                let role_id = RoleId(conn.last_insert_rowid());
                bind_permissions(conn, role_id, permissions)?;
                Ok(role_id)
            })
        })();

        record_operation_metrics(BACKEND, "create_role", start, status_label(&result));
        result
    }

    #[instrument(skip(self), fields(operation = "detach_all_permissions", backend = BACKEND))]
    fn detach_all_permissions(&self, role_id: RoleId) -> Result<()> {
        let start = Instant::now();
        let result: Result<()> = (|| {
            let conn = acquire_lock(&self.conn);
            in_transaction(&conn, |conn| {
                touch_role(conn, role_id)?;
                unbind_all(conn, role_id)
            })
        })();

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
        let result: Result<Vec<Role>> = (|| {
            let conn = acquire_lock(&self.conn);

            let heads: Vec<(i64, String)> = {
                let mut stmt = conn
                    .prepare("SELECT id, name FROM roles ORDER BY name")
                    .map_err(|e| Error::OperationFailed {
                        operation: "prepare_list_roles".to_string(),
                        cause: e.to_string(),
                    })?;
                let rows = stmt
                    .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
                    .map_err(|e| Error::OperationFailed {
                        operation: "list_roles".to_string(),
                        cause: e.to_string(),
                    })?;
                rows.collect::<std::result::Result<_, _>>()
                    .map_err(|e| Error::OperationFailed {
                        operation: "read_role_row".to_string(),
                        cause: e.to_string(),
                    })?
            };

            heads
                .into_iter()
                .map(|(id, name)| {
                    let id = RoleId(id);
                    Ok(Role {
                        id,
                        name,
                        permissions: load_permissions(&conn, id)?,
                    })
                })
                .collect()
        })();

        record_operation_metrics(BACKEND, "list_roles", start, status_label(&result));
        result
    }
}

//! Role catalog schema and column codecs.

use crate::models::{Action, Conditions};
use crate::{Error, Result};
use rusqlite::Connection;

/// Creates the catalog tables if they do not exist.
///
/// - `roles`: unique `name`
/// - `permissions`: unique `(action, subject)`, conditions as JSON text
/// - `role_permissions`: bindings, removed with either side
///
/// # Errors
///
/// Returns an error if any statement fails.
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS roles (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS permissions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            action TEXT NOT NULL,
            subject TEXT NOT NULL,
            conditions TEXT,
            updated_at INTEGER NOT NULL,
            UNIQUE (action, subject)
        );
        CREATE TABLE IF NOT EXISTS role_permissions (
            role_id INTEGER NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
            permission_id INTEGER NOT NULL REFERENCES permissions(id) ON DELETE CASCADE,
            PRIMARY KEY (role_id, permission_id)
        );
        CREATE INDEX IF NOT EXISTS idx_role_permissions_permission
            ON role_permissions(permission_id);",
    )
    .map_err(|e| Error::OperationFailed {
        operation: "create_catalog_tables".to_string(),
        cause: e.to_string(),
    })
}

/// Serializes conditions for the `conditions` column.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode_conditions(conditions: Option<&Conditions>) -> Result<Option<String>> {
    conditions
        .map(|c| {
            serde_json::to_string(c).map_err(|e| Error::OperationFailed {
                operation: "encode_conditions".to_string(),
                cause: e.to_string(),
            })
        })
        .transpose()
}

/// Parses the `conditions` column back into an object.
///
/// # Errors
///
/// Returns an error if the stored text is not a JSON object.
pub fn decode_conditions(raw: Option<&str>) -> Result<Option<Conditions>> {
    raw.map(|text| {
        serde_json::from_str::<Conditions>(text).map_err(|e| Error::OperationFailed {
            operation: "decode_conditions".to_string(),
            cause: e.to_string(),
        })
    })
    .transpose()
}

/// Parses the `action` column.
pub(crate) fn decode_action(raw: &str) -> Result<Action> {
    Action::parse(raw).ok_or_else(|| Error::OperationFailed {
        operation: "decode_action".to_string(),
        cause: format!("unknown action '{raw}' in store"),
    })
}

//! # Permsync
//!
//! Declarative synchronization of a role-based permission catalog.
//!
//! Permsync reads a desired-state file mapping role names to permission
//! lists and reconciles a persistent store against it: absent roles are
//! created, existing roles are skipped or, in force mode, have their
//! permission set replaced. Dry runs classify every role without writing.
//!
//! ## Features
//!
//! - Declarative desired state (YAML, JSON or TOML), never executable code
//! - Upsert-by-identity permission rows shared across roles
//! - Dry-run, force and role-scoped reconciliation
//! - `SQLite` and in-memory stores behind a single [`RoleStore`] trait
//! - Stateless ability evaluation for request-time permission checks
//!
//! ## Example
//!
//! ```rust,ignore
//! use permsync::{DesiredState, MemoryRoleStore, Reconciler, SyncOptions};
//!
//! let store = MemoryRoleStore::new();
//! let desired = permsync::desired::load_and_validate("config/roles.yaml")?;
//! let report = Reconciler::new(&store, SyncOptions::default()).run(&desired);
//! println!("{}", report.summary());
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use std::path::PathBuf;
use thiserror::Error as ThisError;

pub mod ability;
pub mod catalog;
pub mod config;
pub mod desired;
pub mod models;
pub mod observability;
pub mod storage;

pub use ability::Ability;
pub use catalog::{
    OutcomeReporter, PermissionKey, Reconciler, RoleOutcome, RolePlan, RoleReport, StateDiffer,
    SyncOptions, SyncReport, SyncStats,
};
pub use config::PermsyncConfig;
pub use desired::{ValidationError, load_desired_state, validate_desired_state};
pub use models::{
    Action, Conditions, DesiredState, PermissionId, PermissionSpec, Role, RoleDefinition, RoleId,
    StoredPermission,
};
pub use storage::{MemoryRoleStore, RoleStore, SqliteRoleStore};

/// Error type for permsync operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `ConfigNotFound` | The desired-state file does not exist |
/// | `ConfigMalformed` | The desired-state file cannot be parsed |
/// | `Validation` | The desired state violates the schema rules |
/// | `OperationFailed` | Store queries fail, I/O errors occur |
/// | `InvalidInput` | CLI arguments or the database location cannot be interpreted |
/// | `NotFound` | A required role does not exist in the store |
#[derive(Debug, ThisError)]
pub enum Error {
    /// The desired-state file does not exist.
    #[error("configuration file not found: {}", path.display())]
    ConfigNotFound {
        /// The path that was looked up.
        path: PathBuf,
    },

    /// The desired-state file exists but could not be parsed.
    ///
    /// Raised when:
    /// - The file is not valid YAML, JSON or TOML
    /// - The top level (or the `roles` key) is not a mapping
    #[error("failed to load configuration {}: {cause}", path.display())]
    ConfigMalformed {
        /// The file that failed to parse.
        path: PathBuf,
        /// The underlying cause.
        cause: String,
    },

    /// The desired state failed schema validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// An operation failed.
    ///
    /// Raised when:
    /// - `SQLite` queries or schema initialization fail
    /// - Filesystem I/O errors occur
    /// - Logging cannot be initialized
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A required entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

impl Error {
    /// Returns true for errors raised while loading or validating the desired state.
    ///
    /// These are fatal for a sync run; every other error is recoverable per role.
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigNotFound { .. } | Self::ConfigMalformed { .. } | Self::Validation(_)
        )
    }

    pub(crate) fn operation(operation: &str, cause: impl ToString) -> Self {
        Self::OperationFailed {
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }
}

/// Result type alias for permsync operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Returns the current Unix timestamp in seconds.
#[must_use]
pub fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidInput("test error".to_string());
        assert_eq!(err.to_string(), "invalid input: test error");

        let err = Error::OperationFailed {
            operation: "upsert_permission".to_string(),
            cause: "disk I/O error".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "operation 'upsert_permission' failed: disk I/O error"
        );

        let err = Error::ConfigNotFound {
            path: PathBuf::from("config/roles.yaml"),
        };
        assert_eq!(
            err.to_string(),
            "configuration file not found: config/roles.yaml"
        );
    }

    #[test]
    fn test_is_config_error() {
        assert!(
            Error::ConfigNotFound {
                path: PathBuf::from("x")
            }
            .is_config_error()
        );
        assert!(
            Error::ConfigMalformed {
                path: PathBuf::from("x"),
                cause: "bad".to_string()
            }
            .is_config_error()
        );
        assert!(!Error::operation("create_role", "locked").is_config_error());
        assert!(!Error::NotFound("Admin".to_string()).is_config_error());
    }
}

//! Command handlers module.
//!
//! - `sync.rs`: reconcile the catalog with a desired-state file
//! - `validate.rs`: load and validate a desired-state file
//! - `init.rs`: write a starter desired-state file
//! - `check.rs`: evaluate a persisted role's ability
//! - `roles.rs`: list persisted roles

mod check;
mod init;
mod roles;
mod sync;
mod validate;

pub use check::cmd_check;
pub use init::cmd_init;
pub use roles::cmd_roles;
pub use sync::{SyncArgs, cmd_sync};
pub use validate::cmd_validate;

use permsync::SqliteRoleStore;
use permsync::config::PermsyncConfig;
use permsync::storage::DatabaseLocation;
use std::path::PathBuf;

/// Resolves the desired-state path from the flag or the settings.
fn desired_path(config: &PermsyncConfig, path: Option<PathBuf>) -> PathBuf {
    path.unwrap_or_else(|| config.roles_config.clone())
}

/// Opens the configured catalog.
fn open_store(config: &PermsyncConfig) -> Result<SqliteRoleStore, Box<dyn std::error::Error>> {
    let location = DatabaseLocation::parse(&config.database)?;
    tracing::debug!(database = %location, "opening catalog");
    Ok(location.open()?)
}

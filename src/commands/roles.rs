//! Roles command.

use super::open_store;
use permsync::RoleStore;
use permsync::config::PermsyncConfig;

/// Roles command.
///
/// # Errors
///
/// Returns an error if the catalog cannot be opened or read.
pub fn cmd_roles(config: &PermsyncConfig, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(config)?;
    let roles = store.list_roles()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&roles)?);
        return Ok(());
    }

    if roles.is_empty() {
        println!("No roles in catalog. Run `permsync sync` first.");
        return Ok(());
    }

    for role in &roles {
        println!("{} ({} permissions)", role.name, role.permissions.len());
        for permission in role.permission_specs() {
            println!("  - {permission}");
        }
    }
    Ok(())
}

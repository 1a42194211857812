//! Validate command.

use super::desired_path;
use permsync::config::PermsyncConfig;
use permsync::desired::load_and_validate;
use std::path::PathBuf;

/// Validate command.
///
/// # Errors
///
/// Returns an error if the file is missing, unparsable or invalid.
pub fn cmd_validate(
    config: &PermsyncConfig,
    path: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let path = desired_path(config, path);
    let desired = load_and_validate(&path)
        .map_err(|e| format!("Configuration validation failed: {e}"))?;

    let permissions: usize = desired.iter().map(|role| role.permissions.len()).sum();
    println!(
        "Configuration is valid: {} roles, {permissions} permissions ({})",
        desired.len(),
        path.display()
    );
    Ok(())
}

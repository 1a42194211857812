//! Init command.

use super::desired_path;
use permsync::config::PermsyncConfig;
use permsync::desired::{Template, write_template};
use std::path::PathBuf;

/// Init command.
///
/// # Errors
///
/// Returns an error if the file exists without `--overwrite` or cannot be written.
pub fn cmd_init(
    config: &PermsyncConfig,
    path: Option<PathBuf>,
    bare: bool,
    overwrite: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let path = desired_path(config, path);
    let template = if bare { Template::Bare } else { Template::Example };
    write_template(&path, template, overwrite)?;

    println!("Configuration initialized: {}", path.display());
    println!("Run `permsync sync --dry-run` to preview the changes.");
    Ok(())
}

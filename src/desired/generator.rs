//! Starter desired-state files for `permsync init`.

use super::loader::{Format, RawDesiredState};
use crate::models::{Action, Conditions, DesiredState, PermissionSpec};
use crate::{Error, Result};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Which starter file to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Template {
    /// A typical blog-style catalog with five roles.
    #[default]
    Example,
    /// An empty role mapping.
    Bare,
}

/// Desired state written by [`Template::Example`].
#[must_use]
pub fn example_state() -> DesiredState {
    use Action::{Create, Delete, Manage, Read, Update};

    let own = || {
        let mut conditions = Conditions::new();
        conditions.insert("authorId".to_string(), Value::String("${user.id}".to_string()));
        conditions
    };

    DesiredState::new()
        .with_role("SuperAdmin", vec![PermissionSpec::new(Manage, "all")])
        .with_role(
            "Admin",
            vec![
                PermissionSpec::new(Create, "User"),
                PermissionSpec::new(Read, "User"),
                PermissionSpec::new(Update, "User"),
                PermissionSpec::new(Delete, "User"),
                PermissionSpec::new(Manage, "Post"),
                PermissionSpec::new(Manage, "Comment"),
            ],
        )
        .with_role(
            "Editor",
            vec![
                PermissionSpec::new(Create, "Post"),
                PermissionSpec::new(Read, "Post"),
                PermissionSpec::new(Update, "Post"),
                PermissionSpec::new(Delete, "Post"),
                PermissionSpec::new(Manage, "Comment"),
            ],
        )
        .with_role(
            "User",
            vec![
                PermissionSpec::new(Read, "Post"),
                PermissionSpec::new(Create, "Comment"),
                PermissionSpec::new(Update, "Comment").with_conditions(own()),
                PermissionSpec::new(Delete, "Comment").with_conditions(own()),
            ],
        )
        .with_role("Guest", vec![PermissionSpec::new(Read, "Post")])
}

/// Converts a desired state back into its document form.
///
/// # Errors
///
/// Returns an error if a permission cannot be serialized.
pub fn to_raw(state: &DesiredState) -> Result<RawDesiredState> {
    let mut raw = RawDesiredState::new();
    for role in state {
        let permissions =
            serde_json::to_value(&role.permissions).map_err(|e| Error::operation("render_config", e))?;
        raw.insert(role.name.clone(), permissions);
    }
    Ok(raw)
}

/// Renders a template in the given format.
///
/// The role mapping is nested under a top-level `roles` key.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render(template: Template, format: Format) -> Result<String> {
    let roles = match template {
        Template::Example => to_raw(&example_state())?,
        Template::Bare => RawDesiredState::new(),
    };
    let mut document = RawDesiredState::new();
    document.insert("roles".to_string(), Value::Object(roles));
    let document = Value::Object(document);

    let body = match format {
        Format::Yaml => serde_yaml_ng::to_string(&document).map_err(|e| Error::operation("render_config", e))?,
        Format::Json => {
            let mut json = serde_json::to_string_pretty(&document)
                .map_err(|e| Error::operation("render_config", e))?;
            json.push('\n');
            return Ok(json);
        },
        Format::Toml => toml::to_string(&document).map_err(|e| Error::operation("render_config", e))?,
    };
    Ok(format!("# Role definitions synchronized by `permsync sync`\n{body}"))
}

/// Writes a starter file, creating parent directories.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if the file exists and `overwrite` is
/// false, or an operation error if writing fails.
pub fn write_template(path: &Path, template: Template, overwrite: bool) -> Result<()> {
    if path.exists() && !overwrite {
        return Err(Error::InvalidInput(format!(
            "{} already exists (use --overwrite to replace it)",
            path.display()
        )));
    }

    let contents = render(template, Format::from_path(path))?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::operation("create_config_dir", e))?;
    }
    fs::write(path, contents).map_err(|e| Error::operation("write_config", e))?;

    tracing::info!(path = %path.display(), ?template, "wrote desired-state template");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desired::{load_desired_state, validate_desired_state};
    use tempfile::TempDir;

    #[test]
    fn test_example_round_trips_through_every_format() {
        let dir = TempDir::new().unwrap();
        for name in ["roles.yaml", "roles.json", "roles.toml"] {
            let path = dir.path().join("config").join(name);
            write_template(&path, Template::Example, false).unwrap();

            let raw = load_desired_state(&path).unwrap();
            let state = validate_desired_state(&raw).unwrap();
            let expected = example_state();
            assert_eq!(state.len(), expected.len(), "format {name}");
            for role in &expected {
                assert_eq!(state.get(&role.name), Some(role), "format {name}");
            }
        }
    }

    #[test]
    fn test_bare_template_is_empty_and_valid() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("roles.yaml");
        write_template(&path, Template::Bare, false).unwrap();
        let state = validate_desired_state(&load_desired_state(&path).unwrap()).unwrap();
        assert!(state.is_empty());
    }

    #[test]
    fn test_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("roles.yaml");
        fs::write(&path, "Admin: []\n").unwrap();

        assert!(matches!(
            write_template(&path, Template::Example, false),
            Err(Error::InvalidInput(_))
        ));
        assert_eq!(fs::read_to_string(&path).unwrap(), "Admin: []\n");

        write_template(&path, Template::Bare, true).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("roles"));
    }

    #[test]
    fn test_example_roles() {
        let state = example_state();
        assert_eq!(
            state.role_names(),
            vec!["SuperAdmin", "Admin", "Editor", "User", "Guest"]
        );
    }
}

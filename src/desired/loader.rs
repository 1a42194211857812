//! Desired-state file loading.

use crate::{Error, Result};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// Parsed but unvalidated desired state: role name to raw permission list.
pub type RawDesiredState = Map<String, Value>;

/// Key under which a document may nest its role mapping.
const ROLES_KEY: &str = "roles";

/// Document formats accepted for desired-state files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// YAML (`.yaml`, `.yml`), also used for unknown extensions.
    Yaml,
    /// JSON (`.json`).
    Json,
    /// TOML (`.toml`).
    Toml,
}

impl Format {
    /// Picks the format from the file extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("json") => Self::Json,
            Some("toml") => Self::Toml,
            _ => Self::Yaml,
        }
    }

    fn parse(self, text: &str) -> std::result::Result<Value, String> {
        match self {
            Self::Yaml => serde_yaml_ng::from_str(text).map_err(|e| e.to_string()),
            Self::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
            Self::Toml => toml::from_str(text).map_err(|e| e.to_string()),
        }
    }
}

/// Loads a desired-state document.
///
/// The document is either the role mapping itself or a mapping whose only
/// key is `roles`, holding the role mapping.
///
/// # Errors
///
/// Returns [`Error::ConfigNotFound`] if the file does not exist and
/// [`Error::ConfigMalformed`] if it cannot be read or parsed, or if it
/// does not contain a mapping.
pub fn load_desired_state(path: impl AsRef<Path>) -> Result<RawDesiredState> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::ConfigNotFound {
            path: path.to_path_buf(),
        });
    }

    let malformed = |cause: String| Error::ConfigMalformed {
        path: path.to_path_buf(),
        cause,
    };

    let text = fs::read_to_string(path).map_err(|e| malformed(e.to_string()))?;
    let document = Format::from_path(path).parse(&text).map_err(malformed)?;
    let raw = unwrap_roles(document).map_err(malformed)?;

    tracing::debug!(path = %path.display(), roles = raw.len(), "loaded desired state");
    Ok(raw)
}

fn unwrap_roles(document: Value) -> std::result::Result<RawDesiredState, String> {
    let Value::Object(mut map) = document else {
        return Err("configuration must contain a mapping of role names".to_string());
    };

    if map.len() == 1 && map.get(ROLES_KEY).is_some_and(Value::is_object) {
        if let Some(Value::Object(roles)) = map.remove(ROLES_KEY) {
            return Ok(roles);
        }
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = load_desired_state(dir.path().join("roles.yaml")).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound { .. }));
    }

    #[test]
    fn test_yaml_keeps_declaration_order() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "roles.yaml",
            "Zeta:\n  - { action: read, subject: Post }\nAlpha: []\n",
        );
        let raw = load_desired_state(path).unwrap();
        assert_eq!(raw.keys().collect::<Vec<_>>(), vec!["Zeta", "Alpha"]);
    }

    #[test]
    fn test_roles_key_is_unwrapped() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "roles.json",
            r#"{"roles": {"Admin": [{"action": "manage", "subject": "all"}]}}"#,
        );
        let raw = load_desired_state(path).unwrap();
        assert!(raw.contains_key("Admin"));
    }

    #[test]
    fn test_role_named_roles_is_not_unwrapped() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "roles.json", r#"{"roles": []}"#);
        let raw = load_desired_state(path).unwrap();
        assert!(raw.contains_key("roles"));
    }

    #[test]
    fn test_toml_document() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "roles.toml",
            "[[Admin]]\naction = \"manage\"\nsubject = \"all\"\n",
        );
        let raw = load_desired_state(path).unwrap();
        assert_eq!(raw["Admin"][0]["subject"], "all");
    }

    #[test]
    fn test_non_mapping_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "roles.yml", "- Admin\n- User\n");
        let err = load_desired_state(path).unwrap_err();
        assert!(matches!(err, Error::ConfigMalformed { .. }));
    }

    #[test]
    fn test_syntax_error_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "roles.json", "{ not json");
        assert!(matches!(
            load_desired_state(path).unwrap_err(),
            Error::ConfigMalformed { .. }
        ));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(Format::from_path(Path::new("a.JSON")), Format::Json);
        assert_eq!(Format::from_path(Path::new("a.toml")), Format::Toml);
        assert_eq!(Format::from_path(Path::new("a.yml")), Format::Yaml);
        assert_eq!(Format::from_path(Path::new("roles")), Format::Yaml);
    }
}

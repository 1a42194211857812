//! Tool settings.
//!
//! Settings describe where permsync keeps its catalog and how it logs. They
//! are separate from the desired-state document, which describes roles.
//!
//! Resolution order:
//! 1. An explicit `--settings` path
//! 2. `PERMSYNC_SETTINGS_PATH`
//! 3. `<platform config dir>/permsync/config.toml`
//! 4. Built-in defaults
//!
//! After loading, `PERMSYNC_DATABASE_URL` and then `DATABASE_URL` override
//! the database location. `DATABASE_URL` is often shared with other tools, so
//! it is only honored when it names a `SQLite` location.

use crate::desired::DEFAULT_CONFIG_PATH;
use crate::storage::DatabaseLocation;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming the settings file.
pub const SETTINGS_PATH_ENV: &str = "PERMSYNC_SETTINGS_PATH";

/// Environment variables overriding the database location, highest priority first.
pub const DATABASE_ENV: [&str; 2] = ["PERMSYNC_DATABASE_URL", SHARED_DATABASE_ENV];

/// Database variable shared with other tools; ignored unless it names `SQLite`.
const SHARED_DATABASE_ENV: &str = "DATABASE_URL";

/// Default catalog database.
pub const DEFAULT_DATABASE: &str = "./.permsync/permissions.db";

/// Main configuration for permsync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermsyncConfig {
    /// Catalog location: a path, a `sqlite://` URL or `:memory:`.
    pub database: String,
    /// Default desired-state document.
    pub roles_config: PathBuf,
    /// Logging settings.
    pub logging: LoggingSettings,
    /// Problems found while loading, reported once logging is up.
    pub notices: Vec<String>,
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggingSettings {
    /// `pretty` or `json`.
    pub format: Option<String>,
    /// Filter directive such as `info` or `permsync=debug`.
    pub level: Option<String>,
    /// Log file; stderr when unset.
    pub file: Option<PathBuf>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Catalog location.
    pub database: Option<String>,
    /// Desired-state document.
    pub roles_config: Option<String>,
    /// Logging section.
    pub logging: Option<ConfigFileLogging>,
}

/// Logging section in config file.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileLogging {
    /// Output format.
    pub format: Option<String>,
    /// Filter directive.
    pub level: Option<String>,
    /// Log file path.
    pub file: Option<String>,
}

impl Default for PermsyncConfig {
    fn default() -> Self {
        Self {
            database: DEFAULT_DATABASE.to_string(),
            roles_config: PathBuf::from(DEFAULT_CONFIG_PATH),
            logging: LoggingSettings::default(),
            notices: Vec::new(),
        }
    }
}

impl PermsyncConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_settings_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;

        let file: ConfigFile = toml::from_str(&contents).map_err(|e| Error::OperationFailed {
            operation: "parse_settings_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;

        Ok(Self::from_config_file(file))
    }

    /// Loads configuration from the platform config directory.
    ///
    /// Returns default configuration if no readable file is found.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let platform_config = base_dirs.config_dir().join("permsync").join("config.toml");
        Self::load_optional(&platform_config)
    }

    /// Loads a settings file that may be absent or broken.
    ///
    /// A broken file is skipped and recorded in [`Self::notices`].
    #[must_use]
    pub fn load_optional(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from_file(path) {
            Ok(config) => config,
            Err(e) => {
                let mut config = Self::default();
                config
                    .notices
                    .push(format!("ignoring unreadable settings file: {e}"));
                config
            },
        }
    }

    /// Resolves settings in order, then applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly named settings file (argument or
    /// `PERMSYNC_SETTINGS_PATH`) cannot be loaded.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let from_env = std::env::var_os(SETTINGS_PATH_ENV).map(PathBuf::from);
        let mut config = match explicit.map(Path::to_path_buf).or(from_env) {
            Some(path) => Self::load_from_file(&path)?,
            None => Self::load_default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Applies database overrides from the given variable lookup.
    ///
    /// A `DATABASE_URL` that is not a `SQLite` location is skipped with a notice.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for key in DATABASE_ENV {
            let Some(url) = lookup(key).filter(|v| !v.trim().is_empty()) else {
                continue;
            };
            if key == SHARED_DATABASE_ENV && DatabaseLocation::parse(&url).is_err() {
                self.notices.push(format!(
                    "ignoring {key}: not a SQLite location, using {}",
                    self.database
                ));
                return;
            }
            self.database = url;
            return;
        }
    }

    /// Converts a `ConfigFile` to `PermsyncConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(database) = file.database {
            config.database = database;
        }
        if let Some(roles_config) = file.roles_config {
            config.roles_config = PathBuf::from(roles_config);
        }
        if let Some(logging) = file.logging {
            config.logging.format = logging.format;
            config.logging.level = logging.level;
            config.logging.file = logging.file.map(PathBuf::from);
        }

        config
    }

    /// Sets the database location.
    #[must_use]
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }
}

//! Storage layer abstraction.
//!
//! The reconciler talks to a [`RoleStore`]; two implementations ship:
//! - [`SqliteRoleStore`]: durable catalog in a `SQLite` database
//! - [`MemoryRoleStore`]: process-local catalog for tests and embedding

// Allow significant_drop_tightening - holding the connection guard for a
// whole unit of work is intended.
#![allow(clippy::significant_drop_tightening)]

pub mod persistence;
pub mod sqlite;
pub mod traits;

pub use persistence::{MemoryRoleStore, SqliteRoleStore};
pub use traits::RoleStore;

use crate::{Error, Result};
use std::path::PathBuf;

/// Where the role catalog lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    /// A `SQLite` database file.
    File(PathBuf),
    /// A private in-memory `SQLite` database.
    Memory,
}

impl DatabaseLocation {
    /// Parses a database URL or path.
    ///
    /// Accepts plain paths, `sqlite://path`, `sqlite:path`, `file:path` and
    /// `:memory:` / `sqlite::memory:`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an empty location or a URL with any
    /// other scheme, such as `postgresql://`.
    pub fn parse(url: &str) -> Result<Self> {
        let trimmed = url.trim();
        let path = trimmed
            .strip_prefix("sqlite://")
            .or_else(|| trimmed.strip_prefix("sqlite:"))
            .or_else(|| trimmed.strip_prefix("file:"))
            .unwrap_or(trimmed);

        if let Some(scheme) = url_scheme(path) {
            return Err(Error::InvalidInput(format!(
                "unsupported database scheme `{scheme}`: expected a SQLite path, `sqlite://` URL or `:memory:`"
            )));
        }
        if path.is_empty() {
            return Err(Error::InvalidInput("database location is empty".to_string()));
        }

        if path == ":memory:" {
            Ok(Self::Memory)
        } else {
            Ok(Self::File(PathBuf::from(path)))
        }
    }

    /// Opens a `SQLite` store at this location.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn open(&self) -> Result<SqliteRoleStore> {
        match self {
            Self::File(path) => SqliteRoleStore::new(path),
            Self::Memory => SqliteRoleStore::in_memory(),
        }
    }
}

/// Returns the scheme of a `scheme://` URL.
fn url_scheme(location: &str) -> Option<&str> {
    let (scheme, _) = location.split_once("://")?;
    let mut chars = scheme.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some(scheme)
}

impl std::fmt::Display for DatabaseLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Memory => f.write_str(":memory:"),
        }
    }
}

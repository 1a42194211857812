//! Desired-state documents: loading, validation and starter templates.
//!
//! A desired-state document maps role names to permission lists:
//!
//! ```yaml
//! roles:
//!   Admin:
//!     - { action: manage, subject: all }
//!   User:
//!     - { action: read, subject: Post }
//!     - action: update
//!       subject: Comment
//!       conditions: { authorId: "${user.id}" }
//! ```
//!
//! The document is data only. It is parsed, validated, and then handed to
//! the reconciler as a [`DesiredState`].

mod generator;
mod loader;
mod validation;

pub use generator::{Template, example_state, render, to_raw, write_template};
pub use loader::{Format, RawDesiredState, load_desired_state};
pub use validation::{ValidationError, ViolationKind, validate_desired_state};

use crate::Result;
use crate::models::DesiredState;
use std::path::Path;

/// Default location of the desired-state document.
pub const DEFAULT_CONFIG_PATH: &str = "./config/roles.yaml";

/// Loads and validates a desired-state document.
///
/// # Errors
///
/// Returns a configuration error if the file is missing, unparsable or
/// fails validation.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<DesiredState> {
    let raw = load_desired_state(path)?;
    Ok(validate_desired_state(&raw)?)
}

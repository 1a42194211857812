//! Check command.

use super::open_store;
use permsync::config::PermsyncConfig;
use permsync::{Ability, Action, Conditions, Error, RoleStore};
use serde_json::Value;

/// Parses `KEY=VALUE` pairs; values that parse as JSON keep their type.
fn parse_attributes(pairs: &[String]) -> Result<Conditions, Error> {
    let mut attributes = Conditions::new();
    for pair in pairs {
        let (key, raw) = pair
            .split_once('=')
            .ok_or_else(|| Error::InvalidInput(format!("expected KEY=VALUE, got '{pair}'")))?;
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        attributes.insert(key.trim().to_string(), value);
    }
    Ok(attributes)
}

/// Check command.
///
/// Prints `allowed` or `denied`.
///
/// # Errors
///
/// Returns an error if the action is unknown, an attribute is malformed, the
/// catalog cannot be opened or the role does not exist.
pub fn cmd_check(
    config: &PermsyncConfig,
    role: &str,
    action: &str,
    subject: &str,
    attributes: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let action: Action = action.parse()?;
    let attributes = parse_attributes(attributes)?;

    let store = open_store(config)?;
    let persisted = store
        .find_role_by_name(role)?
        .ok_or_else(|| Error::NotFound(format!("role '{role}'")))?;
    let ability = Ability::for_role(&persisted);

    let allowed = if attributes.is_empty() {
        ability.can(action, subject)
    } else {
        ability.can_on(action, subject, &attributes)
    };
    tracing::debug!(role, %action, subject, allowed, "evaluated ability");

    println!("{}", if allowed { "allowed" } else { "denied" });
    Ok(())
}

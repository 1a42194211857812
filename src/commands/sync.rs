//! Sync command.

use super::{desired_path, open_store};
use permsync::config::PermsyncConfig;
use permsync::desired::load_and_validate;
use permsync::{DesiredState, Error, Reconciler, RoleStore, SyncOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Arguments of `permsync sync`.
pub struct SyncArgs {
    /// Desired-state file, defaulting to the settings value.
    pub path: Option<PathBuf>,
    /// Report only.
    pub dry_run: bool,
    /// Print every role's outcome.
    pub verbose: bool,
    /// Replace existing roles' permissions.
    pub force: bool,
    /// Restrict to these roles.
    pub roles: Option<Vec<String>>,
    /// Print the report as JSON.
    pub json: bool,
}

/// Sync command.
///
/// Loading, validating and opening the store are fatal. Once reconciliation
/// starts the command always prints a summary and succeeds, even when
/// individual roles fail.
///
/// # Errors
///
/// Returns an error if the desired state cannot be loaded or validated, or
/// if the catalog cannot be opened.
pub fn cmd_sync(config: &PermsyncConfig, args: SyncArgs) -> Result<(), Box<dyn std::error::Error>> {
    let cancel = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&cancel);
    if let Err(e) = ctrlc::set_handler(move || handler_flag.store(true, Ordering::SeqCst)) {
        tracing::warn!(error = %e, "could not install Ctrl-C handler");
    }

    let stdout = std::io::stdout();
    run_sync(config, args, cancel, &mut stdout.lock())
}

/// Loads the desired state, opens the catalog and reconciles.
///
/// Nothing is written to `out` when a fatal error is returned.
fn run_sync(
    config: &PermsyncConfig,
    args: SyncArgs,
    cancel: Arc<AtomicBool>,
    out: &mut impl Write,
) -> Result<(), Box<dyn std::error::Error>> {
    let path = desired_path(config, args.path.clone());
    let desired = match load_and_validate(&path) {
        Ok(desired) => desired,
        Err(e @ Error::ConfigNotFound { .. }) => {
            return Err(format!("{e} (run `permsync init` to create one)").into());
        },
        Err(e) => return Err(e.into()),
    };
    let store = open_store(config)?;
    reconcile_and_print(&store, &desired, args, cancel, out)
}

fn reconcile_and_print<S: RoleStore + ?Sized>(
    store: &S,
    desired: &DesiredState,
    args: SyncArgs,
    cancel: Arc<AtomicBool>,
    out: &mut impl Write,
) -> Result<(), Box<dyn std::error::Error>> {
    if args.dry_run && !args.json {
        writeln!(out, "Dry run mode - no changes will be made")?;
        writeln!(out)?;
    }

    let options = SyncOptions {
        dry_run: args.dry_run,
        verbose: args.verbose,
        force: args.force,
        roles: args.roles,
    };
    let report = Reconciler::new(store, options)
        .with_cancellation(cancel)
        .run(desired);

    if args.json {
        writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
        return Ok(());
    }

    for line in report.detail_lines() {
        writeln!(out, "{line}")?;
    }
    writeln!(out)?;
    write!(out, "{}", report.summary())?;
    Ok(())
}

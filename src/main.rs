//! Binary entry point for permsync.
//!
//! This binary provides the CLI interface for synchronizing a role and
//! permission catalog with a desired-state document.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

mod commands;

use clap::{Parser, Subcommand};
use permsync::config::PermsyncConfig;
use permsync::observability::{self, LoggingConfig};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Permsync - declarative role and permission catalog synchronization.
#[derive(Parser)]
#[command(name = "permsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the tool settings file.
    #[arg(short, long, global = true)]
    settings: Option<PathBuf>,

    /// Catalog database (path, `sqlite://` URL or `:memory:`).
    #[arg(long, global = true)]
    database: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Sync roles and permissions to the catalog.
    Sync {
        /// Desired-state file.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Show what would be synced without making changes.
        #[arg(short, long)]
        dry_run: bool,

        /// Replace the permissions of existing roles.
        #[arg(short, long)]
        force: bool,

        /// Sync specific roles only (comma-separated).
        #[arg(short, long, value_delimiter = ',')]
        roles: Option<Vec<String>>,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Validate a desired-state file.
    Validate {
        /// Desired-state file.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Write a starter desired-state file.
    Init {
        /// Where to write the file.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write an empty role mapping instead of the example roles.
        #[arg(long)]
        bare: bool,

        /// Replace an existing file.
        #[arg(long)]
        overwrite: bool,
    },

    /// Check whether a persisted role grants an action on a subject.
    Check {
        /// Role name.
        #[arg(long)]
        role: String,

        /// Action to check.
        #[arg(long)]
        action: String,

        /// Subject type.
        #[arg(long)]
        subject: String,

        /// Subject attributes as KEY=VALUE, matched against conditions.
        #[arg(long = "attr")]
        attributes: Vec<String>,
    },

    /// List persisted roles and their permissions.
    Roles {
        /// Print roles as JSON.
        #[arg(long)]
        json: bool,
    },
}

/// Main entry point.
fn main() -> ExitCode {
    let cli = Cli::parse();
    let _ = dotenvy::dotenv();

    let config = match load_config(cli.settings.as_deref(), cli.database.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load settings: {e}");
            return ExitCode::FAILURE;
        },
    };

    let logging = LoggingConfig::from_settings(Some(&config.logging), cli.verbose);
    if let Err(e) = observability::init(&logging) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }
    for notice in &config.notices {
        tracing::warn!("{notice}");
    }

    let result = run_command(cli, &config);
    exit_code(&result, &mut std::io::stderr())
}

/// Maps a command result to the process exit code, printing fatal errors.
fn exit_code(result: &Result<(), Box<dyn std::error::Error>>, err: &mut impl Write) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let _ = writeln!(err, "Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
fn run_command(cli: Cli, config: &PermsyncConfig) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Sync {
            config: path,
            dry_run,
            force,
            roles,
            json,
        } => commands::cmd_sync(
            config,
            commands::SyncArgs {
                path,
                dry_run,
                verbose: cli.verbose,
                force,
                roles,
                json,
            },
        ),

        Commands::Validate { config: path } => commands::cmd_validate(config, path),

        Commands::Init {
            config: path,
            bare,
            overwrite,
        } => commands::cmd_init(config, path, bare, overwrite),

        Commands::Check {
            role,
            action,
            subject,
            attributes,
        } => commands::cmd_check(config, &role, &action, &subject, &attributes),

        Commands::Roles { json } => commands::cmd_roles(config, json),
    }
}

/// Loads settings and applies the `--database` override.
fn load_config(
    settings: Option<&Path>,
    database: Option<&str>,
) -> Result<PermsyncConfig, Box<dyn std::error::Error>> {
    let config = PermsyncConfig::load(settings)?;
    Ok(match database {
        Some(url) => config.with_database(url),
        None => config,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code() {
        let mut err = Vec::new();
        assert_eq!(exit_code(&Ok(()), &mut err), ExitCode::SUCCESS);
        assert!(err.is_empty());

        let failed: Result<(), Box<dyn std::error::Error>> = Err("catalog unavailable".into());
        assert_eq!(exit_code(&failed, &mut err), ExitCode::FAILURE);
        assert_eq!(String::from_utf8(err).unwrap(), "Error: catalog unavailable\n");
    }

    #[test]
    fn test_cli_parses_sync_flags() {
        let cli = Cli::try_parse_from([
            "permsync", "sync", "-c", "roles.yaml", "--dry-run", "--force", "-r", "Admin,Editor", "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Commands::Sync { dry_run: true, force: true, roles: Some(ref roles), .. }
                if roles == &["Admin", "Editor"]
        ));
    }
}

// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::error::ErrorKind;
use clap::{ArgGroup, Parser, ValueEnum};

/// Command-line arguments for `rebuild-gate`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "rebuild-gate",
    version,
    about = "Rebuild and package the dashboard when its data file changes.",
    long_about = None
)]
#[command(group(ArgGroup::new("mode").args(["force", "status"])))]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Relative paths inside the config are resolved against its directory.
    #[arg(long, value_name = "PATH", default_value = "Rebuild.toml")]
    pub config: String,

    /// Rebuild unconditionally, ignoring the stored fingerprint.
    #[arg(long)]
    pub force: bool,

    /// Print the current fingerprint, last rebuild time and whether a change
    /// is pending. Never modifies state.
    #[arg(long)]
    pub status: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `REBUILD_GATE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate the config and print the resolved pipeline without
    /// executing anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// The operation selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// No mode flag: rebuild only if the watched file changed.
    Check,
    Force,
    Status,
}

impl CliArgs {
    pub fn mode(&self) -> Mode {
        if self.force {
            Mode::Force
        } else if self.status {
            Mode::Status
        } else {
            Mode::Check
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Parse the process arguments.
///
/// `--help` / `--version` print and exit 0; any other parse error prints the
/// usage message to stderr and exits with code 1.
pub fn parse() -> CliArgs {
    match CliArgs::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = err.print();
            std::process::exit(code);
        }
    }
}

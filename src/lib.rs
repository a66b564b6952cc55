// src/lib.rs

pub mod cli;
pub mod config;
pub mod deploy;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fingerprint;
pub mod fs;
pub mod logging;
pub mod state;
pub mod types;

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};

use crate::cli::{CliArgs, Mode};
use crate::config::{config_root_dir, default_config_path, load_and_validate, Settings};
use crate::engine::{Outcome, RebuildTrigger};
use crate::exec::BuildPipeline;

/// Load and resolve settings from the config file at `config`.
///
/// A missing file at the default location falls back to built-in defaults
/// rooted at the current directory; a missing file that was asked for
/// explicitly is an error.
pub fn load_settings(config: &str) -> Result<Settings> {
    let config_path = PathBuf::from(config);
    let root = config_root_dir(&config_path);

    if !config_path.exists() && config_path == default_config_path() {
        return Ok(Settings::with_root(&root));
    }

    let cfg = load_and_validate(&config_path)
        .with_context(|| format!("loading config {:?}", config_path))?;
    Ok(cfg.resolve(&root))
}

/// High-level entry point used by `main.rs`.
///
/// Wires the build pipeline and the trigger from `settings`, runs the mode
/// selected on the command line, and returns whether the process should exit
/// successfully.
pub async fn run(args: &CliArgs, settings: &Settings) -> Result<bool> {
    if args.dry_run {
        print_dry_run(settings);
        return Ok(true);
    }

    let backend = BuildPipeline::new(settings.build.clone(), settings.deploy.clone());
    let mut trigger = RebuildTrigger::from_settings(&settings.watch, backend);

    let outcome = match args.mode() {
        Mode::Status => {
            info!("mode: status");
            print!("{}", trigger.status());
            return Ok(true);
        }
        Mode::Force => {
            info!("mode: forced rebuild");
            trigger.force_rebuild().await
        }
        Mode::Check => {
            info!("mode: check and rebuild if changed");
            trigger.check_and_rebuild().await
        }
    };

    log_outcome(&outcome);
    Ok(outcome.is_success())
}

fn log_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::MissingFile => warn!("finished: watched file missing, nothing done"),
        Outcome::FingerprintUnavailable => {
            warn!("finished: watched file unreadable, nothing done")
        }
        Outcome::Busy => warn!("finished: another run holds the lock, nothing done"),
        Outcome::BaselineRecorded(fp) => info!(fingerprint = %fp, "finished: baseline recorded"),
        Outcome::InSync(fp) => info!(fingerprint = %fp, "finished: in sync"),
        Outcome::Rebuilt { report, .. } => info!(
            elapsed_s = report.elapsed.as_secs_f64(),
            artifact = ?report.artifact,
            "finished: rebuilt and packaged"
        ),
        Outcome::Failed(e) => error!(error = %e, "finished: rebuild failed"),
    }
}

/// Simple dry-run output: print the resolved paths and pipeline.
fn print_dry_run(settings: &Settings) {
    println!("rebuild-gate dry-run");
    println!("  watch.file       = {}", settings.watch.watched_file.display());
    println!("  watch.state_file = {}", settings.watch.state_file.display());
    println!("  watch.first_run  = {:?}", settings.watch.first_run);
    println!();

    println!("build (in {}):", settings.build.working_dir.display());
    println!("  timeout per step: {}s", settings.build.timeout.as_secs());
    for path in settings.build.clean.iter() {
        println!("  clean: {}", path.display());
    }
    for step in settings.build.steps.iter() {
        println!("  - {}", step.name);
        println!("      cmd: {} {}", step.program, step.args.join(" "));
        if !step.env.is_empty() {
            println!("      env: {:?}", step.env);
        }
    }
    println!("  output: {}", settings.build.output_dir.display());
    println!();

    println!("deploy:");
    println!("  artifact: {}", settings.deploy.artifact.display());
    println!("  keep_backups: {}", settings.deploy.keep_backups);
    if let Some(dir) = &settings.log_dir {
        println!("log dir: {}", dir.display());
    }

    debug!("dry-run complete (no execution)");
}

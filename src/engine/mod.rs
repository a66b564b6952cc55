// src/engine/mod.rs

//! Change-gated rebuild engine.
//!
//! The pure decision function lives in [`core`]; [`trigger`] wraps it with
//! the IO around one invocation: fingerprinting the watched file, loading
//! and saving state, taking the lock, and calling the rebuild backend.

use std::fmt;
use std::path::PathBuf;

use crate::deploy::DeploymentInfo;
use crate::errors::RebuildError;
use crate::exec::RebuildReport;
use crate::fingerprint::Fingerprint;
use crate::fs::FileInfo;
use crate::state::RebuildState;

pub mod core;
pub mod trigger;

pub use self::core::{decide, Decision};
pub use trigger::RebuildTrigger;

/// Result of one `check_and_rebuild` / `force_rebuild` invocation.
#[derive(Debug)]
pub enum Outcome {
    /// The watched file does not exist yet. Nothing to do.
    MissingFile,
    /// The watched file exists but could not be read; treated as unchanged.
    FingerprintUnavailable,
    /// Another invocation holds the state lock.
    Busy,
    /// First observation: fingerprint recorded, no rebuild.
    BaselineRecorded(Fingerprint),
    /// Stored fingerprint matches the file.
    InSync(Fingerprint),
    /// The rebuild pipeline succeeded. `fingerprint` is what was persisted.
    Rebuilt {
        fingerprint: Option<Fingerprint>,
        report: RebuildReport,
    },
    /// The rebuild pipeline failed; state was left untouched.
    Failed(RebuildError),
}

impl Outcome {
    /// Everything except a failed rebuild counts as success.
    pub fn is_success(&self) -> bool {
        !matches!(self, Outcome::Failed(_))
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_success() { 0 } else { 1 }
    }

    pub fn rebuilt(&self) -> bool {
        matches!(self, Outcome::Rebuilt { .. })
    }
}

/// Read-only snapshot printed by `--status`.
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub watched_file: PathBuf,
    pub current: Option<Fingerprint>,
    pub fingerprint_error: Option<String>,
    pub watched: Option<FileInfo>,
    pub state_location: String,
    pub state: RebuildState,
    pub state_error: Option<String>,
    /// True iff the next check would run a rebuild.
    pub pending_change: bool,
    pub deployment: Option<DeploymentInfo>,
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "watched file:   {}", self.watched_file.display())?;
        match (&self.current, &self.fingerprint_error) {
            (Some(fp), _) => writeln!(f, "fingerprint:    {fp}")?,
            (None, Some(err)) => writeln!(f, "fingerprint:    unavailable ({err})")?,
            (None, None) => writeln!(f, "fingerprint:    - (file missing)")?,
        }
        if let Some(info) = &self.watched {
            write!(f, "size:           {} bytes", info.len)?;
            if let Some(modified) = info.modified {
                let modified = chrono::DateTime::<chrono::Local>::from(modified);
                write!(f, ", modified {}", modified.format("%Y-%m-%d %H:%M:%S"))?;
            }
            writeln!(f)?;
        }

        writeln!(f, "state file:     {}", self.state_location)?;
        if let Some(err) = &self.state_error {
            writeln!(f, "state error:    {err}")?;
        }
        writeln!(
            f,
            "stored:         {}",
            self.state
                .last_fingerprint
                .as_ref()
                .map(|fp| fp.to_string())
                .unwrap_or_else(|| "-".to_string())
        )?;
        writeln!(f, "last check:     {}", format_time(&self.state.last_check))?;
        writeln!(f, "last rebuild:   {}", format_time(&self.state.last_rebuild))?;
        writeln!(
            f,
            "pending change: {}",
            if self.pending_change { "yes" } else { "no" }
        )?;

        match &self.deployment {
            Some(d) => writeln!(
                f,
                "deploy:         {} ({:.2} MB, modified {}, {} backup(s))",
                d.artifact.display(),
                d.size_mb(),
                format_time(&d.modified),
                d.backups
            ),
            None => writeln!(f, "deploy:         none"),
        }
    }
}

fn format_time(t: &Option<chrono::DateTime<chrono::Local>>) -> String {
    t.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "never".to_string())
}

// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RebuildError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("failed to read state file {path:?}: {reason}")]
    StateRead { path: PathBuf, reason: String },

    #[error("failed to write state file {path:?}: {reason}")]
    StateWrite { path: PathBuf, reason: String },

    #[error("failed to fingerprint {path:?}: {reason}")]
    Fingerprint { path: PathBuf, reason: String },

    #[error("clean step failed to remove {path:?}: {source}")]
    Clean {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to spawn step '{step}': {source}")]
    Spawn {
        step: String,
        #[source]
        source: std::io::Error,
    },

    #[error("step '{step}' exited with {}: {stderr}", exit_code_label(.code))]
    CommandFailed {
        step: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("step '{step}' timed out after {}s", .timeout.as_secs_f64())]
    CommandTimeout { step: String, timeout: Duration },

    #[error("packaging failed: {0}")]
    Packaging(String),

    #[error("failed to lock {path:?}: {source}")]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RebuildError {
    /// True for failures caused by the build tool exceeding its time budget.
    pub fn is_timeout(&self) -> bool {
        matches!(self, RebuildError::CommandTimeout { .. })
    }
}

fn exit_code_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("exit code {c}"),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, RebuildError>;

// src/state/store.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::errors::{RebuildError, Result};
use crate::fingerprint::Fingerprint;
use crate::fs::FileSystem;
use crate::state::RebuildState;

/// Abstract storage for the rebuild state.
pub trait StateStore: Send + Sync {
    /// Load the stored state. A missing store yields the default (empty)
    /// state, not an error.
    fn load(&self) -> Result<RebuildState>;
    fn save(&mut self, state: &RebuildState) -> Result<()>;
    /// Human-readable location, for logs and `--status`.
    fn location(&self) -> String;
}

/// Stores the state as a pretty-printed JSON object.
///
/// Loading also understands the older flat format: a file holding nothing
/// but the bare hex digest.
pub struct FileStateStore {
    fs: Arc<dyn FileSystem>,
    path: PathBuf,
}

impl FileStateStore {
    pub fn new(fs: Arc<dyn FileSystem>, path: PathBuf) -> Self {
        Self { fs, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_error(&self, reason: String) -> RebuildError {
        RebuildError::StateRead {
            path: self.path.clone(),
            reason,
        }
    }
}

impl StateStore for FileStateStore {
    fn load(&self) -> Result<RebuildState> {
        if !self.fs.exists(&self.path) {
            debug!(path = ?self.path, "no state file yet");
            return Ok(RebuildState::default());
        }

        let text = self
            .fs
            .read_to_string(&self.path)
            .map_err(|e| self.read_error(format!("{e:#}")))?;

        if text.trim().is_empty() {
            return Ok(RebuildState::default());
        }

        match serde_json::from_str::<RebuildState>(&text) {
            Ok(state) => Ok(state),
            Err(json_err) => match text.trim().parse::<Fingerprint>() {
                Ok(fingerprint) => {
                    warn!(
                        path = ?self.path,
                        "state file uses the legacy flat format; it will be rewritten as JSON on next save"
                    );
                    Ok(RebuildState {
                        last_fingerprint: Some(fingerprint),
                        ..RebuildState::default()
                    })
                }
                Err(_) => Err(self.read_error(json_err.to_string())),
            },
        }
    }

    fn save(&mut self, state: &RebuildState) -> Result<()> {
        let mut json = serde_json::to_string_pretty(state).map_err(|e| RebuildError::StateWrite {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        json.push('\n');

        self.fs
            .write(&self.path, json.as_bytes())
            .map_err(|e| RebuildError::StateWrite {
                path: self.path.clone(),
                reason: format!("{e:#}"),
            })?;

        info!(
            path = ?self.path,
            fingerprint = state.last_fingerprint.as_ref().map(|f| f.as_str()).unwrap_or("-"),
            "stored rebuild state"
        );
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

// src/engine/trigger.rs

//! The change-gated rebuild trigger.
//!
//! Three operations:
//! - [`RebuildTrigger::check_and_rebuild`]: rebuild only if the watched file's
//!   fingerprint differs from the stored one.
//! - [`RebuildTrigger::force_rebuild`]: rebuild unconditionally.
//! - [`RebuildTrigger::status`]: report, never mutate.
//!
//! The state file is written only after a confirmed successful rebuild, or
//! when a baseline is recorded on first run.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use tracing::{error, info, warn};

use crate::config::WatchSettings;
use crate::engine::core::{decide, Decision};
use crate::engine::{Outcome, StatusReport};
use crate::exec::RebuildBackend;
use crate::fingerprint::{compute_fingerprint, Fingerprint};
use crate::fs::{FileSystem, RealFileSystem};
use crate::state::{FileStateStore, RebuildState, StateLock, StateStore};
use crate::types::FirstRunPolicy;

pub struct RebuildTrigger<B: RebuildBackend> {
    settings: WatchSettings,
    fs: Arc<dyn FileSystem>,
    store: Box<dyn StateStore>,
    backend: B,
    lock_file: Option<PathBuf>,
}

impl<B: RebuildBackend> RebuildTrigger<B> {
    /// Build a trigger from explicit collaborators. No locking is performed
    /// unless [`with_lock_file`](Self::with_lock_file) is called.
    pub fn new(
        settings: WatchSettings,
        fs: Arc<dyn FileSystem>,
        store: Box<dyn StateStore>,
        backend: B,
    ) -> Self {
        Self {
            settings,
            fs,
            store,
            backend,
            lock_file: None,
        }
    }

    /// Production wiring: real filesystem, JSON state file, advisory lock
    /// next to the state file.
    pub fn from_settings(settings: &WatchSettings, backend: B) -> Self {
        let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
        let store = FileStateStore::new(Arc::clone(&fs), settings.state_file.clone());
        Self::new(settings.clone(), fs, Box::new(store), backend)
            .with_lock_file(settings.lock_file())
    }

    pub fn with_lock_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.lock_file = Some(path.into());
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn watched_file(&self) -> &Path {
        &self.settings.watched_file
    }

    /// Rebuild if the watched file changed since the last recorded fingerprint.
    pub async fn check_and_rebuild(&mut self) -> Outcome {
        let _lock = match self.lock() {
            Ok(lock) => lock,
            Err(outcome) => return outcome,
        };

        info!(file = ?self.settings.watched_file, "checking watched file for changes");

        let current = match compute_fingerprint(self.fs.as_ref(), &self.settings.watched_file) {
            Ok(Some(fp)) => fp,
            Ok(None) => {
                warn!(
                    file = ?self.settings.watched_file,
                    "watched file does not exist; nothing to do"
                );
                return Outcome::MissingFile;
            }
            Err(e) => {
                error!(error = %e, "could not fingerprint watched file; treating as unchanged");
                return Outcome::FingerprintUnavailable;
            }
        };

        let mut state = self.load_state();

        match decide(
            &current,
            state.last_fingerprint.as_ref(),
            self.settings.first_run,
        ) {
            Decision::Baseline => {
                info!(fingerprint = %current, "first run; recording baseline without rebuilding");
                state.record_baseline(current.clone(), Local::now());
                self.save_state(&state);
                Outcome::BaselineRecorded(current)
            }
            Decision::InSync => {
                info!(fingerprint = %current, "no change detected; in sync");
                Outcome::InSync(current)
            }
            Decision::Rebuild { previous } => {
                match &previous {
                    Some(prev) => info!(
                        previous = %prev,
                        current = %current,
                        "change detected; rebuilding"
                    ),
                    None => info!(
                        current = %current,
                        "no stored fingerprint and first_run = rebuild; rebuilding"
                    ),
                }
                self.rebuild(state, Some(current)).await
            }
        }
    }

    /// Rebuild regardless of the stored fingerprint.
    pub async fn force_rebuild(&mut self) -> Outcome {
        let _lock = match self.lock() {
            Ok(lock) => lock,
            Err(outcome) => return outcome,
        };

        info!("forced rebuild requested");

        let fingerprint =
            match compute_fingerprint(self.fs.as_ref(), &self.settings.watched_file) {
                Ok(fp) => fp,
                Err(e) => {
                    warn!(error = %e, "could not fingerprint watched file");
                    None
                }
            };
        if fingerprint.is_none() {
            warn!("no fingerprint available; state will not be updated after the rebuild");
        }

        let state = self.load_state();
        self.rebuild(state, fingerprint).await
    }

    /// Snapshot of the current situation. Never writes anything.
    pub fn status(&self) -> StatusReport {
        let (current, fingerprint_error) =
            match compute_fingerprint(self.fs.as_ref(), &self.settings.watched_file) {
                Ok(fp) => (fp, None),
                Err(e) => (None, Some(e.to_string())),
            };

        let (state, state_error) = match self.store.load() {
            Ok(state) => (state, None),
            Err(e) => (RebuildState::default(), Some(e.to_string())),
        };

        let pending_change = match (&current, &state.last_fingerprint) {
            (Some(cur), Some(stored)) => cur != stored,
            (Some(_), None) => self.settings.first_run == FirstRunPolicy::Rebuild,
            (None, _) => false,
        };

        StatusReport {
            watched_file: self.settings.watched_file.clone(),
            watched: self.fs.metadata(&self.settings.watched_file).ok(),
            current,
            fingerprint_error,
            state_location: self.store.location(),
            state,
            state_error,
            pending_change,
            deployment: self.backend.deployment_info(),
        }
    }

    async fn rebuild(&mut self, mut state: RebuildState, fingerprint: Option<Fingerprint>) -> Outcome {
        match self.backend.perform_rebuild().await {
            Ok(report) => {
                info!(
                    elapsed_ms = report.elapsed.as_millis() as u64,
                    artifact = ?report.artifact,
                    artifact_bytes = report.artifact_size,
                    "rebuild succeeded"
                );
                if let Some(fp) = &fingerprint {
                    state.record_rebuild(fp.clone(), Local::now());
                    self.save_state(&state);
                }
                Outcome::Rebuilt {
                    fingerprint,
                    report,
                }
            }
            Err(e) => {
                if e.is_timeout() {
                    error!(error = %e, "rebuild timed out; state left unchanged");
                } else {
                    error!(error = %e, "rebuild failed; state left unchanged");
                }
                Outcome::Failed(e)
            }
        }
    }

    /// `Ok(None)` when locking is disabled, `Ok(Some)` when acquired, or the
    /// outcome to return immediately.
    fn lock(&self) -> Result<Option<StateLock>, Outcome> {
        let Some(path) = &self.lock_file else {
            return Ok(None);
        };
        match StateLock::try_acquire(path) {
            Ok(Some(lock)) => Ok(Some(lock)),
            Ok(None) => {
                warn!(lock = ?path, "another invocation is running; skipping");
                Err(Outcome::Busy)
            }
            Err(e) => {
                error!(error = %e, "could not take the state lock");
                Err(Outcome::Failed(e))
            }
        }
    }

    fn load_state(&self) -> RebuildState {
        match self.store.load() {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, "could not read rebuild state; continuing with empty state");
                RebuildState::default()
            }
        }
    }

    fn save_state(&mut self, state: &RebuildState) {
        if let Err(e) = self.store.save(state) {
            error!(error = %e, "could not persist rebuild state");
        }
    }
}

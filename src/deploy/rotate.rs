// src/deploy/rotate.rs

//! Backup rotation for the deploy artifact.
//!
//! For an artifact `app.tgz`, backups are named
//! `app_backup_<YYYYmmdd_HHMMSS>.tgz` and live next to it. Only the
//! `keep_backups` most recent (by modification time) are retained.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::Local;
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::config::DeploySettings;
use crate::errors::{RebuildError, Result};

/// Result of installing a new artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rotation {
    pub backup: Option<PathBuf>,
    pub pruned: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupEntry {
    pub path: PathBuf,
    pub modified: SystemTime,
}

/// Move the current artifact (if any) into a backup slot, put `staged` in
/// its place, then prune old backups.
pub fn install_artifact(staged: NamedTempFile, deploy: &DeploySettings) -> Result<Rotation> {
    let backup = if deploy.artifact.exists() {
        let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let target = free_backup_path(&deploy.artifact, &stamp);
        fs::rename(&deploy.artifact, &target).map_err(|e| {
            RebuildError::Packaging(format!(
                "moving {:?} to backup {:?}: {e}",
                deploy.artifact, target
            ))
        })?;
        info!(backup = ?target, "rotated previous artifact");
        Some(target)
    } else {
        None
    };

    if let Err(e) = staged.persist(&deploy.artifact) {
        // Put the previous artifact back so the deploy path never ends up empty.
        if let Some(backup) = &backup {
            match fs::rename(backup, &deploy.artifact) {
                Ok(()) => info!(artifact = ?deploy.artifact, "restored previous artifact"),
                Err(restore) => warn!(
                    backup = ?backup,
                    error = %restore,
                    "failed to restore previous artifact"
                ),
            }
        }
        return Err(RebuildError::Packaging(format!(
            "installing archive at {:?}: {}",
            deploy.artifact, e.error
        )));
    }
    info!(artifact = ?deploy.artifact, "installed new artifact");

    let pruned = prune_backups(&deploy.artifact, deploy.keep_backups);
    Ok(Rotation { backup, pruned })
}

/// All backups of `artifact`, newest first.
pub fn list_backups(artifact: &Path) -> std::io::Result<Vec<BackupEntry>> {
    let dir = match artifact.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let naming = BackupNaming::for_artifact(artifact);

    let mut backups = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !naming.matches(name) {
            continue;
        }
        let meta = entry.metadata()?;
        if !meta.is_file() {
            continue;
        }
        backups.push(BackupEntry {
            path: entry.path(),
            modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
        });
    }

    backups.sort_by(|a, b| {
        b.modified
            .cmp(&a.modified)
            .then_with(|| b.path.cmp(&a.path))
    });
    Ok(backups)
}

/// Delete backups beyond the `keep` most recent, oldest first.
///
/// Failures are logged and skipped; the returned list contains only the
/// files that were actually removed.
pub fn prune_backups(artifact: &Path, keep: usize) -> Vec<PathBuf> {
    let backups = match list_backups(artifact) {
        Ok(b) => b,
        Err(e) => {
            warn!(error = %e, "could not list backups; skipping rotation cleanup");
            return Vec::new();
        }
    };

    let mut removed = Vec::new();
    for old in backups.iter().skip(keep).rev() {
        match fs::remove_file(&old.path) {
            Ok(()) => {
                info!(backup = ?old.path, "removed old backup");
                removed.push(old.path.clone());
            }
            Err(e) => warn!(backup = ?old.path, error = %e, "failed to remove old backup"),
        }
    }
    removed
}

/// Backup path for `stamp`, adding `_1`, `_2`, ... if that name is taken.
fn free_backup_path(artifact: &Path, stamp: &str) -> PathBuf {
    let naming = BackupNaming::for_artifact(artifact);
    let mut candidate = artifact.with_file_name(naming.name_for(stamp));
    let mut n = 1;
    while candidate.exists() {
        candidate = artifact.with_file_name(naming.name_for(&format!("{stamp}_{n}")));
        n += 1;
    }
    candidate
}

/// `app.tgz` → prefix `app_backup_`, extension `tgz`.
/// `site.tar.gz` → prefix `site_backup_`, extension `tar.gz`.
struct BackupNaming {
    prefix: String,
    extension: Option<String>,
}

impl BackupNaming {
    fn for_artifact(artifact: &Path) -> Self {
        let name = artifact
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("artifact");
        let (stem, extension) = match name.split_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
                (stem, Some(ext.to_string()))
            }
            _ => (name, None),
        };
        Self {
            prefix: format!("{stem}_backup_"),
            extension,
        }
    }

    fn name_for(&self, stamp: &str) -> String {
        match &self.extension {
            Some(ext) => format!("{}{stamp}.{ext}", self.prefix),
            None => format!("{}{stamp}", self.prefix),
        }
    }

    fn matches(&self, file_name: &str) -> bool {
        let Some(rest) = file_name.strip_prefix(&self.prefix) else {
            return false;
        };
        match &self.extension {
            Some(ext) => rest
                .strip_suffix(ext.as_str())
                .is_some_and(|r| r.ends_with('.')),
            None => true,
        }
    }
}

// src/deploy/mod.rs

//! Deployment artifact handling: packaging the build output and rotating
//! previous archives into timestamped backups.

use std::path::PathBuf;

use chrono::{DateTime, Local};

use crate::config::DeploySettings;

pub mod package;
pub mod rotate;

pub use package::create_archive;
pub use rotate::{install_artifact, list_backups, prune_backups, BackupEntry, Rotation};

/// The currently installed artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentInfo {
    pub artifact: PathBuf,
    pub size: u64,
    pub modified: Option<DateTime<Local>>,
    pub backups: usize,
}

impl DeploymentInfo {
    pub fn size_mb(&self) -> f64 {
        self.size as f64 / (1024.0 * 1024.0)
    }
}

/// Look up the installed artifact; `None` if nothing has been deployed yet.
pub fn deployment_info(deploy: &DeploySettings) -> Option<DeploymentInfo> {
    let meta = std::fs::metadata(&deploy.artifact).ok()?;
    let backups = list_backups(&deploy.artifact).map(|b| b.len()).unwrap_or(0);

    Some(DeploymentInfo {
        artifact: deploy.artifact.clone(),
        size: meta.len(),
        modified: meta.modified().ok().map(DateTime::<Local>::from),
        backups,
    })
}

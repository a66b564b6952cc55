// src/exec/pipeline.rs

//! The production rebuild pipeline.
//!
//! Steps run in a fixed order and the first failure aborts the rest:
//! 1. clean previous build artifacts
//! 2. run each configured build step (with timeout)
//! 3. package the build output into a staged archive
//! 4. rotate the current artifact into a backup and install the new one

use std::fs;
use std::future::Future;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::Instant;

use tracing::{debug, info};

use crate::config::{BuildSettings, DeploySettings};
use crate::deploy::{self, DeploymentInfo};
use crate::errors::{RebuildError, Result};
use crate::exec::backend::{RebuildBackend, RebuildReport};
use crate::exec::command::run_step;

#[derive(Debug, Clone)]
pub struct BuildPipeline {
    build: BuildSettings,
    deploy: DeploySettings,
}

impl BuildPipeline {
    pub fn new(build: BuildSettings, deploy: DeploySettings) -> Self {
        Self { build, deploy }
    }

    pub fn build_settings(&self) -> &BuildSettings {
        &self.build
    }

    pub fn deploy_settings(&self) -> &DeploySettings {
        &self.deploy
    }

    async fn run(&self) -> Result<RebuildReport> {
        let started = Instant::now();
        info!(
            working_dir = ?self.build.working_dir,
            steps = self.build.steps.len(),
            "starting rebuild pipeline"
        );

        clean(&self.build.clean)?;

        for step in self.build.steps.iter() {
            run_step(step, &self.build.working_dir, self.build.timeout).await?;
        }

        let staged = deploy::create_archive(&self.build.output_dir, &self.deploy.dir)?;
        let rotation = deploy::install_artifact(staged, &self.deploy)?;

        let artifact_size = fs::metadata(&self.deploy.artifact)
            .map_err(|e| RebuildError::Packaging(format!("reading installed artifact: {e}")))?
            .len();

        Ok(RebuildReport {
            elapsed: started.elapsed(),
            artifact: self.deploy.artifact.clone(),
            artifact_size,
            backup: rotation.backup,
            pruned: rotation.pruned,
        })
    }
}

impl RebuildBackend for BuildPipeline {
    fn perform_rebuild(&mut self) -> Pin<Box<dyn Future<Output = Result<RebuildReport>> + Send + '_>> {
        Box::pin(self.run())
    }

    fn deployment_info(&self) -> Option<DeploymentInfo> {
        deploy::deployment_info(&self.deploy)
    }
}

/// Remove previous build artifacts. Paths that do not exist are fine.
fn clean(paths: &[PathBuf]) -> Result<()> {
    for path in paths {
        let res = match fs::symlink_metadata(path) {
            Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
            Ok(_) => fs::remove_file(path),
            Err(e) => Err(e),
        };

        match res {
            Ok(()) => info!(path = ?path, "removed previous build output"),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = ?path, "nothing to clean")
            }
            Err(source) => {
                return Err(RebuildError::Clean {
                    path: path.to_path_buf(),
                    source,
                });
            }
        }
    }
    Ok(())
}

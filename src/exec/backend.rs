// src/exec/backend.rs

//! Pluggable rebuild backend abstraction.
//!
//! The trigger talks to a `RebuildBackend` instead of running the pipeline
//! directly. Production code uses [`BuildPipeline`](super::BuildPipeline);
//! tests provide a fake that records invocations without spawning anything.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::Duration;

use crate::deploy::DeploymentInfo;
use crate::errors::Result;

/// Metrics of one successful rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebuildReport {
    pub elapsed: Duration,
    pub artifact: PathBuf,
    pub artifact_size: u64,
    /// Where the previous artifact was moved, if there was one.
    pub backup: Option<PathBuf>,
    /// Old backups deleted by rotation, oldest first.
    pub pruned: Vec<PathBuf>,
}

/// Trait abstracting how a rebuild is carried out.
pub trait RebuildBackend: Send {
    /// Run the whole rebuild. Any error means nothing may be recorded as
    /// rebuilt.
    fn perform_rebuild(&mut self) -> Pin<Box<dyn Future<Output = Result<RebuildReport>> + Send + '_>>;

    /// Information about the currently deployed artifact, for `--status`.
    fn deployment_info(&self) -> Option<DeploymentInfo> {
        None
    }
}

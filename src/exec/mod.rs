// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`command`] runs a single build step with a timeout using
//!   `tokio::process::Command`.
//! - [`backend`] provides the `RebuildBackend` trait the trigger calls
//!   through, so tests can swap in a fake.
//! - [`pipeline`] is the production backend: clean, build, package, rotate.

pub mod backend;
pub mod command;
pub mod pipeline;

pub use backend::{RebuildBackend, RebuildReport};
pub use command::{run_step, CommandOutput};
pub use pipeline::BuildPipeline;

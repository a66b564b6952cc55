// src/config/mod.rs

//! Configuration loading and validation for rebuild-gate.
//!
//! Responsibilities:
//! - Define the TOML-backed data model and resolved settings (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate timeouts, build steps and the deploy artifact (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{config_root_dir, default_config_path, load_and_validate, load_from_path};
pub use model::{
    BuildSection, BuildSettings, ConfigFile, DeploySection, DeploySettings, LogSection,
    RawConfigFile, Settings, StepConfig, WatchSection, WatchSettings,
};
pub use validate::validate_config;

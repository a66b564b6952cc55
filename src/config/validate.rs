// src/config/validate.rs

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{RebuildError, Result};
use crate::types::parse_duration;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::RebuildError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let timeout = validate_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw, timeout))
    }
}

/// Check the raw config and return the parsed build timeout.
pub fn validate_config(cfg: &RawConfigFile) -> Result<Duration> {
    let timeout = validate_timeout(cfg)?;
    validate_steps(cfg)?;
    validate_deploy(cfg)?;
    Ok(timeout)
}

fn validate_timeout(cfg: &RawConfigFile) -> Result<Duration> {
    let timeout = parse_duration(&cfg.build.timeout)
        .map_err(|e| RebuildError::ConfigError(format!("[build].timeout: {e}")))?;

    if timeout.is_zero() {
        return Err(RebuildError::ConfigError(
            "[build].timeout must be greater than zero".to_string(),
        ));
    }
    Ok(timeout)
}

fn validate_steps(cfg: &RawConfigFile) -> Result<()> {
    if cfg.build.steps.is_empty() {
        return Err(RebuildError::ConfigError(
            "config must contain at least one [[build.step]] section".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for step in cfg.build.steps.iter() {
        if step.name.trim().is_empty() {
            return Err(RebuildError::ConfigError(
                "[[build.step]] name must not be empty".to_string(),
            ));
        }
        if !seen.insert(step.name.as_str()) {
            return Err(RebuildError::ConfigError(format!(
                "duplicate build step name '{}'",
                step.name
            )));
        }
        if step.program.trim().is_empty() {
            return Err(RebuildError::ConfigError(format!(
                "build step '{}' has an empty program",
                step.name
            )));
        }
    }
    Ok(())
}

fn validate_deploy(cfg: &RawConfigFile) -> Result<()> {
    let artifact = cfg.deploy.artifact.as_str();
    let as_path = Path::new(artifact);

    let is_bare_name = as_path.file_name().and_then(|n| n.to_str()) == Some(artifact);
    if !is_bare_name {
        return Err(RebuildError::ConfigError(format!(
            "[deploy].artifact must be a plain file name, got '{artifact}'"
        )));
    }
    if as_path.extension().is_none() || artifact.starts_with('.') {
        return Err(RebuildError::ConfigError(format!(
            "[deploy].artifact needs a name and an extension (e.g. \"app.tgz\"), got '{artifact}'"
        )));
    }
    Ok(())
}

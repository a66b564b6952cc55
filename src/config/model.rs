// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::types::FirstRunPolicy;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [watch]
/// file = "app/public/dashboard_data.json"
/// state_file = "monitoring_system/rebuild_state.json"
/// first_run = "baseline"
///
/// [build]
/// working_dir = "app"
/// timeout = "600s"
/// clean = [".next"]
/// output_dir = ".next"
///
/// [[build.step]]
/// name = "build"
/// program = "npm"
/// args = ["run", "build"]
///
/// [deploy]
/// dir = ".deploy"
/// artifact = "app.tgz"
/// keep_backups = 5
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub watch: WatchSection,

    #[serde(default)]
    pub build: BuildSection,

    #[serde(default)]
    pub deploy: DeploySection,

    #[serde(default)]
    pub log: LogSection,
}

/// Validated configuration.
///
/// Constructed via `ConfigFile::try_from(RawConfigFile)`, which checks the
/// invariants in `validate.rs`. Paths are still relative at this point; call
/// [`ConfigFile::resolve`] to anchor them to a root directory.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub watch: WatchSection,
    pub build: BuildSection,
    pub deploy: DeploySection,
    pub log: LogSection,
    timeout: Duration,
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchSection {
    /// The data file whose content gates the rebuild.
    #[serde(default = "default_watch_file")]
    pub file: PathBuf,

    /// Where the rebuild state (last fingerprint + timestamps) is persisted.
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,

    #[serde(default)]
    pub first_run: FirstRunPolicy,
}

fn default_watch_file() -> PathBuf {
    PathBuf::from("app/public/dashboard_data.json")
}

fn default_state_file() -> PathBuf {
    PathBuf::from("monitoring_system/rebuild_state.json")
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            file: default_watch_file(),
            state_file: default_state_file(),
            first_run: FirstRunPolicy::default(),
        }
    }
}

/// `[build]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildSection {
    /// Directory the build steps run in. Clean paths and `output_dir` are
    /// relative to it.
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,

    /// Per-step timeout, e.g. `"600s"` or `"10m"`.
    #[serde(default = "default_timeout")]
    pub timeout: String,

    /// Previous build artifacts removed before building.
    #[serde(default = "default_clean")]
    pub clean: Vec<PathBuf>,

    /// Directory whose contents are packaged into the deploy archive.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Ordered build commands (`[[build.step]]`).
    #[serde(default = "default_steps", rename = "step")]
    pub steps: Vec<StepConfig>,
}

fn default_working_dir() -> PathBuf {
    PathBuf::from("app")
}

fn default_timeout() -> String {
    "600s".to_string()
}

fn default_clean() -> Vec<PathBuf> {
    vec![PathBuf::from(".next")]
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".next")
}

fn default_steps() -> Vec<StepConfig> {
    vec![StepConfig {
        name: "build".to_string(),
        program: "npm".to_string(),
        args: vec!["run".to_string(), "build".to_string()],
        env: BTreeMap::new(),
    }]
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            working_dir: default_working_dir(),
            timeout: default_timeout(),
            clean: default_clean(),
            output_dir: default_output_dir(),
            steps: default_steps(),
        }
    }
}

/// One `[[build.step]]` entry: a program and its argument list.
///
/// Commands are never passed through a shell.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct StepConfig {
    pub name: String,
    pub program: String,

    #[serde(default)]
    pub args: Vec<String>,

    /// Extra environment variables for this step only.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// `[deploy]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct DeploySection {
    #[serde(default = "default_deploy_dir")]
    pub dir: PathBuf,

    /// File name of the archive inside `dir`.
    #[serde(default = "default_artifact")]
    pub artifact: String,

    /// How many rotated backups of the archive to keep.
    #[serde(default = "default_keep_backups")]
    pub keep_backups: usize,
}

fn default_deploy_dir() -> PathBuf {
    PathBuf::from(".deploy")
}

fn default_artifact() -> String {
    "app.tgz".to_string()
}

fn default_keep_backups() -> usize {
    5
}

impl Default for DeploySection {
    fn default() -> Self {
        Self {
            dir: default_deploy_dir(),
            artifact: default_artifact(),
            keep_backups: default_keep_backups(),
        }
    }
}

/// `[log]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct LogSection {
    /// If set, logs are also appended to `<dir>/rebuild_YYYYMMDD.log`.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl ConfigFile {
    /// Construct without validation. Only `validate.rs` should call this.
    pub(crate) fn new_unchecked(raw: RawConfigFile, timeout: Duration) -> Self {
        Self {
            watch: raw.watch,
            build: raw.build,
            deploy: raw.deploy,
            log: raw.log,
            timeout,
        }
    }

    /// The parsed `[build].timeout`.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Anchor every relative path to `root` and produce runtime settings.
    pub fn resolve(&self, root: &Path) -> Settings {
        let working_dir = root.join(&self.build.working_dir);
        let deploy_dir = root.join(&self.deploy.dir);

        Settings {
            watch: WatchSettings {
                watched_file: root.join(&self.watch.file),
                state_file: root.join(&self.watch.state_file),
                first_run: self.watch.first_run,
            },
            build: BuildSettings {
                clean: self
                    .build
                    .clean
                    .iter()
                    .map(|p| working_dir.join(p))
                    .collect(),
                output_dir: working_dir.join(&self.build.output_dir),
                steps: self.build.steps.clone(),
                timeout: self.timeout,
                working_dir,
            },
            deploy: DeploySettings {
                artifact: deploy_dir.join(&self.deploy.artifact),
                keep_backups: self.deploy.keep_backups,
                dir: deploy_dir,
            },
            log_dir: self.log.dir.as_ref().map(|d| root.join(d)),
        }
    }
}

/// Fully resolved runtime settings, passed into the trigger and pipeline at
/// construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub watch: WatchSettings,
    pub build: BuildSettings,
    pub deploy: DeploySettings,
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchSettings {
    pub watched_file: PathBuf,
    pub state_file: PathBuf,
    pub first_run: FirstRunPolicy,
}

impl WatchSettings {
    /// Advisory lock file guarding read-modify-write of the state file.
    pub fn lock_file(&self) -> PathBuf {
        let mut name = self
            .state_file
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "rebuild_state".into());
        name.push(".lock");
        self.state_file.with_file_name(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSettings {
    pub working_dir: PathBuf,
    pub clean: Vec<PathBuf>,
    pub output_dir: PathBuf,
    pub steps: Vec<StepConfig>,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploySettings {
    pub dir: PathBuf,
    pub artifact: PathBuf,
    pub keep_backups: usize,
}

impl Settings {
    /// Default settings anchored at `root`.
    pub fn with_root(root: &Path) -> Self {
        let raw = RawConfigFile::default();
        ConfigFile::new_unchecked(raw, Duration::from_secs(600)).resolve(root)
    }
}

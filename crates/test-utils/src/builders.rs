#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rebuild_gate::config::{Settings, StepConfig};
use rebuild_gate::types::FirstRunPolicy;
use tempfile::TempDir;

/// A throwaway project directory laid out like the dashboard:
///
/// ```text
/// <tmp>/app/public/dashboard_data.json   watched file
/// <tmp>/monitoring_system/rebuild_state.json
/// <tmp>/app/.next/                        build output
/// <tmp>/.deploy/app.tgz                   artifact
/// ```
pub struct TestProject {
    pub dir: TempDir,
    pub settings: Settings,
}

impl TestProject {
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn watched_file(&self) -> &Path {
        &self.settings.watch.watched_file
    }

    pub fn state_file(&self) -> &Path {
        &self.settings.watch.state_file
    }

    pub fn artifact(&self) -> &Path {
        &self.settings.deploy.artifact
    }

    pub fn write_watched(&self, contents: &str) {
        let path = self.watched_file();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    pub fn write_state(&self, contents: &str) {
        let path = self.state_file();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    /// Raw state file contents, `None` if it does not exist.
    pub fn read_state(&self) -> Option<String> {
        fs::read_to_string(self.state_file()).ok()
    }

    /// Fill the build output directory as a real build would.
    pub fn write_build_output(&self, name: &str, contents: &str) {
        let path = self.settings.build.output_dir.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }
}

/// Builder for [`TestProject`].
pub struct ProjectBuilder {
    first_run: FirstRunPolicy,
    steps: Vec<StepConfig>,
    timeout: Duration,
    keep_backups: usize,
    watched: Option<String>,
}

impl ProjectBuilder {
    pub fn new() -> Self {
        Self {
            first_run: FirstRunPolicy::Baseline,
            steps: Vec::new(),
            timeout: Duration::from_secs(30),
            keep_backups: 5,
            watched: None,
        }
    }

    pub fn first_run(mut self, policy: FirstRunPolicy) -> Self {
        self.first_run = policy;
        self
    }

    /// Add a build step: `program args...`.
    pub fn step(mut self, name: &str, program: &str, args: &[&str]) -> Self {
        self.steps.push(StepConfig {
            name: name.to_string(),
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            env: BTreeMap::new(),
        });
        self
    }

    /// Add a `sh -c <script>` step (unix test helpers only).
    pub fn shell_step(self, name: &str, script: &str) -> Self {
        self.step(name, "sh", &["-c", script])
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        if let Some(last) = self.steps.last_mut() {
            last.env.insert(key.to_string(), value.to_string());
        }
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn keep_backups(mut self, keep: usize) -> Self {
        self.keep_backups = keep;
        self
    }

    pub fn watched(mut self, contents: &str) -> Self {
        self.watched = Some(contents.to_string());
        self
    }

    pub fn build(self) -> TestProject {
        let dir = tempfile::tempdir().expect("creating temp project dir");
        let mut settings = Settings::with_root(dir.path());

        settings.watch.first_run = self.first_run;
        settings.build.timeout = self.timeout;
        settings.deploy.keep_backups = self.keep_backups;
        if !self.steps.is_empty() {
            settings.build.steps = self.steps;
        }
        fs::create_dir_all(&settings.build.working_dir).unwrap();

        let project = TestProject { dir, settings };
        if let Some(contents) = self.watched {
            project.write_watched(&contents);
        }
        project
    }
}

impl Default for ProjectBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Path of a file inside the project's deploy directory.
pub fn deploy_path(project: &TestProject, name: &str) -> PathBuf {
    project.settings.deploy.dir.join(name)
}

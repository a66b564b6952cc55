#![cfg(unix)]

mod common;
use crate::common::init_tracing;

use std::collections::BTreeSet;
use std::fs::File;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use flate2::read::GzDecoder;
use rebuild_gate::config::StepConfig;
use rebuild_gate::errors::RebuildError;
use rebuild_gate::exec::{run_step, BuildPipeline, RebuildBackend};
use rebuild_gate_test_utils::builders::{ProjectBuilder, TestProject};

fn pipeline(project: &TestProject) -> BuildPipeline {
    BuildPipeline::new(
        project.settings.build.clone(),
        project.settings.deploy.clone(),
    )
}

fn archive_entries(path: &std::path::Path) -> BTreeSet<String> {
    let file = File::open(path).unwrap();
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    archive
        .entries()
        .unwrap()
        .map(|e| {
            let e = e.unwrap();
            e.path()
                .unwrap()
                .to_string_lossy()
                .trim_start_matches("./")
                .to_string()
        })
        .filter(|p| !p.is_empty() && p != ".")
        .collect()
}

#[tokio::test]
async fn successful_build_is_packaged_into_the_artifact() {
    init_tracing();

    let project = ProjectBuilder::new()
        .shell_step(
            "build",
            "mkdir -p .next/static && echo page > .next/index.html && echo js > .next/static/app.js",
        )
        .build();
    let mut backend = pipeline(&project);

    let report = backend.perform_rebuild().await.unwrap();

    assert_eq!(report.artifact, project.artifact());
    assert!(project.artifact().is_file());
    assert_eq!(
        report.artifact_size,
        std::fs::metadata(project.artifact()).unwrap().len()
    );
    assert_eq!(report.backup, None, "nothing to back up on the first deploy");

    let entries = archive_entries(project.artifact());
    assert!(entries.contains("index.html"), "entries: {entries:?}");
    assert!(entries.contains("static/app.js"), "entries: {entries:?}");

    let info = backend.deployment_info().unwrap();
    assert_eq!(info.size, report.artifact_size);
    assert_eq!(info.backups, 0);
}

#[tokio::test]
async fn previous_output_is_cleaned_before_building() {
    init_tracing();

    let project = ProjectBuilder::new()
        .shell_step("build", "test ! -e .next/stale.txt && mkdir -p .next && echo new > .next/fresh.txt")
        .build();
    project.write_build_output("stale.txt", "left over");

    let mut backend = pipeline(&project);
    backend.perform_rebuild().await.unwrap();

    let entries = archive_entries(project.artifact());
    assert!(entries.contains("fresh.txt"));
    assert!(!entries.contains("stale.txt"));
}

#[tokio::test]
async fn failing_step_reports_exit_code_and_stderr_and_stops_the_pipeline() {
    init_tracing();

    let project = ProjectBuilder::new()
        .shell_step("lint", "echo 'type error in page.tsx' >&2; exit 3")
        .shell_step("build", "mkdir -p .next && touch .next/should-not-exist")
        .build();
    let mut backend = pipeline(&project);

    let err = backend.perform_rebuild().await.unwrap_err();

    match &err {
        RebuildError::CommandFailed { step, code, stderr } => {
            assert_eq!(step, "lint");
            assert_eq!(*code, Some(3));
            assert!(stderr.contains("type error in page.tsx"), "stderr: {stderr}");
        }
        other => panic!("expected CommandFailed, got {other:?}"),
    }
    assert!(!err.is_timeout());
    assert!(!project.settings.build.output_dir.join("should-not-exist").exists());
    assert!(!project.artifact().exists());
}

#[tokio::test]
async fn missing_program_is_a_spawn_error() {
    init_tracing();

    let project = ProjectBuilder::new()
        .step("build", "definitely-not-a-real-build-tool", &[])
        .build();
    let mut backend = pipeline(&project);

    let err = backend.perform_rebuild().await.unwrap_err();
    assert!(matches!(err, RebuildError::Spawn { .. }), "got {err:?}");
}

#[tokio::test]
async fn build_without_output_directory_fails_packaging() {
    init_tracing();

    let project = ProjectBuilder::new().shell_step("build", "true").build();
    let mut backend = pipeline(&project);

    let err = backend.perform_rebuild().await.unwrap_err();
    assert!(matches!(err, RebuildError::Packaging(_)), "got {err:?}");
}

#[tokio::test]
async fn step_exceeding_timeout_is_killed_with_its_children() {
    init_tracing();

    let project = ProjectBuilder::new()
        .timeout(Duration::from_millis(500))
        .shell_step("build", "sleep 30 & echo $! > grandchild.pid; wait")
        .build();
    let mut backend = pipeline(&project);

    let started = Instant::now();
    let err = backend.perform_rebuild().await.unwrap_err();
    let elapsed = started.elapsed();

    assert!(err.is_timeout(), "got {err:?}");
    assert!(
        elapsed < Duration::from_secs(10),
        "timeout not enforced: took {elapsed:?}"
    );

    let pid_file = project.settings.build.working_dir.join("grandchild.pid");
    let pid = std::fs::read_to_string(pid_file).unwrap();
    let proc_path = format!("/proc/{}", pid.trim());

    // Give the kernel a moment to reap the killed group.
    let deadline = Instant::now() + Duration::from_secs(5);
    while std::path::Path::new(&proc_path).exists() && Instant::now() < deadline {
        let status = std::fs::read_to_string(format!("{proc_path}/stat")).unwrap_or_default();
        if status.contains(") Z ") {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    let status = std::fs::read_to_string(format!("{proc_path}/stat")).unwrap_or_default();
    assert!(
        status.is_empty() || status.contains(") Z "),
        "grandchild still running: {status}"
    );
}

#[tokio::test]
async fn step_env_and_working_dir_are_applied() {
    init_tracing();

    let project = ProjectBuilder::new().build();
    let step = StepConfig {
        name: "env".to_string(),
        program: "sh".to_string(),
        args: vec!["-c".to_string(), "echo \"$NODE_ENV in $(pwd)\"".to_string()],
        env: [("NODE_ENV".to_string(), "production".to_string())].into(),
    };

    let out = run_step(&step, &project.settings.build.working_dir, Duration::from_secs(10))
        .await
        .unwrap();

    assert!(out.success);
    assert_eq!(out.code, Some(0));
    let expected_dir = project.settings.build.working_dir.canonicalize().unwrap();
    assert_eq!(
        out.stdout.trim(),
        format!("production in {}", expected_dir.display())
    );
}

#[tokio::test]
async fn arguments_are_not_interpreted_by_a_shell() {
    init_tracing();

    let project = ProjectBuilder::new().build();
    let step = StepConfig {
        name: "echo".to_string(),
        program: "echo".to_string(),
        args: vec!["$HOME;".to_string(), "*".to_string()],
        env: Default::default(),
    };

    let out = run_step(&step, &project.settings.build.working_dir, Duration::from_secs(10))
        .await
        .unwrap();

    assert_eq!(out.stdout.trim(), "$HOME; *");
}

/// Log sink shared between the subscriber and the test.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl LogBuffer {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

#[tokio::test]
async fn step_output_is_logged_at_the_default_level() {
    let logs = LogBuffer::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let project = ProjectBuilder::new().build();
    let step = StepConfig {
        name: "build".to_string(),
        program: "sh".to_string(),
        args: vec![
            "-c".to_string(),
            "echo 'Compiled successfully'; echo 'warn: large bundle' >&2".to_string(),
        ],
        env: Default::default(),
    };

    run_step(&step, &project.settings.build.working_dir, Duration::from_secs(10))
        .await
        .unwrap();

    let text = logs.text();
    assert!(text.contains("stdout: Compiled successfully"), "{text}");
    assert!(text.contains("stderr: warn: large bundle"), "{text}");
}

#[tokio::test]
async fn failed_clean_aborts_before_any_step_runs() {
    init_tracing();

    let mut project = ProjectBuilder::new()
        .shell_step("build", "touch ran.txt && mkdir -p .next")
        .build();
    let working_dir = project.settings.build.working_dir.clone();
    // A regular file where a directory is expected: removal fails with
    // ENOTDIR regardless of the user's privileges.
    std::fs::write(working_dir.join("marker"), "not a dir").unwrap();
    project.settings.build.clean = vec![working_dir.join("marker/inner")];

    let mut backend = pipeline(&project);
    let err = backend.perform_rebuild().await.unwrap_err();

    match &err {
        RebuildError::Clean { path, .. } => assert_eq!(path, &working_dir.join("marker/inner")),
        other => panic!("expected Clean, got {other:?}"),
    }
    assert!(!working_dir.join("ran.txt").exists(), "build step must not run");
    assert!(!project.artifact().exists());
}

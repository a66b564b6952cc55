mod common;
use crate::common::{init_tracing, state_json, trigger_for, FP_A1, FP_A2};

use rebuild_gate::exec::BuildPipeline;
use rebuild_gate::engine::RebuildTrigger;
use rebuild_gate::types::FirstRunPolicy;
use rebuild_gate_test_utils::builders::{deploy_path, ProjectBuilder};
use rebuild_gate_test_utils::fake_backend::FakeBackend;

#[test]
fn status_reports_pending_change_without_writing() {
    init_tracing();

    let project = ProjectBuilder::new().watched(r#"{"a":2}"#).build();
    let before = state_json(FP_A1);
    project.write_state(&before);
    let trigger = trigger_for(&project, FakeBackend::succeeding());

    let report = trigger.status();

    assert_eq!(report.current.as_ref().map(|f| f.as_str()), Some(FP_A2));
    assert_eq!(
        report.state.last_fingerprint.as_ref().map(|f| f.as_str()),
        Some(FP_A1)
    );
    assert!(report.pending_change);
    assert!(report.state_error.is_none());
    assert_eq!(report.watched.map(|w| w.len), Some(7));

    assert_eq!(project.read_state().as_deref(), Some(before.as_str()));
    assert_eq!(trigger.backend().calls(), 0);

    let text = report.to_string();
    assert!(text.contains(FP_A2), "{text}");
    assert!(text.contains("pending change: yes"), "{text}");
    assert!(text.contains("last rebuild:   2025-"), "{text}");
}

#[test]
fn status_in_sync_is_not_pending() {
    let project = ProjectBuilder::new().watched(r#"{"a":1}"#).build();
    project.write_state(&state_json(FP_A1));
    let trigger = trigger_for(&project, FakeBackend::succeeding());

    let report = trigger.status();

    assert!(!report.pending_change);
    assert!(report.to_string().contains("pending change: no"));
}

#[test]
fn status_on_a_fresh_project() {
    let project = ProjectBuilder::new().build();
    let trigger = trigger_for(&project, FakeBackend::succeeding());

    let report = trigger.status();

    assert!(report.current.is_none());
    assert!(!report.pending_change);
    assert!(project.read_state().is_none(), "status must not create state");

    let text = report.to_string();
    assert!(text.contains("(file missing)"), "{text}");
    assert!(text.contains("last rebuild:   never"), "{text}");
    assert!(text.contains("deploy:         none"), "{text}");
}

#[test]
fn first_run_pending_depends_on_policy() {
    let baseline = ProjectBuilder::new().watched("{}").build();
    let report = trigger_for(&baseline, FakeBackend::succeeding()).status();
    assert!(!report.pending_change);

    let eager = ProjectBuilder::new()
        .first_run(FirstRunPolicy::Rebuild)
        .watched("{}")
        .build();
    let report = trigger_for(&eager, FakeBackend::succeeding()).status();
    assert!(report.pending_change);
}

#[test]
fn corrupt_state_is_reported() {
    let project = ProjectBuilder::new().watched("{}").build();
    project.write_state("<<garbage>>");
    let trigger = trigger_for(&project, FakeBackend::succeeding());

    let report = trigger.status();

    assert!(report.state_error.is_some());
    assert!(report.to_string().contains("state error:"));
    assert_eq!(project.read_state().as_deref(), Some("<<garbage>>"));
}

#[test]
fn deployed_artifact_and_backups_are_listed() {
    let project = ProjectBuilder::new().watched("{}").build();
    std::fs::create_dir_all(&project.settings.deploy.dir).unwrap();
    std::fs::write(project.artifact(), vec![0u8; 2048]).unwrap();
    std::fs::write(deploy_path(&project, "app_backup_20250101_000000.tgz"), "old").unwrap();

    let backend = BuildPipeline::new(
        project.settings.build.clone(),
        project.settings.deploy.clone(),
    );
    let trigger = RebuildTrigger::from_settings(&project.settings.watch, backend);

    let deployment = trigger.status().deployment.expect("artifact present");
    assert_eq!(deployment.size, 2048);
    assert_eq!(deployment.backups, 1);

    let text = trigger.status().to_string();
    assert!(text.contains("1 backup(s)"), "{text}");
}

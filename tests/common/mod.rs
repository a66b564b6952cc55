#![allow(dead_code)]

use rebuild_gate::engine::RebuildTrigger;
use rebuild_gate_test_utils::builders::TestProject;
use rebuild_gate_test_utils::fake_backend::FakeBackend;

pub use rebuild_gate_test_utils::init_tracing;

/// Production wiring (real fs, JSON state file, lock) around a fake backend.
pub fn trigger_for(project: &TestProject, backend: FakeBackend) -> RebuildTrigger<FakeBackend> {
    RebuildTrigger::from_settings(&project.settings.watch, backend)
}

/// MD5 of `{"a":1}`.
pub const FP_A1: &str = "bb6cb5c68df4652941caf652a366f2d8";
/// MD5 of `{"a":2}`.
pub const FP_A2: &str = "aab457e0ec244f477ee0c097b94a2728";

/// A state file as the JSON-writing scripts left it.
pub fn state_json(fingerprint: &str) -> String {
    format!(
        "{{\n  \"last_fingerprint\": \"{fingerprint}\",\n  \"last_check\": \"2025-06-01T10:00:00+00:00\",\n  \"last_rebuild\": \"2025-06-01T10:00:00+00:00\"\n}}\n"
    )
}

/// `last_fingerprint` from the state file on disk.
pub fn stored_fingerprint(project: &TestProject) -> Option<String> {
    let text = project.read_state()?;
    let value: serde_json::Value = serde_json::from_str(&text).ok()?;
    value
        .get("last_fingerprint")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use rebuild_gate::config::DeploySettings;
use rebuild_gate::deploy::{install_artifact, list_backups, prune_backups};

fn settings(dir: &Path, keep: usize) -> DeploySettings {
    DeploySettings {
        dir: dir.to_path_buf(),
        artifact: dir.join("app.tgz"),
        keep_backups: keep,
    }
}

fn staged(dir: &Path, contents: &str) -> tempfile::NamedTempFile {
    let mut tmp = tempfile::Builder::new()
        .prefix(".staging-")
        .tempfile_in(dir)
        .unwrap();
    std::io::Write::write_all(&mut tmp, contents.as_bytes()).unwrap();
    tmp
}

/// Create a backup file with a given age.
fn backup(dir: &Path, stamp: &str, age_secs: u64) -> PathBuf {
    let path = dir.join(format!("app_backup_{stamp}.tgz"));
    fs::write(&path, stamp).unwrap();
    let mtime = SystemTime::now() - Duration::from_secs(age_secs);
    File::options()
        .write(true)
        .open(&path)
        .unwrap()
        .set_modified(mtime)
        .unwrap();
    path
}

fn names(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

#[test]
fn first_install_has_no_backup() {
    let dir = tempfile::tempdir().unwrap();
    let deploy = settings(dir.path(), 5);

    let rotation = install_artifact(staged(dir.path(), "v1"), &deploy).unwrap();

    assert_eq!(rotation.backup, None);
    assert!(rotation.pruned.is_empty());
    assert_eq!(fs::read_to_string(&deploy.artifact).unwrap(), "v1");
}

#[test]
fn existing_artifact_is_moved_to_a_timestamped_backup() {
    let dir = tempfile::tempdir().unwrap();
    let deploy = settings(dir.path(), 5);
    fs::write(&deploy.artifact, "v1").unwrap();

    let rotation = install_artifact(staged(dir.path(), "v2"), &deploy).unwrap();

    let backup = rotation.backup.expect("backup created");
    let name = backup.file_name().unwrap().to_str().unwrap().to_string();
    // app_backup_YYYYmmdd_HHMMSS.tgz
    let stamp = name
        .strip_prefix("app_backup_")
        .and_then(|s| s.strip_suffix(".tgz"))
        .expect("backup naming");
    assert_eq!(stamp.len(), 15, "stamp: {stamp}");
    assert_eq!(stamp.as_bytes()[8], b'_');
    assert!(stamp.chars().filter(|c| *c != '_').all(|c| c.is_ascii_digit()));

    assert_eq!(fs::read_to_string(&backup).unwrap(), "v1");
    assert_eq!(fs::read_to_string(&deploy.artifact).unwrap(), "v2");
}

#[test]
fn rapid_reinstalls_never_overwrite_a_backup() {
    let dir = tempfile::tempdir().unwrap();
    let deploy = settings(dir.path(), 10);
    fs::write(&deploy.artifact, "v0").unwrap();

    for i in 1..=3 {
        install_artifact(staged(dir.path(), &format!("v{i}")), &deploy).unwrap();
    }

    let backups = list_backups(&deploy.artifact).unwrap();
    assert_eq!(backups.len(), 3);
    let mut contents: Vec<String> = backups
        .iter()
        .map(|b| fs::read_to_string(&b.path).unwrap())
        .collect();
    contents.sort();
    assert_eq!(contents, ["v0", "v1", "v2"]);
    assert_eq!(fs::read_to_string(&deploy.artifact).unwrap(), "v3");
}

#[test]
fn only_the_newest_backups_are_kept() {
    let dir = tempfile::tempdir().unwrap();
    let deploy = settings(dir.path(), 2);
    backup(dir.path(), "20250101_000000", 400);
    backup(dir.path(), "20250102_000000", 300);
    backup(dir.path(), "20250103_000000", 200);
    fs::write(&deploy.artifact, "current").unwrap();

    let rotation = install_artifact(staged(dir.path(), "next"), &deploy).unwrap();

    // Three old ones plus the fresh backup; keep two, delete oldest first.
    assert_eq!(
        names(&rotation.pruned),
        ["app_backup_20250101_000000.tgz", "app_backup_20250102_000000.tgz"]
    );
    let remaining = list_backups(&deploy.artifact).unwrap();
    let remaining: Vec<PathBuf> = remaining.into_iter().map(|b| b.path).collect();
    assert_eq!(remaining.len(), 2);
    assert_eq!(remaining[0], rotation.backup.unwrap(), "newest first");
    assert_eq!(names(&remaining[1..]), ["app_backup_20250103_000000.tgz"]);
}

#[test]
fn pruning_goes_by_modification_time_not_name() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = dir.path().join("app.tgz");
    // Name says newest, mtime says oldest.
    backup(dir.path(), "20991231_235959", 1000);
    backup(dir.path(), "20250101_000000", 10);

    let pruned = prune_backups(&artifact, 1);

    assert_eq!(names(&pruned), ["app_backup_20991231_235959.tgz"]);
}

#[test]
fn unrelated_files_are_never_pruned() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = dir.path().join("app.tgz");
    fs::write(dir.path().join("notes.txt"), "keep me").unwrap();
    fs::write(dir.path().join("app_backup_manual.zip"), "keep me").unwrap();
    fs::create_dir(dir.path().join("app_backup_dir.tgz")).unwrap();
    backup(dir.path(), "20250101_000000", 100);

    let pruned = prune_backups(&artifact, 0);

    assert_eq!(names(&pruned), ["app_backup_20250101_000000.tgz"]);
    assert!(dir.path().join("notes.txt").exists());
    assert!(dir.path().join("app_backup_manual.zip").exists());
    assert!(dir.path().join("app_backup_dir.tgz").is_dir());
}

#[test]
fn multi_part_extensions_keep_their_suffix() {
    let dir = tempfile::tempdir().unwrap();
    let deploy = DeploySettings {
        dir: dir.path().to_path_buf(),
        artifact: dir.path().join("site.tar.gz"),
        keep_backups: 3,
    };
    fs::write(&deploy.artifact, "old").unwrap();

    let rotation = install_artifact(staged(dir.path(), "new"), &deploy).unwrap();

    let name = rotation.backup.unwrap();
    let name = name.file_name().unwrap().to_str().unwrap();
    assert!(name.starts_with("site_backup_"), "{name}");
    assert!(name.ends_with(".tar.gz"), "{name}");
}

#[test]
fn failed_install_restores_the_previous_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let deploy = settings(dir.path(), 5);
    fs::write(&deploy.artifact, "v1").unwrap();

    // The staged archive vanished before it could be moved into place.
    let gone = staged(dir.path(), "v2");
    fs::remove_file(gone.path()).unwrap();

    let err = install_artifact(gone, &deploy).unwrap_err();

    assert!(
        matches!(err, rebuild_gate::errors::RebuildError::Packaging(_)),
        "got {err:?}"
    );
    assert_eq!(fs::read_to_string(&deploy.artifact).unwrap(), "v1");
    assert!(list_backups(&deploy.artifact).unwrap().is_empty());
}

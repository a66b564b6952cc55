// src/deploy/package.rs

use std::fs;
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;
use tempfile::NamedTempFile;
use tracing::info;

use crate::errors::{RebuildError, Result};

/// Pack `source_dir` into a gzipped tarball staged inside `staging_dir`.
///
/// Entries are stored relative to `source_dir` (as `./...`). The archive is
/// returned as a temp file so nothing at the artifact path changes until the
/// caller installs it.
pub fn create_archive(source_dir: &Path, staging_dir: &Path) -> Result<NamedTempFile> {
    if !source_dir.is_dir() {
        return Err(RebuildError::Packaging(format!(
            "build output not found at {:?}",
            source_dir
        )));
    }

    let pkg_err = |what: &str, e: std::io::Error| {
        RebuildError::Packaging(format!("{what}: {e}"))
    };

    fs::create_dir_all(staging_dir)
        .map_err(|e| pkg_err(&format!("creating {:?}", staging_dir), e))?;

    let staged = tempfile::Builder::new()
        .prefix(".staging-")
        .suffix(".tgz")
        .tempfile_in(staging_dir)
        .map_err(|e| pkg_err("creating staging file", e))?;

    let file = staged
        .reopen()
        .map_err(|e| pkg_err("opening staging file", e))?;

    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    builder.follow_symlinks(false);
    builder
        .append_dir_all(".", source_dir)
        .map_err(|e| pkg_err(&format!("archiving {:?}", source_dir), e))?;

    let encoder = builder
        .into_inner()
        .map_err(|e| pkg_err("finishing tar stream", e))?;
    let file = encoder.finish().map_err(|e| pkg_err("finishing gzip stream", e))?;
    file.sync_all().map_err(|e| pkg_err("syncing archive", e))?;

    info!(source = ?source_dir, staged = ?staged.path(), "packaged build output");
    Ok(staged)
}

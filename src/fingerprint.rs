// src/fingerprint.rs

//! Content fingerprints of the watched file.
//!
//! A fingerprint is the MD5 digest of the file's full byte content, rendered
//! as 32 lowercase hex characters. It is only used for change detection.

use std::fmt;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{RebuildError, Result};
use crate::fs::FileSystem;

const DIGEST_HEX_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint an in-memory byte slice.
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self(hex::encode(Md5::digest(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Fingerprint {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() != DIGEST_HEX_LEN || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!(
                "not a fingerprint: expected {DIGEST_HEX_LEN} hex characters, got {s:?}"
            ));
        }
        Ok(Self(s.to_ascii_lowercase()))
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Fingerprint> for String {
    fn from(value: Fingerprint) -> Self {
        value.0
    }
}

/// Compute the fingerprint of a single file.
///
/// Returns `Ok(None)` if the file does not exist, which callers treat as
/// "nothing to do yet" rather than as a failure.
pub fn compute_fingerprint(fs: &dyn FileSystem, path: &Path) -> Result<Option<Fingerprint>> {
    if !fs.exists(path) {
        return Ok(None);
    }

    let to_err = |reason: String| RebuildError::Fingerprint {
        path: path.to_path_buf(),
        reason,
    };

    let mut reader = fs.open_read(path).map_err(|e| to_err(format!("{e:#}")))?;
    let mut hasher = Md5::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf).map_err(|e| to_err(e.to_string()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    let fingerprint = Fingerprint(hex::encode(hasher.finalize()));
    debug!(path = ?path, fingerprint = %fingerprint, "computed fingerprint");
    Ok(Some(fingerprint))
}

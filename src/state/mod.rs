// src/state/mod.rs

//! Persisted rebuild state.
//!
//! - [`RebuildState`] is the record stored on disk: the last fingerprint and
//!   when it was last checked/rebuilt.
//! - [`store`] provides the `StateStore` trait and its JSON file
//!   implementation.
//! - [`lock`] guards the read-modify-write cycle with an advisory file lock.

use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

use crate::fingerprint::Fingerprint;

pub mod lock;
pub mod store;

pub use lock::StateLock;
pub use store::{FileStateStore, StateStore};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuildState {
    /// Fingerprint of the watched file as of the last successful rebuild
    /// (or the baseline, if no rebuild was needed yet).
    #[serde(default, alias = "last_hash")]
    pub last_fingerprint: Option<Fingerprint>,

    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub last_check: Option<DateTime<Local>>,

    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub last_rebuild: Option<DateTime<Local>>,
}

impl RebuildState {
    /// Record the first observed fingerprint without a rebuild.
    pub fn record_baseline(&mut self, fingerprint: Fingerprint, now: DateTime<Local>) {
        self.last_fingerprint = Some(fingerprint);
        self.last_check = Some(now);
    }

    /// Record a successful rebuild of `fingerprint`.
    pub fn record_rebuild(&mut self, fingerprint: Fingerprint, now: DateTime<Local>) {
        self.last_fingerprint = Some(fingerprint);
        self.last_check = Some(now);
        self.last_rebuild = Some(now);
    }
}

/// Accept RFC 3339 timestamps as well as naive ISO-8601 ones (no offset,
/// interpreted as local time). Anything unparseable becomes `None`.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Local>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

pub fn parse_timestamp(s: &str) -> Option<DateTime<Local>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Local));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .and_then(|naive| naive.and_local_timezone(Local).earliest())
}

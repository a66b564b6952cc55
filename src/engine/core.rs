// src/engine/core.rs

//! Pure decision core.
//!
//! Given the current fingerprint, the stored one and the first-run policy,
//! decide what one invocation should do. No IO happens here, so every branch
//! of the state machine can be tested directly.

use crate::fingerprint::Fingerprint;
use crate::types::FirstRunPolicy;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// No stored fingerprint: record the current one, do not rebuild.
    Baseline,
    /// Stored fingerprint equals the current one.
    InSync,
    /// Content changed (or first run under `FirstRunPolicy::Rebuild`).
    Rebuild { previous: Option<Fingerprint> },
}

pub fn decide(
    current: &Fingerprint,
    stored: Option<&Fingerprint>,
    policy: FirstRunPolicy,
) -> Decision {
    match stored {
        None => match policy {
            FirstRunPolicy::Baseline => Decision::Baseline,
            FirstRunPolicy::Rebuild => Decision::Rebuild { previous: None },
        },
        Some(prev) if prev == current => Decision::InSync,
        Some(prev) => Decision::Rebuild {
            previous: Some(prev.clone()),
        },
    }
}

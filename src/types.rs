use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

/// What to do when no fingerprint has been recorded yet.
///
/// - `Baseline`: record the current fingerprint and skip the rebuild
///   (default behaviour).
/// - `Rebuild`: treat the missing state as a change and rebuild right away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FirstRunPolicy {
    #[default]
    Baseline,
    Rebuild,
}

impl FromStr for FirstRunPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "baseline" => Ok(FirstRunPolicy::Baseline),
            "rebuild" => Ok(FirstRunPolicy::Rebuild),
            other => Err(format!(
                "invalid first_run policy: {other} (expected \"baseline\" or \"rebuild\")"
            )),
        }
    }
}

/// Parse a duration string like `"600s"`, `"10m"` or `"250ms"`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    let too_large = || format!("duration too large: '{}'", s);
    match unit.as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => value
            .checked_mul(60)
            .map(Duration::from_secs)
            .ok_or_else(too_large),
        "h" => value
            .checked_mul(60 * 60)
            .map(Duration::from_secs)
            .ok_or_else(too_large),
        _ => Err(format!(
            "unsupported duration unit '{}'; expected ms, s, m, or h",
            unit
        )),
    }
}

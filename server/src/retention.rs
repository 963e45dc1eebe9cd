use shared::models::WindObservation;

use crate::config::Config;

/// Hard ceiling on records kept per owner, whatever the configuration says.
pub const MAX_RETAINED: usize = 60;

/// Bounds of a retained history.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Most records kept per owner.
    pub limit: usize,
    /// Records closer than this are the same observation. `0` means only
    /// identical timestamps collide.
    pub tolerance_ms: u64,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        RetentionPolicy {
            limit: MAX_RETAINED,
            tolerance_ms: 30_000,
        }
    }
}

impl From<&Config> for RetentionPolicy {
    fn from(config: &Config) -> Self {
        RetentionPolicy {
            limit: config.retention_limit.clamp(1, MAX_RETAINED),
            tolerance_ms: config.duplicate_tolerance_ms,
        }
    }
}

impl RetentionPolicy {
    pub fn is_duplicate(&self, a: &WindObservation, b: &WindObservation) -> bool {
        let delta = a.timestamp_millis.abs_diff(b.timestamp_millis);
        delta == 0 || delta < self.tolerance_ms
    }
}

/// Merge fresh candidates into a retained history.
///
/// Candidates go first so they win collisions; of any records within the
/// tolerance only the first seen survives. The result is sorted newest first
/// and cut to the policy limit. Sorting is stable, so equal timestamps keep
/// their new-first order.
pub fn merge(
    history: &[WindObservation],
    candidates: Vec<WindObservation>,
    policy: &RetentionPolicy,
) -> Vec<WindObservation> {
    let mut kept: Vec<WindObservation> = Vec::with_capacity(candidates.len() + history.len());

    for obs in candidates.into_iter().chain(history.iter().cloned()) {
        if kept.iter().any(|k| policy.is_duplicate(k, &obs)) {
            continue;
        }
        kept.push(obs);
    }

    kept.sort_by(|a, b| b.timestamp_millis.cmp(&a.timestamp_millis));
    kept.truncate(policy.limit);
    kept
}

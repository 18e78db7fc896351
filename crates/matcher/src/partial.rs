//! Set-based partial matching between packs and episode collections

use reseed_core::ReleaseKey;
use std::collections::HashMap;
use tracing::debug;

/// Fraction of the subset that must be present in the superset for a
/// partial match. Covers season packs with a missing episode.
pub const PARTIAL_MATCH_THRESHOLD: f64 = 0.8;

/// Accepts a source/candidate pair described as `ReleaseKey -> size`
/// sets when the smaller side is fully contained in the larger, or at
/// least [`PARTIAL_MATCH_THRESHOLD`] of it is, comparing keys with
/// wildcard semantics and sizes exactly.
pub fn keyed_sets_match(
    a: &HashMap<ReleaseKey, u64>,
    b: &HashMap<ReleaseKey, u64>,
) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    let (subset, superset) = if a.len() <= b.len() { (a, b) } else { (b, a) };

    let present = subset
        .iter()
        .filter(|(key, size)| {
            superset
                .iter()
                .any(|(other, other_size)| key.matches(other) && *size == other_size)
        })
        .count();

    let ratio = present as f64 / subset.len() as f64;
    debug!(
        subset = subset.len(),
        present, ratio, "computed partial-match coverage"
    );
    ratio >= PARTIAL_MATCH_THRESHOLD
}

//! Nearest-rank percentile filtering of scored workloads
//!
//! A positive percentile keeps only workloads whose aggregate score is at or
//! above the score at that rank. Zero or a negative percentile disables
//! filtering.

use crate::models::PodMetricsWithAnomaly;
use crate::pipeline::ScoredCollection;

/// Score at nearest rank `percentile` of `scores`.
///
/// The rank index is `(n - 1) * p / 100` with integer truncation, `p`
/// clamped to `0..=100`. An empty slice has a cutoff of 0.
pub fn percentile_cutoff(scores: &[f32], percentile: i64) -> f32 {
    if scores.is_empty() {
        return 0.0;
    }

    let mut sorted = scores.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let p = percentile.clamp(0, 100) as usize;
    sorted[(sorted.len() - 1) * p / 100]
}

/// Keep the workloads at or above the percentile cutoff, in original order.
///
/// Ties at the cutoff are all kept. With `percentile <= 0` or no scores the
/// items are returned unchanged.
pub fn filter_by_percentile(
    collection: ScoredCollection,
    percentile: i64,
) -> Vec<PodMetricsWithAnomaly> {
    if percentile <= 0 || collection.scores.is_empty() {
        return collection.items;
    }

    let cutoff = percentile_cutoff(&collection.scores, percentile);

    collection
        .items
        .into_iter()
        .zip(collection.scores)
        .filter(|(_, score)| *score >= cutoff)
        .map(|(item, _)| item)
        .collect()
}

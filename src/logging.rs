//! Formatted logging of consolidation summaries.
//!
//! Human-readable rollups of the per-stage metric counters, plus the small
//! formatting helpers they share. Summaries are purely informational: nothing
//! in the pipeline reads back what these functions emit.

use std::time::Duration;

use crate::metrics::{ConsolidationMetrics, DedupMetrics, FilterMetrics, PruneMetrics};

/// Formats a count with thousands separators.
///
/// # Examples
///
/// ```
/// use fgindel::logging::format_count;
///
/// assert_eq!(format_count(1234567), "1,234,567");
/// assert_eq!(format_count(123), "123");
/// ```
#[must_use]
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();

    digits
        .as_bytes()
        .rchunks(3)
        .rev()
        .map(|chunk| std::str::from_utf8(chunk).unwrap())
        .collect::<Vec<_>>()
        .join(",")
}

/// Formats a fraction (0.0-1.0) as a percentage with the given decimal places.
///
/// # Examples
///
/// ```
/// use fgindel::logging::format_percent;
///
/// assert_eq!(format_percent(0.9543, 2), "95.43%");
/// assert_eq!(format_percent(0.5, 1), "50.0%");
/// ```
#[must_use]
pub fn format_percent(value: f64, decimals: usize) -> String {
    format!("{:.decimals$}%", value * 100.0, decimals = decimals)
}

/// Formats a duration in human-readable form.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use fgindel::logging::format_duration;
///
/// assert_eq!(format_duration(Duration::from_secs(45)), "45s");
/// assert_eq!(format_duration(Duration::from_secs(135)), "2m 15s");
/// assert_eq!(format_duration(Duration::from_secs(5400)), "1h 30m");
/// ```
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        let mins = secs / 60;
        let rest = secs % 60;
        if rest == 0 { format!("{mins}m") } else { format!("{mins}m {rest}s") }
    } else {
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        if mins == 0 { format!("{hours}h") } else { format!("{hours}h {mins}m") }
    }
}

/// Logs a formatted summary of candidate filter decisions.
pub fn log_filter_summary(metrics: &FilterMetrics) {
    log::info!("Candidate Filter Summary:");
    log::info!("  Evidence keys: {}", format_count(metrics.total_keys));
    if metrics.malformed_keys > 0 {
        log::info!("  Malformed keys skipped: {}", format_count(metrics.malformed_keys));
    }
    if metrics.zero_observation_keys > 0 {
        log::info!(
            "  Zero-observation keys skipped: {}",
            format_count(metrics.zero_observation_keys)
        );
    }
    log::info!(
        "  Accepted: {} ({} kept, {} rescued)",
        format_count(metrics.accepted()),
        format_count(metrics.kept),
        format_count(metrics.rescued)
    );
    log::info!(
        "  Rejected: {} ({} below threshold, {} poor single, {} poor edge)",
        format_count(metrics.rejected()),
        format_count(metrics.below_threshold),
        format_count(metrics.poor_single),
        format_count(metrics.poor_edge)
    );
    if metrics.total_candidates() > 0 {
        let rate = metrics.accepted() as f64 / metrics.total_candidates() as f64;
        log::info!("  Acceptance rate: {}", format_percent(rate, 2));
    }
}

/// Logs a formatted summary of pruning decisions.
pub fn log_prune_summary(metrics: &PruneMetrics) {
    log::info!("Pruning Summary:");
    log::info!("  Input candidates: {}", format_count(metrics.input_candidates));
    log::info!(
        "  Concurrent insertions collapsed: {}",
        format_count(metrics.concurrent_insertions_collapsed)
    );
    log::info!("  Proximity pruned: {}", format_count(metrics.proximity_pruned));
    log::info!("  Surviving: {}", format_count(metrics.surviving));
}

/// Logs a formatted summary of deduplication decisions.
pub fn log_dedup_summary(metrics: &DedupMetrics) {
    log::info!("Deduplication Summary:");
    log::info!("  Input candidates: {}", format_count(metrics.input_candidates));
    log::info!("  Identity merged: {}", format_count(metrics.identity_merged));
    if metrics.weak_repeat_removed > 0 {
        log::info!("  Weak in repeat regions: {}", format_count(metrics.weak_repeat_removed));
    }
    if metrics.neighbor_collapsed > 0 {
        log::info!("  Neighbor collapsed: {}", format_count(metrics.neighbor_collapsed));
    }
    if metrics.same_position_removed > 0 {
        log::info!("  Same-position removed: {}", format_count(metrics.same_position_removed));
    }
    if metrics.ambiguous_group_removed > 0 {
        log::info!(
            "  Ambiguous groups removed: {}",
            format_count(metrics.ambiguous_group_removed)
        );
    }
    log::info!("  Surviving: {}", format_count(metrics.surviving));
}

/// Logs the end-to-end consolidation summary for one chromosome.
pub fn log_consolidation_summary(chrom: &str, metrics: &ConsolidationMetrics, elapsed: Duration) {
    log::info!("Consolidated {chrom} in {}", format_duration(elapsed));
    log::info!("  Candidates accepted: {}", format_count(metrics.filter.accepted()));
    if let Some(prune) = &metrics.prune {
        let pruned = prune.concurrent_insertions_collapsed + prune.proximity_pruned;
        log::info!("  Pruned: {}", format_count(pruned));
    }
    log::info!("  Contextualized: {}", format_count(metrics.contextualized));
    if metrics.context_rejected > 0 {
        log::info!("  Context rejected: {}", format_count(metrics.context_rejected));
    }
    log::info!("  Final candidates: {}", format_count(metrics.dedup.surviving));
}

//! End-to-end consolidation of one chromosome's evidence.
//!
//! Wires the stages together in their fixed order: merge evidence tables,
//! filter into scored candidates, optionally prune, contextualize against the
//! reference window, deduplicate. Each stage's counters land in one
//! [`ConsolidationMetrics`] and the standard summaries are logged on the way
//! out. Chromosomes are independent, so callers wanting parallelism run one
//! invocation per chromosome.

use std::time::Instant;

use crate::context;
use crate::dedup;
use crate::evidence::{merge_evidence_tables, EvidenceTable};
use crate::filter::{filter_candidates, FilterThresholds};
use crate::indel::ContextualizedIndel;
use crate::logging;
use crate::metrics::ConsolidationMetrics;
use crate::prune;
use crate::reference::ReferenceWindow;

/// Options shaping one consolidation run.
#[derive(Debug, Clone)]
pub struct ConsolidateOptions {
    /// Apply the rescue predicate to candidates failing the hard thresholds
    pub allow_rescue: bool,
    /// Proximity-pruning bin size in bases; `None` skips the pruning stage
    pub prune_bin_size: Option<i64>,
}

impl Default for ConsolidateOptions {
    fn default() -> Self {
        Self { allow_rescue: true, prune_bin_size: None }
    }
}

/// Consolidates evidence tables into the final candidate set for `chrom`.
///
/// `window` must cover the region the evidence was collected from; candidates
/// falling outside it are rejected during contextualization. Candidates the
/// filter assigns to other chromosomes are counted but not returned.
#[must_use]
pub fn consolidate_chromosome(
    tables: impl IntoIterator<Item = EvidenceTable>,
    chrom: &str,
    window: &ReferenceWindow,
    thresholds: &FilterThresholds,
    options: &ConsolidateOptions,
) -> (Vec<ContextualizedIndel>, ConsolidationMetrics) {
    let start = Instant::now();
    let mut metrics = ConsolidationMetrics::new();

    let table = merge_evidence_tables(tables);
    let mut filtered = filter_candidates(&table, thresholds, options.allow_rescue);
    logging::log_filter_summary(&filtered.metrics);
    metrics.filter = filtered.metrics.clone();

    let mut candidates = filtered.take_chromosome(chrom);
    if let Some(bin_size) = options.prune_bin_size {
        let (kept, prune_metrics) = prune::prune(candidates, bin_size);
        logging::log_prune_summary(&prune_metrics);
        metrics.prune = Some(prune_metrics);
        candidates = kept;
    }

    let mut contextualized: Vec<ContextualizedIndel> = Vec::with_capacity(candidates.len());
    for candidate in &candidates {
        match context::contextualize(candidate, window) {
            Some(indel) => {
                metrics.contextualized += 1;
                contextualized.push(indel);
            }
            None => metrics.context_rejected += 1,
        }
    }

    let (survivors, dedup_metrics) = dedup::deduplicate(contextualized, window);
    logging::log_dedup_summary(&dedup_metrics);
    metrics.dedup = dedup_metrics;

    logging::log_consolidation_summary(chrom, &metrics, start.elapsed());
    (survivors, metrics)
}

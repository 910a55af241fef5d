//! Structured metric types for consolidation stages.
//!
//! Each pipeline stage reports its decisions as plain counters. The embedding
//! application decides what to do with them; [`crate::logging`] renders the
//! standard human-readable summaries.

use serde::{Deserialize, Serialize};

/// Common interface for metrics that track processing pipeline counts.
///
/// Provides a consistent way to access input, output, and filtered counts
/// across stage metric types, enabling generic summary output.
pub trait ProcessingMetrics {
    /// Total number of input items processed.
    fn total_input(&self) -> u64;

    /// Total number of output items produced.
    fn total_output(&self) -> u64;

    /// Total number of items filtered out or rejected.
    fn total_filtered(&self) -> u64;

    /// Processing efficiency as a percentage (output / input * 100).
    fn efficiency(&self) -> f64 {
        if self.total_input() == 0 {
            0.0
        } else {
            self.total_output() as f64 / self.total_input() as f64 * 100.0
        }
    }
}

/// Candidate filter decision counters.
///
/// Decisions are per candidate: a compound evidence key contributes two.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterMetrics {
    /// Evidence keys examined
    pub total_keys: u64,
    /// Keys skipped because the key string could not be parsed
    pub malformed_keys: u64,
    /// Keys skipped because they carried zero observations
    pub zero_observation_keys: u64,
    /// Candidates accepted on thresholds alone
    pub kept: u64,
    /// Candidates accepted only through the rescue predicate
    pub rescued: u64,
    /// Candidates rejected below the hard thresholds
    pub below_threshold: u64,
    /// Single-observation candidates rejected on quality
    pub poor_single: u64,
    /// Near-threshold candidates rejected on quality
    pub poor_edge: u64,
}

impl FilterMetrics {
    /// Creates a new metrics struct with all counts at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total candidates evaluated (accepted plus rejected).
    #[must_use]
    pub fn total_candidates(&self) -> u64 {
        self.accepted() + self.rejected()
    }

    /// Candidates that made it into the output.
    #[must_use]
    pub fn accepted(&self) -> u64 {
        self.kept + self.rescued
    }

    /// Candidates rejected for any reason.
    #[must_use]
    pub fn rejected(&self) -> u64 {
        self.below_threshold + self.poor_single + self.poor_edge
    }
}

impl ProcessingMetrics for FilterMetrics {
    fn total_input(&self) -> u64 {
        self.total_candidates()
    }

    fn total_output(&self) -> u64 {
        self.accepted()
    }

    fn total_filtered(&self) -> u64 {
        self.rejected()
    }
}

/// Deduplication decision counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DedupMetrics {
    /// Contextualized candidates received
    pub input_candidates: u64,
    /// Candidates folded into an identical candidate's evidence
    pub identity_merged: u64,
    /// Weak short variants dropped inside complex regions
    pub weak_repeat_removed: u64,
    /// Candidates removed as behaviorally equivalent to a stronger neighbor
    pub neighbor_collapsed: u64,
    /// Candidates removed by the same-position comparison
    pub same_position_removed: u64,
    /// Candidates removed because their position group had no clear winner
    pub ambiguous_group_removed: u64,
    /// Candidates surviving all passes
    pub surviving: u64,
}

impl DedupMetrics {
    /// Creates a new metrics struct with all counts at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Candidates removed for any reason, including identity merges.
    #[must_use]
    pub fn removed(&self) -> u64 {
        self.identity_merged
            + self.weak_repeat_removed
            + self.neighbor_collapsed
            + self.same_position_removed
            + self.ambiguous_group_removed
    }
}

impl ProcessingMetrics for DedupMetrics {
    fn total_input(&self) -> u64 {
        self.input_candidates
    }

    fn total_output(&self) -> u64 {
        self.surviving
    }

    fn total_filtered(&self) -> u64 {
        self.removed()
    }
}

/// Pruning decision counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PruneMetrics {
    /// Candidates received
    pub input_candidates: u64,
    /// Same-position concurrent insertions collapsed into a winner
    pub concurrent_insertions_collapsed: u64,
    /// Candidates removed by a locally dominant neighbor
    pub proximity_pruned: u64,
    /// Candidates surviving both steps
    pub surviving: u64,
}

impl PruneMetrics {
    /// Creates a new metrics struct with all counts at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProcessingMetrics for PruneMetrics {
    fn total_input(&self) -> u64 {
        self.input_candidates
    }

    fn total_output(&self) -> u64 {
        self.surviving
    }

    fn total_filtered(&self) -> u64 {
        self.concurrent_insertions_collapsed + self.proximity_pruned
    }
}

/// Combined metrics for one chromosome's consolidation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsolidationMetrics {
    /// Candidate filter counters
    pub filter: FilterMetrics,
    /// Pruning counters, present when pruning ran
    pub prune: Option<PruneMetrics>,
    /// Candidates successfully contextualized against the reference
    pub contextualized: u64,
    /// Candidates rejected during contextualization
    pub context_rejected: u64,
    /// Deduplication counters
    pub dedup: DedupMetrics,
}

impl ConsolidationMetrics {
    /// Creates a new metrics struct with all counts at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

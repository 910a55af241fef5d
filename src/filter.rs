//! Candidate filtering: turns merged evidence into scored candidate indels.
//!
//! Each evidence-table entry is parsed, decomposed if compound, scored, and run
//! through a fixed decision ladder: hard thresholds first (with an optional
//! rescue override for high-confidence evidence), then quality checks for
//! single-observation and near-threshold candidates. Accepted candidates are
//! grouped by chromosome; every decision is counted in [`FilterMetrics`].

use ahash::AHashMap;
use itertools::Itertools;
use log::{debug, warn};

use crate::errors::{FgindelError, Result};
use crate::evidence::{EvidenceCounts, EvidenceKey, EvidenceTable};
use crate::indel::{CandidateIndel, IndelDescriptor};
use crate::metrics::FilterMetrics;

/// Thresholds governing candidate acceptance.
///
/// The defaults are library conveniences; the surrounding application supplies
/// tuned values per run.
#[derive(Debug, Clone)]
pub struct FilterThresholds {
    /// Minimum observations for acceptance
    pub found_threshold: u64,
    /// Minimum average anchor length on each side
    pub anchor_threshold: f64,
    /// Minimum observations for the rescue predicate
    pub strict_found_threshold: u64,
    /// Minimum average anchor length for the rescue predicate
    pub strict_anchor_threshold: f64,
    /// Maximum average mess score
    pub max_mess: f64,
}

impl Default for FilterThresholds {
    fn default() -> Self {
        Self {
            found_threshold: 3,
            anchor_threshold: 10.0,
            strict_found_threshold: 5,
            strict_anchor_threshold: 20.0,
            max_mess: 4.0,
        }
    }
}

impl FilterThresholds {
    /// Checks that every threshold is finite and non-negative.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("anchor-threshold", self.anchor_threshold),
            ("strict-anchor-threshold", self.strict_anchor_threshold),
            ("max-mess", self.max_mess),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(FgindelError::InvalidParameter {
                    parameter: name.to_string(),
                    reason: format!("must be finite and non-negative, got {value}"),
                });
            }
        }
        Ok(())
    }

    /// Observation count at or below which a candidate is still "near the edge"
    /// and subject to the stricter quality check.
    #[must_use]
    pub fn edge_threshold(&self) -> f64 {
        ((self.found_threshold + 1) as f64).max(self.found_threshold as f64 * 1.5)
    }
}

/// The outcome of evaluating one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterDecision {
    /// Accepted on thresholds alone
    Kept,
    /// Accepted only through the rescue predicate
    Rescued,
    /// Rejected below the hard thresholds
    BelowThreshold,
    /// Single observation with weak anchors, high mess, or low quality
    PoorSingle,
    /// Near-threshold support with high mess or low quality
    PoorEdge,
}

impl FilterDecision {
    /// True when the candidate makes it into the output.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Kept | Self::Rescued)
    }

    /// Returns a human-readable description.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Kept => "Accepted on thresholds",
            Self::Rescued => "Accepted through rescue",
            Self::BelowThreshold => "Below support or anchor thresholds",
            Self::PoorSingle => "Single observation of poor quality",
            Self::PoorEdge => "Near-threshold support of poor quality",
        }
    }
}

/// Scores one candidate from its evidence counters.
///
/// The score grows with observation count, anchor depth, strand/stitched
/// balance, reputable support, and base quality, and shrinks with mess in
/// excess of the indel length. Always non-negative; zero observations score 0.
#[must_use]
pub fn score_evidence(counts: &EvidenceCounts, indel_length: usize) -> u32 {
    if counts.observations == 0 {
        return 0;
    }
    let n = counts.observations as f64;
    let average_anchor = (counts.left_anchor_sum + counts.right_anchor_sum) as f64 / n;
    // Mess in excess of what the indel itself accounts for.
    let average_mess = counts.average_mess() - indel_length as f64;

    let strand_ratio = {
        let low = counts.forward_count.min(counts.reverse_count) as f64;
        let high = counts.forward_count.max(counts.reverse_count) as f64;
        if high == 0.0 { 0.0 } else { low / high }
    };
    let balance = (strand_ratio + counts.stitched_fraction()).max(1.0);

    let anchor_balance = {
        let low = counts.left_anchor_sum.min(counts.right_anchor_sum) as f64;
        let high = counts.left_anchor_sum.max(counts.right_anchor_sum) as f64;
        if low == 0.0 { 1.0 } else { (high / low).max(1.0) }
    };

    let support = (average_anchor / 2.0 - average_mess).max(1.0);
    let raw = n
        * support
        * balance
        * anchor_balance
        * (1.0 + counts.reputable_fraction())
        * (counts.average_quality() / 30.0);
    raw.round().clamp(0.0, f64::from(u32::MAX)) as u32
}

/// Runs the acceptance ladder for one candidate.
///
/// `is_compound` selects the looser secondary rescue pass available to members
/// of compound observations.
#[must_use]
pub fn evaluate_candidate(
    descriptor: &IndelDescriptor,
    counts: &EvidenceCounts,
    is_compound: bool,
    thresholds: &FilterThresholds,
    allow_rescue: bool,
) -> FilterDecision {
    let n = counts.observations;
    let average_mess = counts.average_mess();
    let average_quality = counts.average_quality();

    let below_threshold = n < thresholds.found_threshold
        || counts.average_left_anchor() < thresholds.anchor_threshold
        || counts.average_right_anchor() < thresholds.anchor_threshold
        || average_mess > thresholds.max_mess;
    if below_threshold {
        if allow_rescue && rescue_applies(descriptor, counts, is_compound, thresholds) {
            return FilterDecision::Rescued;
        }
        return FilterDecision::BelowThreshold;
    }

    if n == 1
        && (counts.left_anchor_sum.min(counts.right_anchor_sum) < 5
            || average_mess > 1.0
            || average_quality < 30.0)
    {
        return FilterDecision::PoorSingle;
    }

    if n as f64 <= thresholds.edge_threshold() && (average_mess > 2.0 || average_quality < 25.0) {
        return FilterDecision::PoorEdge;
    }

    FilterDecision::Kept
}

/// The rescue predicate: overrides a below-threshold rejection when auxiliary
/// quality signals are strong enough.
fn rescue_applies(
    descriptor: &IndelDescriptor,
    counts: &EvidenceCounts,
    is_compound: bool,
    thresholds: &FilterThresholds,
) -> bool {
    let n = counts.observations;

    // Single-base candidates with marginal support are never rescued.
    if !is_compound
        && descriptor.length() == 1
        && ((n as f64) < 0.8 * thresholds.found_threshold as f64 || n < 2)
    {
        return false;
    }

    let average_left = counts.average_left_anchor();
    let average_right = counts.average_right_anchor();
    let min_anchor = average_left.min(average_right);
    let average_mess = counts.average_mess();
    let average_quality = counts.average_quality();
    let reputable = counts.reputable_fraction();

    let strict = min_anchor >= thresholds.strict_anchor_threshold
        && n >= thresholds.strict_found_threshold;
    let pristine =
        average_quality > 32.0 && reputable > 0.75 && min_anchor > 30.0 && average_mess <= 0.4;
    let balanced = average_mess <= (min_anchor / 20.0).max(1.5)
        && reputable > 0.6
        && (counts.forward_fraction() - counts.reverse_fraction() + counts.stitched_fraction())
            .abs()
            < 0.25;
    let anchored = (n > 2 && average_left > 20.0 && average_right > 20.0)
        || (average_left > 30.0 && average_right > 30.0);

    if strict && (pristine || balanced) && anchored {
        return true;
    }

    // Compound members get a looser secondary pass: their linked partner is
    // independent corroboration.
    is_compound
        && average_quality > 34.0
        && average_mess <= 1.0
        && average_left > 10.0
        && average_right > 10.0
}

/// Accepted candidates grouped by chromosome, with decision counters.
#[derive(Debug, Default)]
pub struct FilterOutput {
    /// Accepted candidates per chromosome
    pub candidates_by_chrom: AHashMap<String, Vec<CandidateIndel>>,
    /// Decision counters
    pub metrics: FilterMetrics,
}

impl FilterOutput {
    /// Takes the candidate list for one chromosome, empty when none survived.
    #[must_use]
    pub fn take_chromosome(&mut self, chrom: &str) -> Vec<CandidateIndel> {
        self.candidates_by_chrom.remove(chrom).unwrap_or_default()
    }
}

/// Filters a merged evidence table into scored candidates.
///
/// Malformed keys and zero-observation entries are skipped and counted, never
/// fatal. Keys are processed in lexicographic order so the per-chromosome
/// candidate lists come out deterministic.
#[must_use]
pub fn filter_candidates(
    table: &EvidenceTable,
    thresholds: &FilterThresholds,
    allow_rescue: bool,
) -> FilterOutput {
    let mut output = FilterOutput::default();
    output.metrics.total_keys = table.len() as u64;

    for (key_text, counts) in table.iter().sorted_by(|a, b| a.0.cmp(b.0)) {
        let key = match key_text.parse::<EvidenceKey>() {
            Ok(key) => key,
            Err(error) => {
                warn!("Skipping evidence entry: {error}");
                output.metrics.malformed_keys += 1;
                continue;
            }
        };
        if counts.observations == 0 {
            debug!("Skipping evidence entry with zero observations: {key}");
            output.metrics.zero_observation_keys += 1;
            continue;
        }

        let parts: Vec<(IndelDescriptor, Option<IndelDescriptor>)> = match &key {
            EvidenceKey::Single(descriptor) => vec![(descriptor.clone(), None)],
            EvidenceKey::Compound(first, second) => vec![
                (first.clone(), Some(second.clone())),
                (second.clone(), Some(first.clone())),
            ],
        };

        for (descriptor, partner) in parts {
            let decision = evaluate_candidate(
                &descriptor,
                counts,
                key.is_compound(),
                thresholds,
                allow_rescue,
            );
            match decision {
                FilterDecision::Kept => output.metrics.kept += 1,
                FilterDecision::Rescued => output.metrics.rescued += 1,
                FilterDecision::BelowThreshold => output.metrics.below_threshold += 1,
                FilterDecision::PoorSingle => output.metrics.poor_single += 1,
                FilterDecision::PoorEdge => output.metrics.poor_edge += 1,
            }
            if !decision.is_accepted() {
                debug!("Rejected {}: {}", descriptor, decision.description());
                continue;
            }

            let score = score_evidence(counts, descriptor.length());
            let mut candidate =
                CandidateIndel::new(descriptor).with_observations(counts.observations);
            candidate.score = score;
            if let Some(partner) = partner {
                candidate = candidate.with_partner(partner);
            }
            output
                .candidates_by_chrom
                .entry(candidate.descriptor.chrom.clone())
                .or_default()
                .push(candidate);
        }
    }

    output
}

//! Deduplication of contextualized candidates.
//!
//! Evidence collection produces several representations of one underlying
//! event: literal duplicates, placements shifted within a repeat whose spliced
//! consequence is identical, and same-position allele variants that exist only
//! as noise around a real call. This module folds each cluster down to a single
//! representative.
//!
//! Removal decisions are made per chromosome in four passes: identity merge,
//! weak-variant cut in complex regions, neighbor collapse, and same-position
//! collapse. Candidates flagged [`ContextualizedIndel::is_spiked`] are never
//! removed.

use ahash::AHashMap;
use itertools::Itertools;
use log::debug;

use crate::indel::{ContextualizedIndel, IndelCategory, IndelIdentity};
use crate::metrics::DedupMetrics;
use crate::reference::ReferenceWindow;

/// Maximum distance in bases between neighbor-collapse candidates.
const NEIGHBOR_RANGE: i64 = 75;

/// Half-width of the spliced-sequence comparison window.
const SPLICE_HALF_WINDOW: i64 = 75;

/// Divisor applied to the median observation count for the weak-variant cut.
const WEAK_REPEAT_DIVISOR: u64 = 5;

/// Collapses a chromosome's contextualized candidates to one per event.
///
/// The window must be the same reference slice the candidates were
/// contextualized against. Output is sorted by position, then category, then
/// descending score.
#[must_use]
pub fn deduplicate(
    candidates: Vec<ContextualizedIndel>,
    window: &ReferenceWindow,
) -> (Vec<ContextualizedIndel>, DedupMetrics) {
    let mut metrics = DedupMetrics::new();
    metrics.input_candidates = candidates.len() as u64;
    if candidates.is_empty() {
        return (Vec::new(), metrics);
    }

    let mut observed: Vec<u64> = candidates.iter().map(|c| c.observations).collect();
    observed.sort_unstable();
    let weak_threshold = observed[observed.len() / 2] / WEAK_REPEAT_DIVISOR;

    // One representative per identity: highest score wins, first seen wins
    // ties, and observation counts pool onto the representative.
    let mut merged: Vec<ContextualizedIndel> = Vec::with_capacity(candidates.len());
    let mut by_identity: AHashMap<IndelIdentity, usize> = AHashMap::new();
    for candidate in candidates {
        let identity = candidate.identity();
        if let Some(&index) = by_identity.get(&identity) {
            let representative = &mut merged[index];
            let pooled = representative.observations + candidate.observations;
            if candidate.score > representative.score {
                *representative = candidate;
            }
            representative.observations = pooled;
            metrics.identity_merged += 1;
        } else {
            by_identity.insert(identity, merged.len());
            merged.push(candidate);
        }
    }

    let mut removed = vec![false; merged.len()];

    for (index, candidate) in merged.iter().enumerate() {
        if !candidate.in_multi
            && !candidate.is_spiked
            && candidate.untrustworthy_in_repeat
            && candidate.observations < weak_threshold
        {
            removed[index] = true;
            metrics.weak_repeat_removed += 1;
            debug!("Removing weak short variant in complex region: {}", candidate.descriptor);
        }
    }

    collapse_neighbors(&merged, window, &mut removed, &mut metrics);
    collapse_same_position(&merged, &mut removed, &mut metrics);

    let mut survivors: Vec<ContextualizedIndel> = merged
        .into_iter()
        .enumerate()
        .filter(|&(index, _)| !removed[index])
        .map(|(_, candidate)| candidate)
        .collect();
    survivors.sort_by(|left, right| {
        left.pos()
            .cmp(&right.pos())
            .then_with(|| left.category.cmp(&right.category))
            .then_with(|| right.score.cmp(&left.score))
            .then_with(|| left.descriptor.alt_allele.cmp(&right.descriptor.alt_allele))
    });
    metrics.surviving = survivors.len() as u64;
    (survivors, metrics)
}

/// Removes weaker neighbors whose spliced consequence matches a stronger
/// candidate's.
///
/// Candidates are visited in descending score order; score ties are visited in
/// ascending position order for insertions and descending for deletions, so
/// that of two equivalent placements the left-aligned insertion and the
/// right-aligned deletion survive as canonical.
fn collapse_neighbors(
    merged: &[ContextualizedIndel],
    window: &ReferenceWindow,
    removed: &mut [bool],
    metrics: &mut DedupMetrics,
) {
    let mut order: Vec<usize> =
        (0..merged.len()).filter(|&index| !removed[index] && !merged[index].in_multi).collect();
    order.sort_by(|&a, &b| {
        let left = &merged[a];
        let right = &merged[b];
        right
            .score
            .cmp(&left.score)
            .then_with(|| left.category.cmp(&right.category))
            .then_with(|| match left.category {
                IndelCategory::Insertion => left.pos().cmp(&right.pos()),
                IndelCategory::Deletion => right.pos().cmp(&left.pos()),
            })
            .then_with(|| left.descriptor.alt_allele.cmp(&right.descriptor.alt_allele))
    });

    for &index in &order {
        if removed[index] {
            continue;
        }
        let candidate = &merged[index];
        for &other_index in &order {
            if other_index == index || removed[other_index] {
                continue;
            }
            let neighbor = &merged[other_index];
            if neighbor.is_spiked
                || neighbor.category != candidate.category
                || neighbor.length != candidate.length
                || (neighbor.pos() - candidate.pos()).abs() > NEIGHBOR_RANGE
            {
                continue;
            }
            let outgunned = 2 * u64::from(neighbor.score) < u64::from(candidate.score);
            if !outgunned && !neighbor.from_softclip {
                continue;
            }
            if !splices_equivalent(candidate, neighbor, window) {
                continue;
            }
            removed[other_index] = true;
            metrics.neighbor_collapsed += 1;
            debug!(
                "Collapsing {} into equivalent stronger neighbor {}",
                neighbor.descriptor, candidate.descriptor
            );
        }
    }
}

/// Removes dominated challengers among candidates at one exact (position,
/// category), then discards position groups that still have no clear winner.
///
/// Comparisons use the scores and observation counts the candidates entered
/// the pass with, so the outcome does not depend on visit order. Challengers
/// flagged `hard_to_call` are immune to pairwise removal but not to the
/// ambiguous-group discard.
fn collapse_same_position(
    merged: &[ContextualizedIndel],
    removed: &mut [bool],
    metrics: &mut DedupMetrics,
) {
    let mut groups: AHashMap<(i64, IndelCategory), Vec<usize>> = AHashMap::new();
    for (index, candidate) in merged.iter().enumerate() {
        if !removed[index] && !candidate.in_multi {
            groups.entry((candidate.pos(), candidate.category)).or_default().push(index);
        }
    }
    let group_keys = groups
        .iter()
        .filter(|(_, members)| members.len() > 1)
        .map(|(key, _)| *key)
        .sorted_unstable();

    for key in group_keys {
        let Some(members) = groups.get(&key) else {
            continue;
        };
        let mut marked = vec![false; members.len()];
        for &champion_index in members {
            let champion = &merged[champion_index];
            for (challenger_at, &challenger_index) in members.iter().enumerate() {
                if challenger_index == champion_index || marked[challenger_at] {
                    continue;
                }
                let challenger = &merged[challenger_index];
                if challenger.hard_to_call || challenger.is_spiked {
                    continue;
                }
                let dwarfed = 2 * u64::from(challenger.score) < u64::from(champion.score)
                    && challenger.observations.saturating_mul(2) < champion.observations;
                let noise_prefix = champion.category == IndelCategory::Insertion
                    && challenger.observations <= 2
                    && challenger.observations <= champion.observations
                    && is_strict_prefix(
                        &challenger.descriptor.alt_allele,
                        &champion.descriptor.alt_allele,
                    );
                if dwarfed || noise_prefix {
                    marked[challenger_at] = true;
                    metrics.same_position_removed += 1;
                    debug!(
                        "Removing same-position candidate {} dominated by {}",
                        challenger.descriptor, champion.descriptor
                    );
                }
            }
        }

        let remaining: Vec<usize> = members
            .iter()
            .enumerate()
            .filter(|&(at, _)| !marked[at])
            .map(|(_, &index)| index)
            .collect();
        if remaining.len() > 2 {
            let (pos, category) = key;
            debug!(
                "Discarding ambiguous group of {} {category}s at position {pos}",
                remaining.len()
            );
            for &index in &remaining {
                if !merged[index].is_spiked {
                    removed[index] = true;
                    metrics.ambiguous_group_removed += 1;
                }
            }
        }
        for (at, &index) in members.iter().enumerate() {
            if marked[at] {
                removed[index] = true;
            }
        }
    }
}

/// True when splicing each variant into the reference yields sequences a read
/// could not tell apart: at most one positional mismatch, or exactly two that
/// form a reciprocal base swap.
fn splices_equivalent(
    first: &ContextualizedIndel,
    second: &ContextualizedIndel,
    window: &ReferenceWindow,
) -> bool {
    let (Some(first_anchor), Some(second_anchor)) =
        (window.index_of(first.pos()), window.index_of(second.pos()))
    else {
        return false;
    };
    let midpoint = (first_anchor as i64 + second_anchor as i64) / 2;
    let from = midpoint - SPLICE_HALF_WINDOW;
    let to = midpoint + SPLICE_HALF_WINDOW;
    let first_splice = effective_sequence(first, first_anchor, window, from, to);
    let second_splice = effective_sequence(second, second_anchor, window, from, to);

    let mut mismatches: Vec<usize> = Vec::new();
    for (offset, (a, b)) in first_splice.iter().zip(second_splice.iter()).enumerate() {
        if a != b {
            mismatches.push(offset);
            if mismatches.len() > 2 {
                return false;
            }
        }
    }
    let overhang = first_splice.len().abs_diff(second_splice.len());
    match mismatches.len() + overhang {
        0 | 1 => true,
        2 if overhang == 0 => {
            let (at, over) = (mismatches[0], mismatches[1]);
            first_splice[at] == second_splice[over] && first_splice[over] == second_splice[at]
        }
        _ => false,
    }
}

/// The reference over window-relative `[from, to)` with the variant spliced in.
fn effective_sequence(
    indel: &ContextualizedIndel,
    anchor: usize,
    window: &ReferenceWindow,
    from: i64,
    to: i64,
) -> Vec<u8> {
    let anchor = anchor as i64;
    let mut sequence = window.slice_clamped(from, anchor + 1).to_vec();
    match indel.category {
        IndelCategory::Insertion => {
            let inserted = indel.descriptor.alt_allele.as_bytes().get(1..).unwrap_or_default();
            sequence.extend_from_slice(inserted);
            sequence.extend_from_slice(window.slice_clamped(anchor + 1, to));
        }
        IndelCategory::Deletion => {
            let after_deleted = anchor + 1 + indel.length as i64;
            sequence.extend_from_slice(window.slice_clamped(after_deleted, to));
        }
    }
    sequence
}

fn is_strict_prefix(shorter: &str, longer: &str) -> bool {
    shorter.len() < longer.len() && longer.starts_with(shorter)
}

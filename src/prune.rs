//! Optional pruning of scored candidates before contextualization.
//!
//! Two cuts run over one chromosome's candidate list: same-position concurrent
//! long insertions collapse onto their clear winner, and locally dominant
//! candidates shed much weaker neighbors within a configured distance. Discards
//! from both accumulate into one blacklist applied at the end, so input order
//! is preserved for the survivors.

use ahash::AHashMap;
use itertools::Itertools;
use log::debug;

use crate::indel::{CandidateIndel, IndelCategory};
use crate::metrics::PruneMetrics;

/// Insertion length at which same-position concurrent candidates collapse.
const CONCURRENT_MIN_LENGTH: usize = 10;

/// Prunes a chromosome's candidate list.
///
/// `bin_size` is the proximity-pruning distance in bases; zero or negative
/// disables the proximity step. Survivors keep their input order; score boosts
/// from the concurrent-insertion collapse are applied as copies and are visible
/// to the proximity step.
#[must_use]
pub fn prune(
    candidates: Vec<CandidateIndel>,
    bin_size: i64,
) -> (Vec<CandidateIndel>, PruneMetrics) {
    let mut metrics = PruneMetrics::new();
    metrics.input_candidates = candidates.len() as u64;

    let mut working = candidates;
    let mut blacklisted = vec![false; working.len()];
    collapse_concurrent_insertions(&mut working, &mut blacklisted, &mut metrics);
    if bin_size > 0 {
        prune_by_proximity(&working, bin_size, &mut blacklisted, &mut metrics);
    }

    let survivors: Vec<CandidateIndel> = working
        .into_iter()
        .enumerate()
        .filter(|&(index, _)| !blacklisted[index])
        .map(|(_, candidate)| candidate)
        .collect();
    metrics.surviving = survivors.len() as u64;
    (survivors, metrics)
}

/// Collapses same-position candidates of equal alternate-allele length onto a
/// unique top scorer when the group involves a long insertion.
///
/// Long insertions supported by slightly divergent reads show up as several
/// same-length alleles at one position; when one clearly wins, the others are
/// treated as miscalled copies of it and half their scores transfer to the
/// winner. Groups with tied top scores are left untouched.
fn collapse_concurrent_insertions(
    candidates: &mut [CandidateIndel],
    blacklisted: &mut [bool],
    metrics: &mut PruneMetrics,
) {
    let mut groups: AHashMap<(i64, usize), Vec<usize>> = AHashMap::new();
    for (index, candidate) in candidates.iter().enumerate() {
        if !candidate.in_multi {
            groups
                .entry((candidate.pos(), candidate.descriptor.alt_allele.len()))
                .or_default()
                .push(index);
        }
    }
    let group_keys = groups
        .iter()
        .filter(|(_, members)| members.len() > 2)
        .map(|(key, _)| *key)
        .sorted_unstable();

    for key in group_keys {
        let Some(members) = groups.get(&key) else {
            continue;
        };
        let long_insertion = members.iter().any(|&index| {
            candidates[index].category == IndelCategory::Insertion
                && candidates[index].length >= CONCURRENT_MIN_LENGTH
        });
        if !long_insertion {
            continue;
        }
        let top_score = members.iter().map(|&index| candidates[index].score).max().unwrap_or(0);
        let winners: Vec<usize> = members
            .iter()
            .copied()
            .filter(|&index| candidates[index].score == top_score)
            .collect();
        if winners.len() != 1 {
            continue;
        }
        let winner_index = winners[0];

        let mut discarded_sum: u64 = 0;
        for &index in members {
            if index != winner_index {
                blacklisted[index] = true;
                discarded_sum += u64::from(candidates[index].score);
                metrics.concurrent_insertions_collapsed += 1;
            }
        }
        let boost = (discarded_sum / 2).min(u64::from(u32::MAX)) as u32;
        let boosted = candidates[winner_index].score.saturating_add(boost);
        candidates[winner_index] = candidates[winner_index].with_score(boosted);
        debug!(
            "Collapsed {} concurrent insertions at position {} into {}",
            members.len() - 1,
            key.0,
            candidates[winner_index].descriptor
        );
    }
}

/// Discards much weaker neighbors of candidates that dominate their local
/// evidence mass.
///
/// A candidate dominates when its score exceeds the summed scores of all
/// distinct candidates within `bin_size` bases. Neighbors at less than half
/// the dominant score are discarded, sparing the same allele at a shifted
/// position and compound partners that keep at least 30% of the dominant
/// score. Sums and domination run over the boost-applied working list,
/// collapse discards included; removal happens only through the shared
/// blacklist at the end.
fn prune_by_proximity(
    candidates: &[CandidateIndel],
    bin_size: i64,
    blacklisted: &mut [bool],
    metrics: &mut PruneMetrics,
) {
    let mut marks = vec![false; candidates.len()];
    for (index, candidate) in candidates.iter().enumerate() {
        let nearby: Vec<usize> = candidates
            .iter()
            .enumerate()
            .filter(|&(other_index, other)| {
                other_index != index
                    && !(other.pos() == candidate.pos() && same_alleles(candidate, other))
                    && (other.pos() - candidate.pos()).abs() <= bin_size
            })
            .map(|(other_index, _)| other_index)
            .collect();
        if nearby.is_empty() {
            continue;
        }
        let nearby_sum: u64 = nearby.iter().map(|&i| u64::from(candidates[i].score)).sum();
        if u64::from(candidate.score) <= nearby_sum {
            continue;
        }

        for &other_index in &nearby {
            let other = &candidates[other_index];
            if 2 * u64::from(other.score) >= u64::from(candidate.score) {
                continue;
            }
            if same_alleles(candidate, other) {
                continue;
            }
            if compound_partners(candidate, other)
                && 10 * u64::from(other.score) >= 3 * u64::from(candidate.score)
            {
                continue;
            }
            if !marks[other_index] && !blacklisted[other_index] {
                marks[other_index] = true;
                metrics.proximity_pruned += 1;
                debug!(
                    "Pruning {} overshadowed by dominant neighbor {}",
                    other.descriptor, candidate.descriptor
                );
            }
        }
    }
    for (index, marked) in marks.iter().enumerate() {
        if *marked {
            blacklisted[index] = true;
        }
    }
}

fn same_alleles(a: &CandidateIndel, b: &CandidateIndel) -> bool {
    a.descriptor.ref_allele == b.descriptor.ref_allele
        && a.descriptor.alt_allele == b.descriptor.alt_allele
}

fn compound_partners(a: &CandidateIndel, b: &CandidateIndel) -> bool {
    a.other_indel.as_ref().is_some_and(|partner| *partner == b.descriptor)
        || b.other_indel.as_ref().is_some_and(|partner| *partner == a.descriptor)
}

//! Integration tests for fgindel.
//!
//! Run with: `cargo test --test consolidation`
//!
//! These tests exercise whole stages together and check the structural
//! guarantees the pipeline makes: merging is independent of how the evidence
//! was sharded, raising thresholds never accepts more candidates, and rescue
//! only ever widens the accepted set.

use std::collections::HashSet;

use fgindel::evidence::{merge_evidence_tables, EvidenceCounts, EvidenceTable};
use fgindel::filter::{filter_candidates, FilterOutput, FilterThresholds};
use fgindel::pipeline::{consolidate_chromosome, ConsolidateOptions};
use fgindel::reference::ReferenceWindow;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const BASES: [char; 4] = ['A', 'C', 'G', 'T'];

fn random_allele(rng: &mut StdRng, len: usize) -> String {
    (0..len).map(|_| BASES[rng.gen_range(0..BASES.len())]).collect()
}

fn random_key(rng: &mut StdRng) -> String {
    let chrom = if rng.gen_bool(0.8) { "chr1" } else { "chr2" };
    let pos = rng.gen_range(1..=400);
    let anchor = BASES[rng.gen_range(0..BASES.len())];
    let tail_len = rng.gen_range(1..=6);
    let tail = random_allele(rng, tail_len);
    if rng.gen_bool(0.5) {
        format!("{chrom}:{pos} {anchor}>{anchor}{tail}")
    } else {
        format!("{chrom}:{pos} {anchor}{tail}>{anchor}")
    }
}

fn random_counts(rng: &mut StdRng) -> EvidenceCounts {
    let observations = rng.gen_range(1..=20);
    let forward_count = rng.gen_range(0..=observations);
    EvidenceCounts {
        observations,
        left_anchor_sum: rng.gen_range(0..=50 * observations),
        right_anchor_sum: rng.gen_range(0..=50 * observations),
        mess_sum: rng.gen_range(0..=4 * observations),
        quality_sum: rng.gen_range(20 * observations..=40 * observations),
        forward_count,
        reverse_count: observations - forward_count,
        stitched_count: rng.gen_range(0..=observations),
        reputable_count: rng.gen_range(0..=observations),
    }
}

fn random_table(rng: &mut StdRng, entries: usize) -> EvidenceTable {
    let mut table = EvidenceTable::new();
    for _ in 0..entries {
        let key = random_key(rng);
        let counts = random_counts(rng);
        table.entry(key).or_default().merge_from(&counts);
    }
    table
}

/// Canonical ordered view of a table for equality checks.
fn snapshot(table: &EvidenceTable) -> Vec<(String, EvidenceCounts)> {
    let mut entries: Vec<(String, EvidenceCounts)> =
        table.iter().map(|(key, counts)| (key.clone(), *counts)).collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    entries
}

/// Splits counters into two pieces that merge back to the original.
fn split_counts(rng: &mut StdRng, counts: &EvidenceCounts) -> (EvidenceCounts, EvidenceCounts) {
    let mut first = EvidenceCounts::default();
    let mut second = *counts;
    for (taken, rest) in [
        (&mut first.observations, &mut second.observations),
        (&mut first.left_anchor_sum, &mut second.left_anchor_sum),
        (&mut first.right_anchor_sum, &mut second.right_anchor_sum),
        (&mut first.mess_sum, &mut second.mess_sum),
        (&mut first.quality_sum, &mut second.quality_sum),
        (&mut first.forward_count, &mut second.forward_count),
        (&mut first.reverse_count, &mut second.reverse_count),
        (&mut first.stitched_count, &mut second.stitched_count),
        (&mut first.reputable_count, &mut second.reputable_count),
    ] {
        *taken = rng.gen_range(0..=*rest);
        *rest -= *taken;
    }
    (first, second)
}

fn strong_counts(observations: u64) -> EvidenceCounts {
    EvidenceCounts {
        observations,
        left_anchor_sum: 50 * observations,
        right_anchor_sum: 50 * observations,
        mess_sum: 0,
        quality_sum: 35 * observations,
        forward_count: observations / 2,
        reverse_count: observations - observations / 2,
        stitched_count: 0,
        reputable_count: observations,
    }
}

fn identity_set(output: FilterOutput) -> HashSet<String> {
    output
        .candidates_by_chrom
        .values()
        .flat_map(|candidates| {
            candidates.iter().map(|candidate| candidate.descriptor.to_string())
        })
        .collect()
}

#[test]
fn test_merge_is_independent_of_sharding() {
    let mut rng = StdRng::seed_from_u64(17);
    let master = random_table(&mut rng, 200);
    let expected = snapshot(&master);

    for shard_count in [1usize, 2, 5, 9] {
        let mut shards = vec![EvidenceTable::new(); shard_count];
        for (key, counts) in &master {
            if shard_count > 1 && rng.gen_bool(0.3) {
                // Same key contributed by two shards.
                let (first, second) = split_counts(&mut rng, counts);
                let slot = rng.gen_range(0..shard_count);
                let other = rng.gen_range(0..shard_count);
                shards[slot].entry(key.clone()).or_default().merge_from(&first);
                shards[other].entry(key.clone()).or_default().merge_from(&second);
            } else {
                let slot = rng.gen_range(0..shard_count);
                shards[slot].entry(key.clone()).or_default().merge_from(counts);
            }
        }

        let merged = merge_evidence_tables(shards.clone());
        assert_eq!(snapshot(&merged), expected, "{shard_count} shards changed the merge");

        shards.reverse();
        let reversed = merge_evidence_tables(shards);
        assert_eq!(snapshot(&reversed), expected, "shard order changed the merge");
    }
}

#[test]
fn test_acceptance_shrinks_as_thresholds_rise() {
    let mut rng = StdRng::seed_from_u64(29);
    let table = random_table(&mut rng, 300);

    let mut previous = u64::MAX;
    for found_threshold in 0..12 {
        let thresholds = FilterThresholds {
            found_threshold,
            anchor_threshold: 5.0,
            ..FilterThresholds::default()
        };
        let accepted = filter_candidates(&table, &thresholds, false).metrics.accepted();
        assert!(
            accepted <= previous,
            "raising found threshold to {found_threshold} accepted more candidates"
        );
        previous = accepted;
    }

    let mut previous = u64::MAX;
    for step in 0..10 {
        let thresholds = FilterThresholds {
            anchor_threshold: 5.0 * f64::from(step),
            ..FilterThresholds::default()
        };
        let accepted = filter_candidates(&table, &thresholds, false).metrics.accepted();
        assert!(accepted <= previous, "raising anchor threshold accepted more candidates");
        previous = accepted;
    }
}

#[test]
fn test_rescue_only_widens_the_accepted_set() {
    let mut rng = StdRng::seed_from_u64(41);
    let thresholds = FilterThresholds {
        found_threshold: 4,
        anchor_threshold: 15.0,
        strict_found_threshold: 4,
        strict_anchor_threshold: 15.0,
        max_mess: 3.0,
    };

    for round in 0..5 {
        let table = random_table(&mut rng, 250);
        let strict = identity_set(filter_candidates(&table, &thresholds, false));
        let with_rescue = identity_set(filter_candidates(&table, &thresholds, true));
        assert!(
            strict.is_subset(&with_rescue),
            "round {round}: rescue dropped candidates accepted without it"
        );
    }
}

#[test]
fn test_end_to_end_chromosome_consolidation() {
    // chr1 bases 1..=28, with a 6-base A homopolymer at positions 5-10.
    let window = ReferenceWindow::new(0, b"GGGGAAAAAACCCCGGTTACGTACGTAC".to_vec());

    let mut shard_one = EvidenceTable::new();
    shard_one.insert("chr1:16 G>GTT".to_string(), strong_counts(6));
    shard_one.insert(
        "chr1:7 A>AA".to_string(),
        EvidenceCounts {
            observations: 1,
            left_anchor_sum: 30,
            right_anchor_sum: 30,
            mess_sum: 0,
            quality_sum: 35,
            forward_count: 1,
            ..Default::default()
        },
    );
    let mut shard_two = EvidenceTable::new();
    shard_two.insert("chr1:16 G>GTT".to_string(), strong_counts(4));

    let thresholds = FilterThresholds {
        found_threshold: 1,
        anchor_threshold: 5.0,
        ..FilterThresholds::default()
    };
    let (survivors, metrics) = consolidate_chromosome(
        vec![shard_one, shard_two],
        "chr1",
        &window,
        &thresholds,
        &ConsolidateOptions::default(),
    );

    assert_eq!(metrics.filter.total_keys, 2);
    assert_eq!(metrics.filter.kept, 2);
    assert_eq!(metrics.contextualized, 2);
    assert_eq!(metrics.dedup.input_candidates, 2);

    // The single-read insertion inside the homopolymer is dwarfed by the
    // median support and dropped as untrustworthy.
    assert_eq!(metrics.dedup.weak_repeat_removed, 1);
    assert_eq!(survivors.len(), 1);

    let survivor = &survivors[0];
    assert_eq!(survivor.pos(), 16);
    assert_eq!(survivor.descriptor.alt_allele, "GTT");
    assert_eq!(survivor.score, 1213);
    assert_eq!(survivor.observations, 10);
    assert!(survivor.is_repeat, "a TT insertion is a unit-T tandem repeat");
    assert_eq!(survivor.repeat_unit, "T");
    assert!(!survivor.is_duplication);
    assert!(!survivor.untrustworthy_in_repeat);
}

#[test]
fn test_malformed_evidence_is_tolerated() -> anyhow::Result<()> {
    let window = ReferenceWindow::new(0, b"ACGT".repeat(10));
    let thresholds = FilterThresholds::default();
    thresholds.validate()?;

    let mut table = EvidenceTable::new();
    table.insert("chr1:12 T>TG".to_string(), strong_counts(8));
    table.insert("garbage".to_string(), strong_counts(8));
    table.insert("chr1:1 A>AT|chr1:2 C>CA|chr1:3 G>GT".to_string(), strong_counts(8));
    // Alleles are ACGTN only; multi-byte text is malformed, not a crash.
    table.insert("chr1:5 A>éT".to_string(), strong_counts(8));

    let (survivors, metrics) = consolidate_chromosome(
        vec![table],
        "chr1",
        &window,
        &thresholds,
        &ConsolidateOptions::default(),
    );

    assert_eq!(metrics.filter.malformed_keys, 3);
    assert_eq!(survivors.len(), 1);
    assert_eq!(survivors[0].pos(), 12);
    Ok(())
}

#[test]
fn test_consolidate_without_evidence() {
    let window = ReferenceWindow::new(0, b"ACGTACGT".to_vec());
    let (survivors, metrics) = consolidate_chromosome(
        Vec::<EvidenceTable>::new(),
        "chr1",
        &window,
        &FilterThresholds::default(),
        &ConsolidateOptions::default(),
    );
    assert!(survivors.is_empty());
    assert_eq!(metrics.filter.total_keys, 0);
    assert_eq!(metrics.dedup.surviving, 0);
}

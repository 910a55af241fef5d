//! Reference contextualization of candidate indels.
//!
//! A candidate arrives with the alleles its read evidence declared; this module
//! re-reads them from the actual reference window, normalizes the pair, and
//! attaches the repeat/duplication/homopolymer metadata that deduplication and
//! downstream trust decisions rely on.
//!
//! Contextualization is deliberately lenient: evidence is noisy by
//! construction, so a candidate whose declared alleles cannot be reconciled
//! with the window (out of bounds, degenerate normalization, length
//! contradiction) is dropped by returning `None` rather than raising an error.
//! Candidates arriving with a zero score are dropped the same way.

use crate::indel::{CandidateIndel, ContextualizedIndel, IndelCategory, IndelDescriptor};
use crate::reference::ReferenceWindow;
use crate::repeats;

/// Homopolymer run length at which single-base indels become untrustworthy.
pub const MIN_HOMOPOLYMER_RUN: usize = 4;

/// Longest unit length tried by the tandem-run scan around the variant site.
pub const LONG_REPEAT_MAX_UNIT: usize = 6;

/// Tandem copies at which the nearby-run scan overrides repeat classification.
pub const LONG_REPEAT_MIN_COPIES: usize = 6;

/// Minimum flanking window size around the variant.
const FLANK_MIN: usize = 10;

/// Widened minimum suffix size used when the natural suffix is all repeat.
const WIDE_SUFFIX_MIN: usize = 100;

/// Resolves one candidate against a reference window.
///
/// The reference allele is read from the window at the candidate's position
/// (the declared reference allele supplies only its length), and the alternate
/// allele is rebuilt from it: anchored single-base references keep the declared
/// inserted tail, longer references collapse to a pure deletion. Returns `None`
/// when the candidate cannot be reconciled with the window.
#[must_use]
pub fn contextualize(
    candidate: &CandidateIndel,
    window: &ReferenceWindow,
) -> Option<ContextualizedIndel> {
    if candidate.score == 0 {
        return None;
    }
    let declared = &candidate.descriptor;
    if declared.ref_allele.is_empty() || declared.alt_allele.is_empty() {
        return None;
    }
    let anchor_index = window.index_of(declared.pos)?;
    let actual_ref_bases = window.fetch(declared.pos, declared.ref_allele.len())?;
    let actual_ref = String::from_utf8_lossy(actual_ref_bases).into_owned();

    let actual_alt = if actual_ref.len() == 1 {
        format!("{}{}", actual_ref, &declared.alt_allele[1..])
    } else {
        actual_ref[..1].to_string()
    };
    if actual_alt == actual_ref {
        return None;
    }

    let category = if actual_ref.len() > actual_alt.len() {
        IndelCategory::Deletion
    } else {
        IndelCategory::Insertion
    };
    let length = actual_ref.len().abs_diff(actual_alt.len());
    if category != candidate.category || length != candidate.length {
        return None;
    }

    let variant_bases: &[u8] = match category {
        IndelCategory::Insertion => &actual_alt.as_bytes()[1..],
        IndelCategory::Deletion => &actual_ref.as_bytes()[1..],
    };
    let bases = window.bases();
    // First base of the variant footprint, immediately after the anchor.
    let boundary = anchor_index + 1;

    let unit = repeats::smallest_repeat_unit(variant_bases);
    let mut is_repeat = unit.len() <= 2 && unit.len() < variant_bases.len();
    let mut repeat_unit: Vec<u8> = if is_repeat { unit.to_vec() } else { Vec::new() };

    let mut num_repeats_nearby = 0;
    if let Some((long_unit, copies)) =
        repeats::best_tandem_run(bases, boundary, LONG_REPEAT_MAX_UNIT)
    {
        num_repeats_nearby = copies;
        if copies >= LONG_REPEAT_MIN_COPIES {
            is_repeat = true;
            repeat_unit = long_unit.to_vec();
        }
    }

    let is_duplication = match boundary.checked_sub(variant_bases.len()) {
        Some(preceding_start) => &bases[preceding_start..boundary] == variant_bases,
        None => false,
    };

    let mut num_approx_dups_left = 0;
    let mut num_approx_dups_right = 0;
    if category == IndelCategory::Insertion && length > 3 {
        let tolerance = (length / 6).max(1);
        let mut at = boundary;
        while at + length <= bases.len()
            && repeats::hamming_distance(&bases[at..at + length], variant_bases) <= tolerance
        {
            num_approx_dups_right += 1;
            at += length;
        }
        let mut at = boundary;
        while at >= length
            && repeats::hamming_distance(&bases[at - length..at], variant_bases) <= tolerance
        {
            num_approx_dups_left += 1;
            at -= length;
        }
    }

    let other_indel =
        candidate.other_indel.as_ref().map(|partner| resolve_partner(partner, window));

    let untrustworthy_in_repeat = length == 1
        && (repeats::homopolymer_run_length(bases, anchor_index) >= MIN_HOMOPOLYMER_RUN
            || repeats::homopolymer_run_length(bases, boundary) >= MIN_HOMOPOLYMER_RUN);

    let flank = (3 * length).max(FLANK_MIN);
    let ref_prefix = window.slice_clamped(boundary as i64 - flank as i64, boundary as i64);
    let suffix_start = match category {
        IndelCategory::Insertion => boundary,
        IndelCategory::Deletion => boundary + length,
    };
    let mut ref_suffix =
        window.slice_clamped(suffix_start as i64, (suffix_start + flank) as i64).to_vec();

    let mut num_bases_in_suffix_before_unique = 0;
    if category == IndelCategory::Insertion {
        let chunk: &[u8] = if is_repeat { &repeat_unit } else { variant_bases };
        num_bases_in_suffix_before_unique = leading_chunk_bases(&ref_suffix, chunk);
        // A count that consumes the whole suffix says nothing about where the
        // repeat ends; recount against a wider window.
        if num_bases_in_suffix_before_unique >= ref_suffix.len().saturating_sub(1) {
            let widened = (3 * length).max(WIDE_SUFFIX_MIN);
            ref_suffix = window
                .slice_clamped(suffix_start as i64, (suffix_start + widened) as i64)
                .to_vec();
            num_bases_in_suffix_before_unique = leading_chunk_bases(&ref_suffix, chunk);
        }
    }

    let possible_partial =
        is_repeat && category == IndelCategory::Insertion && repeat_unit.len() >= 3;

    let descriptor =
        IndelDescriptor::new(declared.chrom.clone(), declared.pos, actual_ref, actual_alt);
    Some(ContextualizedIndel {
        descriptor,
        category,
        length,
        score: candidate.score,
        in_multi: candidate.in_multi,
        other_indel,
        observations: candidate.observations,
        from_softclip: candidate.from_softclip,
        hard_to_call: candidate.hard_to_call,
        is_repeat,
        repeat_unit: String::from_utf8_lossy(&repeat_unit).into_owned(),
        is_duplication,
        untrustworthy_in_repeat,
        ref_prefix: String::from_utf8_lossy(ref_prefix).into_owned(),
        ref_suffix: String::from_utf8_lossy(&ref_suffix).into_owned(),
        num_bases_in_suffix_before_unique,
        num_repeats_nearby,
        num_approx_dups_left,
        num_approx_dups_right,
        is_spiked: false,
        possible_partial,
    })
}

/// Re-resolves a compound partner's alleles against the same window.
///
/// A partner that falls outside the window keeps its declared alleles; losing
/// one side of a linked pair is worse than carrying an unnormalized partner.
fn resolve_partner(partner: &IndelDescriptor, window: &ReferenceWindow) -> IndelDescriptor {
    if partner.ref_allele.is_empty() || partner.alt_allele.is_empty() {
        return partner.clone();
    }
    let Some(actual_ref_bases) = window.fetch(partner.pos, partner.ref_allele.len()) else {
        return partner.clone();
    };
    let actual_ref = String::from_utf8_lossy(actual_ref_bases).into_owned();
    let actual_alt = if actual_ref.len() == 1 {
        format!("{}{}", actual_ref, &partner.alt_allele[1..])
    } else {
        actual_ref[..1].to_string()
    };
    IndelDescriptor::new(partner.chrom.clone(), partner.pos, actual_ref, actual_alt)
}

/// Number of leading bases of `suffix` consumed by whole copies of `chunk`.
fn leading_chunk_bases(suffix: &[u8], chunk: &[u8]) -> usize {
    if chunk.is_empty() {
        return 0;
    }
    let mut consumed = 0;
    while suffix.len() >= consumed + chunk.len()
        && &suffix[consumed..consumed + chunk.len()] == chunk
    {
        consumed += chunk.len();
    }
    consumed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(text: &str, score: u32) -> CandidateIndel {
        let mut candidate = CandidateIndel::new(IndelDescriptor::parse(text).unwrap());
        candidate.score = score;
        candidate.observations = 7;
        candidate
    }

    //                  0         1
    //                  0123456789012345
    const PLAIN: &[u8] = b"GATCGCTAAGTCCTGA";

    #[test]
    fn test_insertion_normalization() {
        let window = ReferenceWindow::new(0, PLAIN.to_vec());
        let indel = contextualize(&candidate("chr1:4 C>CAG", 50), &window).unwrap();

        assert_eq!(indel.descriptor, IndelDescriptor::new("chr1", 4, "C", "CAG"));
        assert_eq!(indel.category, IndelCategory::Insertion);
        assert_eq!(indel.length, 2);
        assert_eq!(indel.score, 50);
        assert_eq!(indel.observations, 7);
        assert!(!indel.is_repeat);
        assert!(!indel.is_duplication);
        assert!(!indel.untrustworthy_in_repeat);
        assert_eq!(indel.num_repeats_nearby, 1);
        assert_eq!(indel.ref_prefix, "GATC");
        assert_eq!(indel.ref_suffix, "GCTAAGTCCT");
        assert_eq!(indel.num_bases_in_suffix_before_unique, 0);
        assert!(!indel.possible_partial);
        assert!(!indel.is_spiked);
    }

    #[test]
    fn test_deletion_normalization() {
        let window = ReferenceWindow::new(0, PLAIN.to_vec());
        let indel = contextualize(&candidate("chr1:4 CGC>C", 50), &window).unwrap();

        assert_eq!(indel.descriptor, IndelDescriptor::new("chr1", 4, "CGC", "C"));
        assert_eq!(indel.category, IndelCategory::Deletion);
        assert_eq!(indel.length, 2);
        // Suffix starts after the deleted bases.
        assert_eq!(indel.ref_suffix, "TAAGTCCTGA");
        assert_eq!(indel.ref_prefix, "GATC");
        assert_eq!(indel.num_bases_in_suffix_before_unique, 0);
    }

    #[test]
    fn test_origin_flags_carry_through() {
        let window = ReferenceWindow::new(0, PLAIN.to_vec());
        let plain = contextualize(&candidate("chr1:4 C>CAG", 50), &window).unwrap();
        assert!(!plain.from_softclip);
        assert!(!plain.hard_to_call);

        let marked = candidate("chr1:4 C>CAG", 50)
            .with_from_softclip(true)
            .with_hard_to_call(true);
        let indel = contextualize(&marked, &window).unwrap();
        assert!(indel.from_softclip);
        assert!(indel.hard_to_call);
    }

    #[test]
    fn test_alleles_come_from_the_window() {
        // The evidence declared TT>T but the window holds CG at that locus;
        // the normalized alleles reflect the window.
        let window = ReferenceWindow::new(0, PLAIN.to_vec());
        let indel = contextualize(&candidate("chr1:4 TT>T", 50), &window).unwrap();
        assert_eq!(indel.descriptor.ref_allele, "CG");
        assert_eq!(indel.descriptor.alt_allele, "C");
    }

    #[test]
    fn test_rejects_out_of_window() {
        let window = ReferenceWindow::new(0, PLAIN.to_vec());
        assert!(contextualize(&candidate("chr1:30 A>AT", 50), &window).is_none());
        // Anchor in range but the reference allele runs past the end.
        assert!(contextualize(&candidate("chr1:16 AC>A", 50), &window).is_none());
    }

    #[test]
    fn test_rejects_degenerate_normalization() {
        let window = ReferenceWindow::new(0, PLAIN.to_vec());
        assert!(contextualize(&candidate("chr1:4 C>G", 50), &window).is_none());
    }

    #[test]
    fn test_rejects_length_contradiction() {
        // Declared as a 3:2 pair: normalization collapses the alternate to one
        // base, which contradicts the declared length of 1.
        let window = ReferenceWindow::new(0, PLAIN.to_vec());
        assert!(contextualize(&candidate("chr1:4 CGC>CG", 50), &window).is_none());
    }

    #[test]
    fn test_rejects_zero_score() {
        let window = ReferenceWindow::new(0, PLAIN.to_vec());
        assert!(contextualize(&candidate("chr1:4 C>CAG", 0), &window).is_none());
    }

    #[test]
    fn test_window_offset_applies() {
        let window = ReferenceWindow::new(1000, PLAIN.to_vec());
        let indel = contextualize(&candidate("chr1:1004 C>CAG", 50), &window).unwrap();
        assert_eq!(indel.descriptor.pos, 1004);
        assert_eq!(indel.descriptor.ref_allele, "C");
        assert!(contextualize(&candidate("chr1:4 C>CAG", 50), &window).is_none());
    }

    #[test]
    fn test_homopolymer_marks_single_base_untrustworthy() {
        //                                     0123456789
        let window = ReferenceWindow::new(0, b"AACGTTTTTCAGCATGCAGT".to_vec());
        let insertion = contextualize(&candidate("chr1:4 G>GT", 50), &window).unwrap();
        assert!(insertion.untrustworthy_in_repeat);
        assert!(!insertion.is_repeat);
        assert_eq!(insertion.num_repeats_nearby, 5);

        let deletion = contextualize(&candidate("chr1:4 GT>G", 50), &window).unwrap();
        assert!(deletion.untrustworthy_in_repeat);

        // Two-base indels are exempt regardless of context.
        let longer = contextualize(&candidate("chr1:4 G>GTT", 50), &window).unwrap();
        assert!(!longer.untrustworthy_in_repeat);
    }

    #[test]
    fn test_short_repeat_classification() {
        let window = ReferenceWindow::new(0, PLAIN.to_vec());
        let indel = contextualize(&candidate("chr1:4 C>CATAT", 50), &window).unwrap();
        assert!(indel.is_repeat);
        assert_eq!(indel.repeat_unit, "AT");
        // Unit of 2 is too short to flag a partial long repeat.
        assert!(!indel.possible_partial);
    }

    #[test]
    fn test_long_tandem_run_overrides_classification() {
        //                                     0         1
        //                                     0123456789012345
        let window = ReferenceWindow::new(0, b"GGATATATATATATCC".to_vec());
        let indel = contextualize(&candidate("chr1:14 T>TAT", 50), &window).unwrap();
        // "AT" alone is a single copy, but six copies sit left of the site.
        assert!(indel.is_repeat);
        assert_eq!(indel.repeat_unit, "AT");
        assert_eq!(indel.num_repeats_nearby, 6);
        assert!(!indel.possible_partial);
    }

    #[test]
    fn test_possible_partial_long_unit() {
        let window = ReferenceWindow::new(0, b"TTCAGCAGCAGCAGCAGCAGGT".to_vec());
        let indel = contextualize(&candidate("chr1:2 T>TCAG", 50), &window).unwrap();
        assert!(indel.is_repeat);
        assert_eq!(indel.repeat_unit, "CAG");
        assert_eq!(indel.num_repeats_nearby, 6);
        assert!(indel.possible_partial);
    }

    #[test]
    fn test_insertion_duplication() {
        let window = ReferenceWindow::new(0, PLAIN.to_vec());
        let indel = contextualize(&candidate("chr1:8 A>AGCTA", 60), &window).unwrap();
        // GCTA duplicates the four reference bases ending at the anchor.
        assert!(indel.is_duplication);
        assert_eq!(indel.num_approx_dups_left, 1);
        assert_eq!(indel.num_approx_dups_right, 0);
    }

    #[test]
    fn test_deletion_duplication() {
        //                                     0123456789
        let window = ReferenceWindow::new(0, b"TTCAGAGCCA".to_vec());
        let indel = contextualize(&candidate("chr1:5 GAG>G", 50), &window).unwrap();
        assert!(indel.is_duplication);
        assert_eq!(indel.descriptor.ref_allele, "GAG");
        assert_eq!(indel.ref_suffix, "CCA");
        assert_eq!(indel.num_bases_in_suffix_before_unique, 0);
        assert_eq!(indel.num_repeats_nearby, 2);
        assert!(!indel.is_repeat);
    }

    #[test]
    fn test_approximate_duplication_scan() {
        //                                     0         1
        //                                     0123456789012345
        let window = ReferenceWindow::new(0, b"TAACGAACGTGGGGCC".to_vec());
        let indel = contextualize(&candidate("chr1:2 A>AACGT", 50), &window).unwrap();
        // ACGA (one mismatch) then ACGT (exact) follow the insertion point.
        assert_eq!(indel.num_approx_dups_right, 2);
        assert_eq!(indel.num_approx_dups_left, 0);
        assert!(!indel.is_repeat);
        assert_eq!(indel.num_bases_in_suffix_before_unique, 0);
    }

    #[test]
    fn test_suffix_widens_when_all_repeat() {
        // CA repeats past the natural 10-base suffix window.
        let mut bases = b"TTG".to_vec();
        bases.extend_from_slice(&b"CA".repeat(8));
        bases.extend_from_slice(b"GGTT");
        let window = ReferenceWindow::new(0, bases);

        let indel = contextualize(&candidate("chr1:3 G>GCA", 50), &window).unwrap();
        assert!(indel.is_repeat);
        assert_eq!(indel.repeat_unit, "CA");
        assert_eq!(indel.num_repeats_nearby, 8);
        assert_eq!(indel.ref_suffix, "CACACACACACACACAGGTT");
        assert_eq!(indel.num_bases_in_suffix_before_unique, 16);
        assert_eq!(indel.ref_prefix, "TTG");
    }

    #[test]
    fn test_partner_re_resolution() {
        let window = ReferenceWindow::new(0, PLAIN.to_vec());
        let in_window = candidate("chr1:4 C>CAG", 50)
            .with_partner(IndelDescriptor::parse("chr1:15 TT>T").unwrap());
        let indel = contextualize(&in_window, &window).unwrap();
        assert!(indel.in_multi);
        // The partner's alleles are re-read from the window: GA at position 15.
        assert_eq!(indel.other_indel.unwrap(), IndelDescriptor::new("chr1", 15, "GA", "G"));

        let out_of_window = candidate("chr1:4 C>CAG", 50)
            .with_partner(IndelDescriptor::parse("chr1:99 TT>T").unwrap());
        let indel = contextualize(&out_of_window, &window).unwrap();
        assert_eq!(indel.other_indel.unwrap(), IndelDescriptor::parse("chr1:99 TT>T").unwrap());
    }

    #[test]
    fn test_insertion_at_window_end() {
        let window = ReferenceWindow::new(0, b"GATC".to_vec());
        let indel = contextualize(&candidate("chr1:4 C>CGG", 50), &window).unwrap();
        assert_eq!(indel.ref_suffix, "");
        assert_eq!(indel.num_bases_in_suffix_before_unique, 0);
        assert_eq!(indel.ref_prefix, "GATC");
    }
}

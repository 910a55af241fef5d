//! Core indel descriptor and candidate types.
//!
//! An [`IndelDescriptor`] names one insertion or deletion by locus and allele pair.
//! [`CandidateIndel`] is the scored, pre-contextualization record produced by the
//! candidate filter; [`ContextualizedIndel`] is its reference-resolved counterpart
//! carrying repeat/duplication metadata. [`IndelIdentity`] is the value type used
//! to decide whether two contextualized candidates describe the same event.

use std::fmt;

use crate::errors::{FgindelError, Result};

/// The kind of length-changing variant a candidate describes.
///
/// Derived from the allele pair: a candidate whose reference allele is longer than
/// its alternate allele is a deletion, anything else is an insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndelCategory {
    /// Bases present in the read but absent from the reference
    Insertion,
    /// Bases present in the reference but absent from the read
    Deletion,
}

impl fmt::Display for IndelCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insertion => write!(f, "insertion"),
            Self::Deletion => write!(f, "deletion"),
        }
    }
}

/// One indel described by locus and allele pair.
///
/// The position is the 1-based coordinate of the anchor base: both alleles start
/// with the reference base at `pos` and the inserted/deleted bases follow it.
/// The canonical string form is `chrom:pos ref>alt`, as produced by the evidence
/// collectors upstream.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndelDescriptor {
    /// Chromosome/contig name
    pub chrom: String,
    /// 1-based position of the anchor base
    pub pos: i64,
    /// Reference allele, anchor base first
    pub ref_allele: String,
    /// Alternate allele, anchor base first
    pub alt_allele: String,
}

impl IndelDescriptor {
    /// Creates a new descriptor. Alleles are normalized to uppercase.
    #[must_use]
    pub fn new(
        chrom: impl Into<String>,
        pos: i64,
        ref_allele: impl Into<String>,
        alt_allele: impl Into<String>,
    ) -> Self {
        Self {
            chrom: chrom.into(),
            pos,
            ref_allele: ref_allele.into().to_ascii_uppercase(),
            alt_allele: alt_allele.into().to_ascii_uppercase(),
        }
    }

    /// Insertion or deletion, from the allele length comparison.
    #[must_use]
    pub fn category(&self) -> IndelCategory {
        if self.ref_allele.len() > self.alt_allele.len() {
            IndelCategory::Deletion
        } else {
            IndelCategory::Insertion
        }
    }

    /// Number of inserted or deleted bases.
    #[must_use]
    pub fn length(&self) -> usize {
        self.ref_allele.len().abs_diff(self.alt_allele.len())
    }

    /// Parses the canonical `chrom:pos ref>alt` form.
    ///
    /// The chromosome name may itself contain `:` (e.g. HLA contigs), so the
    /// position is taken from the last `:`-separated field before the space.
    /// Alleles are restricted to `ACGTN` in either case; anything else is
    /// rejected as malformed.
    pub fn parse(text: &str) -> Result<Self> {
        let malformed = |reason: &str| FgindelError::MalformedEvidenceKey {
            key: text.to_string(),
            reason: reason.to_string(),
        };

        let (locus, alleles) =
            text.split_once(' ').ok_or_else(|| malformed("expected 'chrom:pos ref>alt'"))?;
        let (chrom, pos_text) =
            locus.rsplit_once(':').ok_or_else(|| malformed("locus missing ':'"))?;
        let pos: i64 =
            pos_text.parse().map_err(|_| malformed("position is not a valid integer"))?;
        let (ref_allele, alt_allele) =
            alleles.split_once('>').ok_or_else(|| malformed("alleles missing '>'"))?;
        if chrom.is_empty() || ref_allele.is_empty() || alt_allele.is_empty() {
            return Err(malformed("empty chromosome or allele"));
        }
        if !is_dna(ref_allele) || !is_dna(alt_allele) {
            return Err(malformed("allele contains a non-DNA base"));
        }
        if pos < 1 {
            return Err(malformed("position must be >= 1"));
        }
        Ok(Self::new(chrom, pos, ref_allele, alt_allele))
    }
}

/// True when every base is A, C, G, T, or N, in either case.
fn is_dna(allele: &str) -> bool {
    allele
        .bytes()
        .all(|base| matches!(base.to_ascii_uppercase(), b'A' | b'C' | b'G' | b'T' | b'N'))
}

impl fmt::Display for IndelDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} {}>{}", self.chrom, self.pos, self.ref_allele, self.alt_allele)
    }
}

/// A scored candidate indel prior to reference contextualization.
///
/// Created by the candidate filter from one evidence-table entry, or by the
/// pruner as a score-adjusted copy. Consumed read-only by the contextualizer.
#[derive(Debug, Clone)]
pub struct CandidateIndel {
    /// Locus and declared allele pair
    pub descriptor: IndelDescriptor,
    /// Insertion or deletion
    pub category: IndelCategory,
    /// Number of inserted or deleted bases
    pub length: usize,
    /// Evidence score from the candidate filter
    pub score: u32,
    /// True when this candidate came from a compound (two-indel) observation
    pub in_multi: bool,
    /// The compound partner, when `in_multi` is set
    pub other_indel: Option<IndelDescriptor>,
    /// Number of supporting read observations
    pub observations: u64,
    /// True when the candidate was derived from softclipped sequence
    pub from_softclip: bool,
    /// True when the surrounding sequence makes the call inherently difficult
    pub hard_to_call: bool,
}

impl CandidateIndel {
    /// Creates a candidate with no score or evidence attached.
    #[must_use]
    pub fn new(descriptor: IndelDescriptor) -> Self {
        let category = descriptor.category();
        let length = descriptor.length();
        Self {
            descriptor,
            category,
            length,
            score: 0,
            in_multi: false,
            other_indel: None,
            observations: 0,
            from_softclip: false,
            hard_to_call: false,
        }
    }

    /// Returns a copy of this candidate with the given score.
    #[must_use]
    pub fn with_score(&self, score: u32) -> Self {
        let mut copy = self.clone();
        copy.score = score;
        copy
    }

    #[must_use]
    pub fn with_observations(mut self, observations: u64) -> Self {
        self.observations = observations;
        self
    }

    #[must_use]
    pub fn with_partner(mut self, partner: IndelDescriptor) -> Self {
        self.in_multi = true;
        self.other_indel = Some(partner);
        self
    }

    #[must_use]
    pub fn with_from_softclip(mut self, from_softclip: bool) -> Self {
        self.from_softclip = from_softclip;
        self
    }

    #[must_use]
    pub fn with_hard_to_call(mut self, hard_to_call: bool) -> Self {
        self.hard_to_call = hard_to_call;
        self
    }

    /// 1-based anchor position.
    #[must_use]
    pub fn pos(&self) -> i64 {
        self.descriptor.pos
    }
}

/// Identity of a contextualized indel for deduplication.
///
/// Two contextualized candidates with equal identity describe the same event
/// regardless of score, repeat metadata, or provenance. Per-identity aggregation
/// lives in side maps keyed by this type, never on the candidates themselves.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndelIdentity {
    /// Chromosome/contig name
    pub chrom: String,
    /// 1-based anchor position
    pub pos: i64,
    /// Normalized reference allele
    pub ref_allele: String,
    /// Normalized alternate allele
    pub alt_allele: String,
    /// Insertion or deletion
    pub category: IndelCategory,
}

/// A candidate indel resolved against the actual reference sequence.
///
/// Alleles here are re-read from the reference window, so they reflect what the
/// genome really contains at the locus rather than what the evidence declared.
/// Immutable after creation except for `score`, which collapsing may boost.
#[derive(Debug, Clone)]
pub struct ContextualizedIndel {
    /// Locus and normalized allele pair
    pub descriptor: IndelDescriptor,
    /// Insertion or deletion (re-derived from the normalized alleles)
    pub category: IndelCategory,
    /// Number of inserted or deleted bases
    pub length: usize,
    /// Evidence score carried over from the candidate
    pub score: u32,
    /// True when this candidate came from a compound observation
    pub in_multi: bool,
    /// The compound partner with alleles re-resolved against the same window
    pub other_indel: Option<IndelDescriptor>,
    /// Number of supporting read observations
    pub observations: u64,
    /// True when the candidate was derived from softclipped sequence
    pub from_softclip: bool,
    /// True when the surrounding sequence makes the call inherently difficult
    pub hard_to_call: bool,
    /// True when the variant bases form a short tandem repeat
    pub is_repeat: bool,
    /// The repeat unit when `is_repeat` is set, empty otherwise
    pub repeat_unit: String,
    /// True when the variant bases duplicate the reference immediately before them
    pub is_duplication: bool,
    /// True for single-base variants inside a homopolymer run
    pub untrustworthy_in_repeat: bool,
    /// Reference bases immediately before the variant
    pub ref_prefix: String,
    /// Reference bases immediately after the variant
    pub ref_suffix: String,
    /// Bases at the start of `ref_suffix` that repeat the variant unit
    pub num_bases_in_suffix_before_unique: usize,
    /// Tandem copies of the best nearby repeat unit around the variant site
    pub num_repeats_nearby: usize,
    /// Approximate duplications of the inserted bases to the left
    pub num_approx_dups_left: usize,
    /// Approximate duplications of the inserted bases to the right
    pub num_approx_dups_right: usize,
    /// Synthetic/protected candidate, exempt from removal during collapsing
    pub is_spiked: bool,
    /// Insertion of a partial long repeat unit, may be a truncated observation
    pub possible_partial: bool,
}

impl ContextualizedIndel {
    /// The identity tuple used for deduplication.
    #[must_use]
    pub fn identity(&self) -> IndelIdentity {
        IndelIdentity {
            chrom: self.descriptor.chrom.clone(),
            pos: self.descriptor.pos,
            ref_allele: self.descriptor.ref_allele.clone(),
            alt_allele: self.descriptor.alt_allele.clone(),
            category: self.category,
        }
    }

    /// Returns a copy of this candidate with the given score.
    #[must_use]
    pub fn with_score(&self, score: u32) -> Self {
        let mut copy = self.clone();
        copy.score = score;
        copy
    }

    #[must_use]
    pub fn with_spiked(mut self, is_spiked: bool) -> Self {
        self.is_spiked = is_spiked;
        self
    }

    /// 1-based anchor position.
    #[must_use]
    pub fn pos(&self) -> i64 {
        self.descriptor.pos
    }
}

//! Evidence counters and the shard merger.
//!
//! Upstream read processors emit one [`EvidenceCounts`] vector per evidence key,
//! typically one table per shard or thread. [`merge_evidence_tables`] combines any
//! number of partial tables by element-wise summation; the operation is commutative
//! and associative, so shards may be combined in any order or grouping.
//!
//! Raw tables are keyed by the string form of the key exactly as the collectors
//! produce it. [`EvidenceKey`] is the parsed form: the candidate filter parses each
//! string once and works with descriptors from then on.

use std::fmt;
use std::str::FromStr;

use ahash::AHashMap;

use crate::errors::{FgindelError, Result};
use crate::indel::IndelDescriptor;

/// An evidence table as produced by upstream collectors: string key to counts.
pub type EvidenceTable = AHashMap<String, EvidenceCounts>;

/// Per-key evidence counters accumulated across supporting reads.
///
/// All slots are non-negative sums; merging two counters for the same key is
/// element-wise addition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvidenceCounts {
    /// Number of reads observing the indel
    pub observations: u64,
    /// Sum of matched reference bases to the left of the indel, across reads
    pub left_anchor_sum: u64,
    /// Sum of matched reference bases to the right of the indel, across reads
    pub right_anchor_sum: u64,
    /// Sum of per-read mismatch/complexity scores
    pub mess_sum: u64,
    /// Sum of per-read base qualities at the indel
    pub quality_sum: u64,
    /// Reads observing the indel on the forward strand
    pub forward_count: u64,
    /// Reads observing the indel on the reverse strand
    pub reverse_count: u64,
    /// Observations from stitched read pairs
    pub stitched_count: u64,
    /// Observations from reads independently judged high-quality
    pub reputable_count: u64,
}

impl EvidenceCounts {
    /// Adds every slot of `other` into `self`, saturating at `u64::MAX`.
    pub fn merge_from(&mut self, other: &EvidenceCounts) {
        self.observations = self.observations.saturating_add(other.observations);
        self.left_anchor_sum = self.left_anchor_sum.saturating_add(other.left_anchor_sum);
        self.right_anchor_sum = self.right_anchor_sum.saturating_add(other.right_anchor_sum);
        self.mess_sum = self.mess_sum.saturating_add(other.mess_sum);
        self.quality_sum = self.quality_sum.saturating_add(other.quality_sum);
        self.forward_count = self.forward_count.saturating_add(other.forward_count);
        self.reverse_count = self.reverse_count.saturating_add(other.reverse_count);
        self.stitched_count = self.stitched_count.saturating_add(other.stitched_count);
        self.reputable_count = self.reputable_count.saturating_add(other.reputable_count);
    }

    /// Average left anchor length per observation, 0 when there are none.
    #[must_use]
    pub fn average_left_anchor(&self) -> f64 {
        self.per_observation(self.left_anchor_sum)
    }

    /// Average right anchor length per observation, 0 when there are none.
    #[must_use]
    pub fn average_right_anchor(&self) -> f64 {
        self.per_observation(self.right_anchor_sum)
    }

    /// Average mess score per observation, 0 when there are none.
    #[must_use]
    pub fn average_mess(&self) -> f64 {
        self.per_observation(self.mess_sum)
    }

    /// Average base quality per observation, 0 when there are none.
    #[must_use]
    pub fn average_quality(&self) -> f64 {
        self.per_observation(self.quality_sum)
    }

    /// Fraction of observations on the forward strand.
    #[must_use]
    pub fn forward_fraction(&self) -> f64 {
        self.per_observation(self.forward_count)
    }

    /// Fraction of observations on the reverse strand.
    #[must_use]
    pub fn reverse_fraction(&self) -> f64 {
        self.per_observation(self.reverse_count)
    }

    /// Fraction of observations from stitched pairs.
    #[must_use]
    pub fn stitched_fraction(&self) -> f64 {
        self.per_observation(self.stitched_count)
    }

    /// Fraction of observations from reputable reads.
    #[must_use]
    pub fn reputable_fraction(&self) -> f64 {
        self.per_observation(self.reputable_count)
    }

    fn per_observation(&self, sum: u64) -> f64 {
        if self.observations == 0 { 0.0 } else { sum as f64 / self.observations as f64 }
    }
}

/// A parsed evidence key: one indel, or a linked pair observed in the same read.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EvidenceKey {
    /// A single indel observation
    Single(IndelDescriptor),
    /// Two indels observed together in the same read
    Compound(IndelDescriptor, IndelDescriptor),
}

impl EvidenceKey {
    /// True for compound (two-indel) keys.
    #[must_use]
    pub fn is_compound(&self) -> bool {
        matches!(self, Self::Compound(_, _))
    }

    /// The constituent descriptors, one or two.
    #[must_use]
    pub fn descriptors(&self) -> Vec<&IndelDescriptor> {
        match self {
            Self::Single(descriptor) => vec![descriptor],
            Self::Compound(first, second) => vec![first, second],
        }
    }
}

impl FromStr for EvidenceKey {
    type Err = FgindelError;

    /// Parses `chrom:pos ref>alt`, optionally `|`-joined with a second such
    /// description. Keys with more than two parts are rejected: compound indels
    /// with more than two members are not supported.
    fn from_str(text: &str) -> Result<Self> {
        let parts: Vec<&str> = text.split('|').collect();
        match parts.as_slice() {
            [single] => Ok(Self::Single(IndelDescriptor::parse(single)?)),
            [first, second] => {
                Ok(Self::Compound(IndelDescriptor::parse(first)?, IndelDescriptor::parse(second)?))
            }
            _ => Err(FgindelError::MalformedEvidenceKey {
                key: text.to_string(),
                reason: format!("{} compound parts, at most 2 supported", parts.len()),
            }),
        }
    }
}

impl fmt::Display for EvidenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(descriptor) => write!(f, "{descriptor}"),
            Self::Compound(first, second) => write!(f, "{first}|{second}"),
        }
    }
}

/// Merges any number of partial evidence tables into one.
///
/// The value for each key present in any input is the element-wise sum across all
/// inputs containing that key; keys absent from an input contribute zero.
#[must_use]
pub fn merge_evidence_tables(tables: impl IntoIterator<Item = EvidenceTable>) -> EvidenceTable {
    let mut merged = EvidenceTable::new();
    for table in tables {
        for (key, counts) in table {
            merged.entry(key).or_default().merge_from(&counts);
        }
    }
    merged
}

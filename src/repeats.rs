//! Sequence repeat analysis utilities.
//!
//! Small pure helpers over byte slices: primitive repeat units, tandem-run
//! counting around a site, homopolymer runs, and mismatch counting. These drive
//! the repeat/duplication classification during reference contextualization.

/// Returns the smallest unit whose repetition reproduces `seq`.
///
/// If `seq` has no shorter period the whole slice is returned.
///
/// # Examples
///
/// ```
/// use fgindel::repeats::smallest_repeat_unit;
///
/// assert_eq!(smallest_repeat_unit(b"ATATAT"), b"AT");
/// assert_eq!(smallest_repeat_unit(b"AAAA"), b"A");
/// assert_eq!(smallest_repeat_unit(b"ATG"), b"ATG");
/// assert_eq!(smallest_repeat_unit(b"ATGAT"), b"ATGAT");
/// ```
#[must_use]
pub fn smallest_repeat_unit(seq: &[u8]) -> &[u8] {
    for unit_len in 1..=seq.len() / 2 {
        if seq.len() % unit_len != 0 {
            continue;
        }
        let unit = &seq[..unit_len];
        if seq.chunks(unit_len).all(|chunk| chunk == unit) {
            return unit;
        }
    }
    seq
}

/// Finds the unit with the most consecutive tandem copies through `boundary`.
///
/// `boundary` is the index between the left and right context (for an indel,
/// the first base after the anchor). For every unit length from 1 to
/// `max_unit`, the bases just right of the boundary and the bases just left of
/// it are each tried as the unit, counting whole-unit copies extending in both
/// directions from the boundary. Returns the best `(unit, copies)`, preferring
/// shorter units on ties, or `None` when no unit fits.
///
/// # Examples
///
/// ```
/// use fgindel::repeats::best_tandem_run;
///
/// // The AC run spans the boundary: one copy left of index 4, two right.
/// let (unit, copies) = best_tandem_run(b"TTACACACGG", 4, 6).unwrap();
/// assert_eq!(unit, b"AC");
/// assert_eq!(copies, 3);
/// ```
#[must_use]
pub fn best_tandem_run(bases: &[u8], boundary: usize, max_unit: usize) -> Option<(&[u8], usize)> {
    if boundary > bases.len() {
        return None;
    }

    let mut best: Option<(&[u8], usize)> = None;
    for unit_len in 1..=max_unit {
        let right_unit = if boundary + unit_len <= bases.len() {
            Some(&bases[boundary..boundary + unit_len])
        } else {
            None
        };
        let left_unit = if boundary >= unit_len {
            let unit = &bases[boundary - unit_len..boundary];
            // Inside a run both probes agree; only count once.
            if right_unit == Some(unit) { None } else { Some(unit) }
        } else {
            None
        };

        for unit in [right_unit, left_unit].into_iter().flatten() {
            let copies = copies_right(bases, boundary, unit) + copies_left(bases, boundary, unit);
            if best.map_or(true, |(_, best_copies)| copies > best_copies) {
                best = Some((unit, copies));
            }
        }
    }
    best
}

/// Whole-unit copies of `unit` starting at `boundary` and extending right.
fn copies_right(bases: &[u8], boundary: usize, unit: &[u8]) -> usize {
    let mut copies = 0;
    let mut at = boundary;
    while at + unit.len() <= bases.len() && &bases[at..at + unit.len()] == unit {
        copies += 1;
        at += unit.len();
    }
    copies
}

/// Whole-unit copies of `unit` ending at `boundary` and extending left.
fn copies_left(bases: &[u8], boundary: usize, unit: &[u8]) -> usize {
    let mut copies = 0;
    let mut at = boundary;
    while at >= unit.len() && &bases[at - unit.len()..at] == unit {
        copies += 1;
        at -= unit.len();
    }
    copies
}

/// Length of the run of identical bases covering `index`, 0 when out of range.
///
/// # Examples
///
/// ```
/// use fgindel::repeats::homopolymer_run_length;
///
/// assert_eq!(homopolymer_run_length(b"ACGGGGTA", 3), 4);
/// assert_eq!(homopolymer_run_length(b"ACGGGGTA", 0), 1);
/// assert_eq!(homopolymer_run_length(b"ACGGGGTA", 8), 0);
/// ```
#[must_use]
pub fn homopolymer_run_length(bases: &[u8], index: usize) -> usize {
    let Some(&base) = bases.get(index) else {
        return 0;
    };
    let mut left = index;
    while left > 0 && bases[left - 1] == base {
        left -= 1;
    }
    let mut right = index + 1;
    while right < bases.len() && bases[right] == base {
        right += 1;
    }
    right - left
}

/// Counts positional mismatches between two slices over their common length.
///
/// # Examples
///
/// ```
/// use fgindel::repeats::hamming_distance;
///
/// assert_eq!(hamming_distance(b"ACGT", b"ACGT"), 0);
/// assert_eq!(hamming_distance(b"ACGT", b"AGGA"), 2);
/// ```
#[must_use]
pub fn hamming_distance(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b.iter()).filter(|(x, y)| x != y).count()
}

//! Reference sequence windows.
//!
//! The surrounding application owns reference I/O; this core receives one
//! contiguous slice of a chromosome per invocation as a [`ReferenceWindow`].
//! Bases are normalized to uppercase on construction since soft-mask case carries
//! no meaning for candidate consolidation, so all downstream comparisons are plain
//! byte equality and extracted alleles come out uppercase.

/// A contiguous run of reference bases with its genomic offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceWindow {
    /// 0-based genomic offset of `bases[0]`
    start: i64,
    bases: Vec<u8>,
}

impl ReferenceWindow {
    /// Creates a window whose first base sits at 0-based genomic offset `start`.
    #[must_use]
    pub fn new(start: i64, bases: impl Into<Vec<u8>>) -> Self {
        let mut bases = bases.into();
        bases.make_ascii_uppercase();
        Self { start, bases }
    }

    /// 0-based genomic offset of the first base.
    #[must_use]
    pub fn start(&self) -> i64 {
        self.start
    }

    /// 0-based genomic offset one past the last base.
    #[must_use]
    pub fn end(&self) -> i64 {
        self.start + self.bases.len() as i64
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bases.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }

    /// The full window contents.
    #[must_use]
    pub fn bases(&self) -> &[u8] {
        &self.bases
    }

    /// Window-relative index of 1-based genomic position `pos`, if in range.
    #[must_use]
    pub fn index_of(&self, pos: i64) -> Option<usize> {
        let index = pos - 1 - self.start;
        if index >= 0 && index < self.bases.len() as i64 { Some(index as usize) } else { None }
    }

    /// The base at 1-based genomic position `pos`, if in range.
    #[must_use]
    pub fn base_at(&self, pos: i64) -> Option<u8> {
        self.index_of(pos).map(|index| self.bases[index])
    }

    /// `len` bases starting at 1-based genomic position `pos`.
    ///
    /// Returns `None` unless the entire requested range lies inside the window.
    #[must_use]
    pub fn fetch(&self, pos: i64, len: usize) -> Option<&[u8]> {
        let index = self.index_of(pos)?;
        self.bases.get(index..index + len)
    }

    /// The bases in the window-relative index range `[from, to)`, clipped to the
    /// window bounds. Out-of-range or inverted ranges yield an empty slice.
    #[must_use]
    pub fn slice_clamped(&self, from: i64, to: i64) -> &[u8] {
        let len = self.bases.len() as i64;
        let from = from.clamp(0, len) as usize;
        let to = to.clamp(0, len) as usize;
        if from >= to { &[] } else { &self.bases[from..to] }
    }
}

//! Synchronized cursors over one species' segment of a state buffer.
//!
//! An [`IteratorSet`] holds a single position shared by every variable of the
//! species, so reading `X` and `u` at the same position always refers to the
//! same cohort. Cohorts are stored in decreasing trait order: forward
//! traversal from [`IteratorSet::begin`] visits descending trait values and
//! reverse traversal from [`IteratorSet::rbegin`] ascending ones.
//!
//! ```ignore
//! let mut it = species.iterators(solver.state())?;
//! let x = it.get("X")?;
//! let u = it.get("u")?;
//! it.rbegin();
//! while let (Some(size), Some(density)) = (it.value(&x), it.value(&u)) {
//!     println!("{size} {density}");
//!     it.retreat();
//! }
//! ```

use crate::{
    error::{InvariantError, LookupError},
    layout::{Field, Layout},
};

/// Bidirectional, seekable cursor set over a species segment.
#[derive(Debug, Clone)]
pub struct IteratorSet<'a> {
    segment: &'a [f64],
    layout: &'a Layout,
    width: usize,
    len: usize,
    // 0 is one before the first record, `len + 1` one past the last.
    cursor: usize,
}

impl<'a> IteratorSet<'a> {
    /// Builds a set over `buffer[start..start + len * width]`.
    ///
    /// The cursor starts at the first record.
    ///
    /// # Errors
    ///
    /// Returns an error if `buffer` is too short for the segment.
    pub fn new(
        buffer: &'a [f64],
        layout: &'a Layout,
        start: usize,
        len: usize,
    ) -> Result<Self, InvariantError> {
        let width = layout.width();
        let end = start + len * width;
        let segment = buffer.get(start..end).ok_or(InvariantError::BufferTooShort {
            len: buffer.len(),
            end,
        })?;

        Ok(Self {
            segment,
            layout,
            width,
            len,
            cursor: 1,
        })
    }

    /// Returns a handle to the named variable.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::UnknownVariable`] if `name` is not registered.
    pub fn get(&self, name: &str) -> Result<Field, LookupError> {
        self.layout.field(name).cloned()
    }

    /// Number of records in the segment.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the segment holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Moves to the first record (largest trait value).
    pub fn begin(&mut self) {
        self.cursor = 1;
    }

    /// Moves to the last record (smallest trait value).
    pub fn rbegin(&mut self) {
        self.cursor = self.len;
    }

    /// Returns `true` once forward traversal has passed the last record.
    #[must_use]
    pub fn is_end(&self) -> bool {
        self.cursor > self.len
    }

    /// Returns `true` once reverse traversal has passed the first record.
    #[must_use]
    pub fn is_rend(&self) -> bool {
        self.cursor == 0
    }

    /// Moves every cursor one record forward.
    pub fn advance(&mut self) {
        if self.cursor <= self.len {
            self.cursor += 1;
        }
    }

    /// Moves every cursor one record back.
    pub fn retreat(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    /// Moves to record `index`; indices past the end park the set at the end.
    pub fn seek(&mut self, index: usize) {
        self.cursor = index.min(self.len) + 1;
    }

    /// Current record index, or `None` when parked before or after the segment.
    #[must_use]
    pub fn index(&self) -> Option<usize> {
        (1..=self.len).contains(&self.cursor).then(|| self.cursor - 1)
    }

    /// Returns the current record, or `None` when parked outside the segment.
    #[must_use]
    pub fn record(&self) -> Option<&'a [f64]> {
        let start = self.index()? * self.width;
        self.segment.get(start..start + self.width)
    }

    /// First scalar of `field` at the current record.
    #[must_use]
    pub fn value(&self, field: &Field) -> Option<f64> {
        self.record()?.get(field.offset()).copied()
    }

    /// All `stride` scalars of `field` at the current record.
    #[must_use]
    pub fn values(&self, field: &Field) -> Option<&'a [f64]> {
        self.record()?.get(field.range())
    }

    /// Iterates over every record, first to last, independently of the cursor.
    pub fn records(&self) -> std::slice::ChunksExact<'a, f64> {
        self.segment.chunks_exact(self.width.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xu_layout() -> Layout {
        let mut layout = Layout::new();
        layout.push_scalar("X").unwrap();
        layout.push_scalar("u").unwrap();
        layout
    }

    #[test]
    fn forward_and_reverse_traversal() {
        let layout = xu_layout();
        // A leading scalar that belongs to some other species.
        let buffer = [9.0, 3.0, 30.0, 2.0, 20.0, 1.0, 10.0];
        let mut it = IteratorSet::new(&buffer, &layout, 1, 3).unwrap();
        let x = it.get("X").unwrap();
        let u = it.get("u").unwrap();

        let mut forward = Vec::new();
        it.begin();
        while !it.is_end() {
            forward.push((it.value(&x).unwrap(), it.value(&u).unwrap()));
            it.advance();
        }
        assert_eq!(forward, [(3.0, 30.0), (2.0, 20.0), (1.0, 10.0)]);

        let mut reverse = Vec::new();
        it.rbegin();
        while !it.is_rend() {
            reverse.push(it.value(&x).unwrap());
            it.retreat();
        }
        assert_eq!(reverse, [1.0, 2.0, 3.0]);
        assert_eq!(it.value(&x), None);
        assert_eq!(it.values(&u), None);
    }

    #[test]
    fn seek_and_index_stay_in_sync() {
        let layout = xu_layout();
        let buffer = [3.0, 30.0, 2.0, 20.0, 1.0, 10.0];
        let mut it = IteratorSet::new(&buffer, &layout, 0, 3).unwrap();
        let u = it.get("u").unwrap();

        it.seek(1);
        assert_eq!(it.index(), Some(1));
        assert_eq!(it.record(), Some(&[2.0, 20.0][..]));
        assert_eq!(it.values(&u), Some(&[20.0][..]));

        it.seek(10);
        assert!(it.is_end());
        assert_eq!(it.index(), None);
        assert_eq!(it.record(), None);
        assert_eq!(it.value(&u), None);

        it.retreat();
        assert_eq!(it.index(), Some(2));
    }

    #[test]
    fn records_cover_segment() {
        let layout = xu_layout();
        let buffer = [3.0, 30.0, 2.0, 20.0];
        let it = IteratorSet::new(&buffer, &layout, 0, 2).unwrap();
        let xs: Vec<f64> = it.records().rev().map(|r| r[0]).collect();
        assert_eq!(xs, [2.0, 3.0]);
        assert_eq!(it.records().len(), 2);
    }

    #[test]
    fn short_buffer_is_rejected() {
        let layout = xu_layout();
        let buffer = [1.0, 2.0, 3.0];
        assert_eq!(
            IteratorSet::new(&buffer, &layout, 0, 2).unwrap_err(),
            InvariantError::BufferTooShort { len: 3, end: 4 }
        );
    }

    #[test]
    fn unknown_variable() {
        let layout = xu_layout();
        let it = IteratorSet::new(&[], &layout, 0, 0).unwrap();
        assert!(it.is_empty());
        assert_eq!(
            it.get("leaf").unwrap_err(),
            LookupError::UnknownVariable("leaf".into())
        );
    }
}

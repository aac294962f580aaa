//! Sparse bucket encoding: a strictly increasing array of positions.

/// A bucket storing its positions as a sorted `Vec<u16>` with no duplicates.
///
/// This is the canonical encoding for buckets at or below
/// [`ARRAY_MAX_LEN`](crate::bucket::ARRAY_MAX_LEN) positions, where two bytes
/// per position undercuts the fixed dense block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ArrayBucket {
    values: Vec<u16>,
}

impl ArrayBucket {
    /// Wraps a strictly increasing position vector.
    pub fn from_sorted(values: Vec<u16>) -> ArrayBucket {
        debug_assert!(
            values.windows(2).all(|pair| pair[0] < pair[1]),
            "array bucket positions must be strictly increasing"
        );
        ArrayBucket { values }
    }

    #[inline]
    pub fn cardinality(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn contains(&self, pos: u16) -> bool {
        self.values.binary_search(&pos).is_ok()
    }

    #[inline]
    pub fn values(&self) -> &[u16] {
        &self.values
    }

    pub fn iter(&self) -> std::iter::Copied<std::slice::Iter<'_, u16>> {
        self.values.iter().copied()
    }

    /// Two-pointer intersection into a fresh bucket.
    pub fn intersect(&self, other: &ArrayBucket) -> ArrayBucket {
        let mut values = Vec::with_capacity(self.values.len().min(other.values.len()));
        let mut i = 0;
        let mut j = 0;
        while i < self.values.len() && j < other.values.len() {
            if self.values[i] < other.values[j] {
                i += 1;
            } else if self.values[i] > other.values[j] {
                j += 1;
            } else {
                values.push(self.values[i]);
                i += 1;
                j += 1;
            }
        }
        values.shrink_to_fit();
        ArrayBucket { values }
    }

    /// In-place intersection, compacting survivors through a write index.
    pub fn intersect_with(&mut self, other: &ArrayBucket) {
        let mut write = 0;
        let mut j = 0;
        for i in 0..self.values.len() {
            let pos = self.values[i];
            while j < other.values.len() && other.values[j] < pos {
                j += 1;
            }
            if j < other.values.len() && other.values[j] == pos {
                self.values[write] = pos;
                write += 1;
                j += 1;
            }
        }
        self.values.truncate(write);
    }

    /// Drops every position rejected by `keep`, preserving order.
    pub fn retain_positions(&mut self, mut keep: impl FnMut(u16) -> bool) {
        self.values.retain(|&pos| keep(pos));
    }

    /// Two-pointer merge union into a fresh position vector.
    ///
    /// The result may exceed the array threshold; the caller decides whether
    /// to keep it sparse or promote it to the dense encoding.
    pub fn union_values(&self, other: &ArrayBucket) -> Vec<u16> {
        let mut values = Vec::with_capacity(self.values.len() + other.values.len());
        let mut i = 0;
        let mut j = 0;
        while i < self.values.len() && j < other.values.len() {
            if self.values[i] < other.values[j] {
                values.push(self.values[i]);
                i += 1;
            } else if self.values[i] > other.values[j] {
                values.push(other.values[j]);
                j += 1;
            } else {
                values.push(self.values[i]);
                i += 1;
                j += 1;
            }
        }
        values.extend_from_slice(&self.values[i..]);
        values.extend_from_slice(&other.values[j..]);
        values
    }

    /// Two-pointer difference: positions of `self` absent from `other`.
    pub fn and_not(&self, other: &ArrayBucket) -> ArrayBucket {
        let mut values = Vec::with_capacity(self.values.len());
        let mut j = 0;
        for &pos in &self.values {
            while j < other.values.len() && other.values[j] < pos {
                j += 1;
            }
            if j == other.values.len() || other.values[j] != pos {
                values.push(pos);
            }
        }
        values.shrink_to_fit();
        ArrayBucket { values }
    }
}

//! Bucket encodings for one 16-bit key span.
//!
//! A bucket holds the low 16 bits of all elements sharing one high key, in
//! one of three encodings: a sorted position array, a dense bit block, or
//! run-length runs. Operators dispatch on the encoding pair, with
//! same-encoding fast paths and a dense fallback for the rest. The canonical
//! encoding is decided by cardinality: the sparse array at or below
//! [`ARRAY_MAX_LEN`], a single run for the full span, the dense block
//! otherwise; every operator returns canonical buckets, so value-equal
//! buckets compare equal regardless of how they were produced.

pub mod array;
pub mod bits;
pub mod runs;

pub use array::ArrayBucket;
pub use bits::BitsBucket;
pub use runs::{Run, RunsBucket};

use crate::bit_block::BitBlockIter;

/// Number of positions covered by one bucket.
pub const BUCKET_SPAN: usize = crate::bit_block::BLOCK_SPAN;

/// Largest cardinality for which the sparse array encoding is the smallest:
/// two bytes per position against the fixed 8 KiB dense block.
pub const ARRAY_MAX_LEN: usize = 4096;

/// Encoding discriminant of a [`Bucket`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketKind {
    Array,
    Bits,
    Runs,
}

/// The set of positions stored under one key, in one of three encodings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bucket {
    Array(ArrayBucket),
    Bits(BitsBucket),
    Runs(RunsBucket),
}

impl Bucket {
    /// Builds a canonical bucket from strictly increasing positions.
    pub fn from_sorted(values: Vec<u16>) -> Bucket {
        if values.len() == BUCKET_SPAN {
            Bucket::Runs(RunsBucket::full())
        } else if values.len() > ARRAY_MAX_LEN {
            Bucket::Bits(BitsBucket::from_positions(&values))
        } else {
            Bucket::Array(ArrayBucket::from_sorted(values))
        }
    }

    /// The bucket covering the entire position span.
    pub fn full_range() -> Bucket {
        Bucket::Runs(RunsBucket::full())
    }

    pub fn kind(&self) -> BucketKind {
        match self {
            Bucket::Array(_) => BucketKind::Array,
            Bucket::Bits(_) => BucketKind::Bits,
            Bucket::Runs(_) => BucketKind::Runs,
        }
    }

    pub fn cardinality(&self) -> usize {
        match self {
            Bucket::Array(array) => array.cardinality(),
            Bucket::Bits(bits) => bits.cardinality(),
            Bucket::Runs(runs) => runs.cardinality(),
        }
    }

    pub fn contains(&self, pos: u16) -> bool {
        match self {
            Bucket::Array(array) => array.contains(pos),
            Bucket::Bits(bits) => bits.contains(pos),
            Bucket::Runs(runs) => runs.contains(pos),
        }
    }

    pub fn is_full_range(&self) -> bool {
        match self {
            Bucket::Array(array) => array.cardinality() == BUCKET_SPAN,
            Bucket::Bits(bits) => bits.cardinality() == BUCKET_SPAN,
            Bucket::Runs(runs) => runs.is_full_range(),
        }
    }

    pub fn iter(&self) -> BucketIter<'_> {
        match self {
            Bucket::Array(array) => BucketIter::Array(array.iter()),
            Bucket::Bits(bits) => BucketIter::Bits(bits.iter()),
            Bucket::Runs(runs) => BucketIter::Runs(runs.iter()),
        }
    }

    /// Expands any encoding into a dense bucket with a valid cardinality,
    /// the working form for union folds.
    pub fn to_dense(&self) -> BitsBucket {
        match self {
            Bucket::Array(array) => BitsBucket::from_positions(array.values()),
            Bucket::Bits(bits) => bits.clone(),
            Bucket::Runs(runs) => runs.to_bits(),
        }
    }

    /// Re-canonicalizes a dense bucket whose cardinality dropped below the
    /// array threshold (or reached the full span); other encodings are
    /// already canonical.
    pub fn compact(self) -> Bucket {
        match self {
            Bucket::Bits(bits) => bits.into_compact(),
            other => other,
        }
    }

    /// Intersection into a fresh canonical bucket. The result may be empty;
    /// callers prune zero-cardinality buckets.
    pub fn intersect(&self, other: &Bucket) -> Bucket {
        if self.is_full_range() {
            return other.clone();
        }
        if other.is_full_range() {
            return self.clone();
        }
        match (self, other) {
            (Bucket::Array(a), Bucket::Array(b)) => Bucket::Array(a.intersect(b)),
            (Bucket::Array(a), Bucket::Bits(b)) => {
                let values = a.iter().filter(|&pos| b.contains(pos)).collect();
                Bucket::Array(ArrayBucket::from_sorted(values))
            }
            (Bucket::Bits(a), Bucket::Array(b)) => {
                let values = b.iter().filter(|&pos| a.contains(pos)).collect();
                Bucket::Array(ArrayBucket::from_sorted(values))
            }
            (Bucket::Bits(a), Bucket::Bits(b)) => {
                let mut bits = a.clone();
                bits.intersect_with(b);
                Bucket::Bits(bits).compact()
            }
            _ => {
                let mut dense = self.to_dense();
                dense.intersect_with(&other.to_dense());
                Bucket::Bits(dense).compact()
            }
        }
    }

    /// In-place intersection for fold accumulators. May switch the encoding
    /// when the survivor set is better served by another one.
    pub fn intersect_with(&mut self, other: &Bucket) {
        if other.is_full_range() {
            return;
        }
        match self {
            Bucket::Array(array) => match other {
                Bucket::Array(other_array) => array.intersect_with(other_array),
                _ => array.retain_positions(|pos| other.contains(pos)),
            },
            Bucket::Bits(bits) => match other {
                Bucket::Bits(other_bits) => bits.intersect_with(other_bits),
                Bucket::Array(other_array) => {
                    let values = other_array.iter().filter(|&pos| bits.contains(pos)).collect();
                    *self = Bucket::Array(ArrayBucket::from_sorted(values));
                }
                Bucket::Runs(other_runs) => bits.intersect_with(&other_runs.to_bits()),
            },
            Bucket::Runs(runs) => {
                let mut dense = runs.to_bits();
                dense.intersect_with(&other.to_dense());
                *self = Bucket::Bits(dense);
            }
        }
    }

    /// Eager union into a fresh canonical bucket.
    pub fn union(&self, other: &Bucket) -> Bucket {
        if self.is_full_range() || other.is_full_range() {
            return Bucket::full_range();
        }
        match (self, other) {
            (Bucket::Array(a), Bucket::Array(b)) => Bucket::from_sorted(a.union_values(b)),
            _ => {
                let mut acc = self.to_dense();
                acc.lazy_union_with(other);
                acc.into_compact()
            }
        }
    }

    /// Difference into a fresh canonical bucket. The result may be empty;
    /// callers prune zero-cardinality buckets.
    pub fn and_not(&self, other: &Bucket) -> Bucket {
        if other.is_full_range() {
            return Bucket::Array(ArrayBucket::default());
        }
        match (self, other) {
            (Bucket::Array(a), Bucket::Array(b)) => Bucket::Array(a.and_not(b)),
            (Bucket::Array(a), _) => {
                let values = a.iter().filter(|&pos| !other.contains(pos)).collect();
                Bucket::Array(ArrayBucket::from_sorted(values))
            }
            _ => {
                let mut dense = self.to_dense();
                dense.and_not_with(&other.to_dense());
                Bucket::Bits(dense).compact()
            }
        }
    }
}

/// Ascending position iterator over any bucket encoding.
pub enum BucketIter<'a> {
    Array(std::iter::Copied<std::slice::Iter<'a, u16>>),
    Bits(BitBlockIter<'a>),
    Runs(runs::RunsIter<'a>),
}

impl Iterator for BucketIter<'_> {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        match self {
            BucketIter::Array(iter) => iter.next(),
            BucketIter::Bits(iter) => iter.next(),
            BucketIter::Runs(iter) => iter.next(),
        }
    }
}

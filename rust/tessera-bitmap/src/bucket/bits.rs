//! Dense bucket encoding over a fixed bit block, with cached cardinality.

use crate::bit_block::{BitBlock, BitBlockIter};
use crate::bucket::{ARRAY_MAX_LEN, ArrayBucket, BUCKET_SPAN, Bucket, RunsBucket};

/// A bucket storing its positions as a 65536-bit block.
///
/// The cardinality is cached next to the block. Eager operators keep the
/// cache valid; [`lazy_union_with`](BitsBucket::lazy_union_with) invalidates
/// it (`None`) and defers the recount to a single
/// [`repair_cardinality`](BitsBucket::repair_cardinality) pass after a union
/// fold. Reading the cardinality while the cache is invalid is a protocol
/// breach and panics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitsBucket {
    bits: BitBlock,
    cardinality: Option<usize>,
}

impl BitsBucket {
    pub fn empty() -> BitsBucket {
        BitsBucket {
            bits: BitBlock::empty(),
            cardinality: Some(0),
        }
    }

    /// Builds a dense bucket from strictly increasing positions.
    pub fn from_positions(positions: &[u16]) -> BitsBucket {
        let mut bits = BitBlock::empty();
        for &pos in positions {
            bits.set(pos);
        }
        BitsBucket {
            bits,
            cardinality: Some(positions.len()),
        }
    }

    pub(crate) fn from_block(bits: BitBlock, cardinality: usize) -> BitsBucket {
        debug_assert_eq!(bits.count_ones(), cardinality);
        BitsBucket {
            bits,
            cardinality: Some(cardinality),
        }
    }

    /// Returns the cached cardinality.
    ///
    /// Panics if the cache is stale, i.e. between a lazy union and its
    /// repair pass.
    #[inline]
    pub fn cardinality(&self) -> usize {
        match self.cardinality {
            Some(count) => count,
            None => panic!("dense bucket cardinality is stale and was not repaired"),
        }
    }

    #[inline]
    pub fn contains(&self, pos: u16) -> bool {
        self.bits.contains(pos)
    }

    pub fn iter(&self) -> BitBlockIter<'_> {
        self.bits.iter()
    }

    /// Eager intersection; recounts immediately.
    pub fn intersect_with(&mut self, other: &BitsBucket) {
        self.bits.and_with(&other.bits);
        self.cardinality = Some(self.bits.count_ones());
    }

    /// Eager difference; recounts immediately.
    pub fn and_not_with(&mut self, other: &BitsBucket) {
        self.bits.and_not_with(&other.bits);
        self.cardinality = Some(self.bits.count_ones());
    }

    /// ORs the positions of `other` (any encoding) into this block without
    /// recounting, leaving the cached cardinality stale.
    pub fn lazy_union_with(&mut self, other: &Bucket) {
        match other {
            Bucket::Array(array) => {
                for pos in array.iter() {
                    self.bits.set(pos);
                }
            }
            Bucket::Bits(bits) => self.bits.or_with(&bits.bits),
            Bucket::Runs(runs) => {
                for run in runs.runs() {
                    self.bits.set_run(run.first, run.last);
                }
            }
        }
        self.cardinality = None;
    }

    /// Recounts the cardinality if the cache is stale.
    pub fn repair_cardinality(&mut self) {
        if self.cardinality.is_none() {
            self.cardinality = Some(self.bits.count_ones());
        }
    }

    /// Repair pass after a union fold: recounts a stale cache, then picks the
    /// compact encoding for the final cardinality. A full-span bucket
    /// collapses to a single run; a bucket at or below the array threshold
    /// converts to the sparse encoding; everything else stays dense.
    pub fn into_compact(mut self) -> Bucket {
        self.repair_cardinality();
        let count = self.cardinality();
        if count == BUCKET_SPAN {
            Bucket::Runs(RunsBucket::full())
        } else if count <= ARRAY_MAX_LEN {
            let mut values = Vec::with_capacity(count);
            values.extend(self.bits.iter());
            Bucket::Array(ArrayBucket::from_sorted(values))
        } else {
            Bucket::Bits(self)
        }
    }
}

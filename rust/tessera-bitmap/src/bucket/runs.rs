//! Run-length bucket encoding: sorted disjoint inclusive runs.

use crate::bit_block::BitBlock;
use crate::bucket::bits::BitsBucket;

/// A run of positions `[first, last]` (both inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    /// First position of the run.
    pub first: u16,
    /// Inclusive last position of the run.
    pub last: u16,
}

impl Run {
    #[inline]
    pub fn len(&self) -> usize {
        self.last as usize - self.first as usize + 1
    }

    #[inline]
    pub fn contains(&self, pos: u16) -> bool {
        pos >= self.first && pos <= self.last
    }
}

/// A bucket storing its positions as sorted, disjoint, non-adjacent runs.
///
/// Within the aggregation engine this encoding arises as the canonical form
/// of the full-span bucket, which a single run describes in four bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunsBucket {
    runs: Vec<Run>,
}

impl RunsBucket {
    /// The bucket covering the entire position span as one run.
    pub fn full() -> RunsBucket {
        RunsBucket {
            runs: vec![Run {
                first: 0,
                last: u16::MAX,
            }],
        }
    }

    #[inline]
    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    pub fn cardinality(&self) -> usize {
        self.runs.iter().map(Run::len).sum()
    }

    pub fn contains(&self, pos: u16) -> bool {
        let index = self.runs.partition_point(|run| run.last < pos);
        index < self.runs.len() && self.runs[index].contains(pos)
    }

    pub fn is_full_range(&self) -> bool {
        self.runs.len() == 1 && self.runs[0].first == 0 && self.runs[0].last == u16::MAX
    }

    pub fn iter(&self) -> RunsIter<'_> {
        RunsIter {
            runs: &self.runs,
            index: 0,
            next_pos: self.runs.first().map_or(0, |run| run.first as u32),
        }
    }

    /// Expands the runs into a dense bucket with a valid cardinality.
    pub fn to_bits(&self) -> BitsBucket {
        let mut bits = BitBlock::empty();
        for run in &self.runs {
            bits.set_run(run.first, run.last);
        }
        BitsBucket::from_block(bits, self.cardinality())
    }
}

/// Ascending position iterator over a [`RunsBucket`].
pub struct RunsIter<'a> {
    runs: &'a [Run],
    index: usize,
    // Tracked as u32 so that a run ending at u16::MAX cannot wrap.
    next_pos: u32,
}

impl Iterator for RunsIter<'_> {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        if self.index == self.runs.len() {
            return None;
        }
        let run = self.runs[self.index];
        let pos = self.next_pos;
        if pos == run.last as u32 {
            self.index += 1;
            if self.index < self.runs.len() {
                self.next_pos = self.runs[self.index].first as u32;
            }
        } else {
            self.next_pos = pos + 1;
        }
        Some(pos as u16)
    }
}

//! Read-only cursor over one bitmap's (key, bucket) sequence.

use crate::bitmap::Bitmap;
use crate::bucket::Bucket;

/// A monotonic cursor holding a bitmap handle, the current index, and the
/// key cached from that index.
///
/// The cursor never re-examines a passed index. Buckets are dereferenced
/// lazily through the handle, so nothing here points into bucket internals.
#[derive(Debug, Clone, Copy)]
pub struct PartitionCursor<'a> {
    bitmap: &'a Bitmap,
    index: usize,
    key: u16,
}

impl<'a> PartitionCursor<'a> {
    /// Positions a cursor on the first bucket; `None` for an empty bitmap.
    pub fn new(bitmap: &'a Bitmap) -> Option<PartitionCursor<'a>> {
        if bitmap.is_empty() {
            return None;
        }
        Some(PartitionCursor {
            bitmap,
            index: 0,
            key: bitmap.key_at(0),
        })
    }

    #[inline]
    pub fn key(&self) -> u16 {
        self.key
    }

    #[inline]
    pub fn bucket(&self) -> &'a Bucket {
        self.bitmap.bucket_at(self.index)
    }

    /// Steps to the next bucket; `false` once the bitmap is exhausted.
    pub fn advance(&mut self) -> bool {
        self.index += 1;
        if self.index < self.bitmap.bucket_count() {
            self.key = self.bitmap.key_at(self.index);
            true
        } else {
            false
        }
    }

    /// Skips ahead to the first bucket whose key is at least `min_key`;
    /// `false` once the bitmap is exhausted.
    pub fn seek(&mut self, min_key: u16) -> bool {
        self.index = self.bitmap.advance_until(min_key, self.index);
        if self.index < self.bitmap.bucket_count() {
            self.key = self.bitmap.key_at(self.index);
            true
        } else {
            false
        }
    }
}

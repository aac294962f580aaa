//! K-way merge over per-bitmap cursors, grouped by partition key.

use crate::bitmap::Bitmap;
use crate::bucket::Bucket;

use super::cursor::PartitionCursor;

/// Array-backed binary min-heap of partition cursors, ordered by the key
/// each cursor currently rests on.
///
/// The heap yields buckets in strictly increasing key order, one group per
/// call: all buckets sharing the minimum key come out together, and every
/// contributing cursor is stepped past that key before the group returns.
pub struct MergeHeap<'a> {
    cursors: Vec<PartitionCursor<'a>>,
}

impl<'a> MergeHeap<'a> {
    /// Builds a heap over the non-empty inputs. Empty bitmaps contribute no
    /// cursor and simply vanish from the merge.
    pub fn new(bitmaps: &[&'a Bitmap]) -> MergeHeap<'a> {
        let mut heap = MergeHeap {
            cursors: Vec::with_capacity(bitmaps.len()),
        };
        for bitmap in bitmaps {
            if let Some(cursor) = PartitionCursor::new(bitmap) {
                heap.cursors.push(cursor);
                heap.sift_up(heap.cursors.len() - 1);
            }
        }
        heap
    }

    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }

    /// Collects the next key group into `group` and returns its key, or
    /// `None` once every cursor is exhausted. `group` is cleared first.
    pub fn next_group(&mut self, group: &mut Vec<&'a Bucket>) -> Option<u16> {
        group.clear();
        let key = self.cursors.first()?.key();
        while let Some(top) = self.cursors.first() {
            if top.key() != key {
                break;
            }
            group.push(top.bucket());
            self.advance_top();
        }
        Some(key)
    }

    /// Steps the root cursor forward and restores heap order, dropping the
    /// cursor if its bitmap is exhausted.
    fn advance_top(&mut self) {
        if self.cursors[0].advance() {
            self.sift_down(0);
        } else {
            self.cursors.swap_remove(0);
            if !self.cursors.is_empty() {
                self.sift_down(0);
            }
        }
    }

    fn sift_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) / 2;
            if self.cursors[index].key() >= self.cursors[parent].key() {
                break;
            }
            self.cursors.swap(index, parent);
            index = parent;
        }
    }

    fn sift_down(&mut self, mut index: usize) {
        loop {
            let left = 2 * index + 1;
            if left >= self.cursors.len() {
                break;
            }
            let right = left + 1;
            let mut smallest = left;
            if right < self.cursors.len()
                && self.cursors[right].key() < self.cursors[left].key()
            {
                smallest = right;
            }
            if self.cursors[index].key() <= self.cursors[smallest].key() {
                break;
            }
            self.cursors.swap(index, smallest);
            index = smallest;
        }
    }
}

//! Reusable group buffers for the merge loop.

use std::sync::Mutex;

use crate::bucket::Bucket;

/// Free-list of group buffers, bounding allocation to the number of buffers
/// in flight rather than the number of merge steps.
///
/// Checkout and recycle transfer ownership of the `Vec` by move, so a buffer
/// has exactly one holder at any time: the merge loop between checkout and
/// task submission, then the worker consuming the task.
pub struct GroupPool<'a> {
    buffers: Mutex<Vec<Vec<&'a Bucket>>>,
    group_capacity: usize,
}

impl<'a> GroupPool<'a> {
    /// `group_capacity` is the input bitmap count, the largest possible group.
    pub fn new(group_capacity: usize) -> GroupPool<'a> {
        GroupPool {
            buffers: Mutex::new(Vec::new()),
            group_capacity,
        }
    }

    /// Takes a recycled buffer, or allocates one pre-sized for a full group.
    pub fn checkout(&self) -> Vec<&'a Bucket> {
        self.buffers
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| Vec::with_capacity(self.group_capacity))
    }

    /// Clears `buffer` and returns it to the free list.
    pub fn recycle(&self, mut buffer: Vec<&'a Bucket>) {
        buffer.clear();
        self.buffers.lock().unwrap().push(buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::Bucket;

    #[test]
    fn test_checkout_presizes_for_a_full_group() {
        let pool: GroupPool<'_> = GroupPool::new(5);
        let buffer = pool.checkout();
        assert!(buffer.is_empty());
        assert!(buffer.capacity() >= 5);
    }

    #[test]
    fn test_recycle_clears_and_reuses() {
        let bucket = Bucket::from_sorted(vec![1, 2, 3]);
        let pool = GroupPool::new(2);
        let mut buffer = pool.checkout();
        buffer.push(&bucket);
        buffer.push(&bucket);
        pool.recycle(buffer);
        assert_eq!(pool.buffers.lock().unwrap().len(), 1);

        let reused = pool.checkout();
        assert!(reused.is_empty());
        assert!(reused.capacity() >= 2);
        assert_eq!(pool.buffers.lock().unwrap().len(), 0);
    }
}

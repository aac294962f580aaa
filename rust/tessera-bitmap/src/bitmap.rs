//! Keyed bucket store: a compressed set of `u32` values.

use crate::bucket::Bucket;

/// A compressed bitmap over `u32` values.
///
/// Values are split into a high 16-bit key and a low 16-bit position. The
/// store keeps parallel `keys`/`buckets` vectors sorted by key, with no
/// duplicate keys and no empty buckets. Buckets are canonical (see
/// [`crate::bucket`]), so two bitmaps holding the same value set compare
/// equal with `==`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Bitmap {
    keys: Vec<u16>,
    buckets: Vec<Bucket>,
}

impl Bitmap {
    pub fn new() -> Bitmap {
        Bitmap::default()
    }

    /// Builds a bitmap from values in any order, ignoring duplicates.
    pub fn of(values: &[u32]) -> Bitmap {
        let mut sorted = values.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let mut bitmap = Bitmap::new();
        let mut start = 0;
        while start < sorted.len() {
            let key = (sorted[start] >> 16) as u16;
            let mut end = start + 1;
            while end < sorted.len() && (sorted[end] >> 16) as u16 == key {
                end += 1;
            }
            let positions = sorted[start..end].iter().map(|&value| value as u16).collect();
            bitmap.push_bucket(key, Bucket::from_sorted(positions));
            start = end;
        }
        bitmap
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    #[inline]
    pub fn bucket_count(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    pub fn key_at(&self, index: usize) -> u16 {
        self.keys[index]
    }

    #[inline]
    pub fn bucket_at(&self, index: usize) -> &Bucket {
        &self.buckets[index]
    }

    /// Appends a bucket under `key`.
    ///
    /// Append-only: panics unless `key` exceeds every stored key and the
    /// bucket is non-empty, the invariants every reader relies on.
    pub fn push_bucket(&mut self, key: u16, bucket: Bucket) {
        assert!(bucket.cardinality() > 0, "empty buckets are never stored");
        if let Some(&last) = self.keys.last() {
            assert!(
                key > last,
                "bucket keys must be appended in increasing order: {last} then {key}"
            );
        }
        self.keys.push(key);
        self.buckets.push(bucket);
    }

    /// Total number of stored values.
    pub fn cardinality(&self) -> u64 {
        self.buckets.iter().map(|bucket| bucket.cardinality() as u64).sum()
    }

    pub fn contains(&self, value: u32) -> bool {
        let key = (value >> 16) as u16;
        match self.keys.binary_search(&key) {
            Ok(index) => self.buckets[index].contains(value as u16),
            Err(_) => false,
        }
    }

    /// Iterates the stored values in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.keys.iter().zip(&self.buckets).flat_map(|(&key, bucket)| {
            let base = (key as u32) << 16;
            bucket.iter().map(move |pos| base | pos as u32)
        })
    }

    /// Returns the smallest index at or after `from` whose key is at least
    /// `min_key`, or `bucket_count()` if no such key exists.
    ///
    /// Galloping search: an exponential probe brackets the answer, then a
    /// binary search pins it inside the bracket. Cheap when the target is
    /// near, logarithmic when it is far.
    pub fn advance_until(&self, min_key: u16, from: usize) -> usize {
        if from >= self.keys.len() || self.keys[from] >= min_key {
            return from;
        }
        let mut span = 1;
        while from + span < self.keys.len() && self.keys[from + span] < min_key {
            span *= 2;
        }
        let lower = from + span / 2;
        let upper = (from + span).min(self.keys.len());
        lower + self.keys[lower..upper].partition_point(|&key| key < min_key)
    }

    /// Sequential pairwise intersection.
    pub fn and(&self, other: &Bitmap) -> Bitmap {
        let mut result = Bitmap::new();
        let mut i = 0;
        let mut j = 0;
        while i < self.keys.len() && j < other.keys.len() {
            let key = self.keys[i];
            let other_key = other.keys[j];
            if key == other_key {
                let bucket = self.buckets[i].intersect(&other.buckets[j]);
                if bucket.cardinality() > 0 {
                    result.push_bucket(key, bucket);
                }
                i += 1;
                j += 1;
            } else if key < other_key {
                i = self.advance_until(other_key, i);
            } else {
                j = other.advance_until(key, j);
            }
        }
        result
    }

    /// Sequential pairwise union.
    pub fn or(&self, other: &Bitmap) -> Bitmap {
        let mut result = Bitmap::new();
        let mut i = 0;
        let mut j = 0;
        while i < self.keys.len() && j < other.keys.len() {
            let key = self.keys[i];
            let other_key = other.keys[j];
            if key == other_key {
                result.push_bucket(key, self.buckets[i].union(&other.buckets[j]));
                i += 1;
                j += 1;
            } else if key < other_key {
                result.push_bucket(key, self.buckets[i].clone());
                i += 1;
            } else {
                result.push_bucket(other_key, other.buckets[j].clone());
                j += 1;
            }
        }
        while i < self.keys.len() {
            result.push_bucket(self.keys[i], self.buckets[i].clone());
            i += 1;
        }
        while j < other.keys.len() {
            result.push_bucket(other.keys[j], other.buckets[j].clone());
            j += 1;
        }
        result
    }

    /// Sequential pairwise difference.
    pub fn and_not(&self, other: &Bitmap) -> Bitmap {
        let mut result = Bitmap::new();
        let mut i = 0;
        let mut j = 0;
        while i < self.keys.len() {
            let key = self.keys[i];
            if j == other.keys.len() || key < other.keys[j] {
                result.push_bucket(key, self.buckets[i].clone());
                i += 1;
            } else if key == other.keys[j] {
                let bucket = self.buckets[i].and_not(&other.buckets[j]);
                if bucket.cardinality() > 0 {
                    result.push_bucket(key, bucket);
                }
                i += 1;
                j += 1;
            } else {
                j = other.advance_until(key, j);
            }
        }
        result
    }
}

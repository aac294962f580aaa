//! Compressed bitmaps over `u32` values with parallel Boolean aggregation.
//!
//! A [`Bitmap`] stores a sorted `u32` set partitioned by the high 16 bits of
//! each value: every partition key maps to a [`Bucket`] holding the low 16
//! bits in whichever encoding fits best (sorted array, bit block, or run
//! list). Pairwise `and`/`or`/`and_not` operate on bitmaps directly; the
//! [`parallel`] module aggregates many bitmaps at once by merging their key
//! sequences and folding each key group on a worker pool.

pub mod bit_block;
pub mod bitmap;
pub mod bucket;
pub mod parallel;
#[cfg(test)]
mod tests;

pub use bitmap::Bitmap;
pub use bucket::Bucket;

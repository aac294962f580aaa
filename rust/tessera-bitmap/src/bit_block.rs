//! A fixed-span array of bits backing the dense bucket encoding.

/// Number of positions covered by one block (the full bucket span).
pub const BLOCK_SPAN: usize = 1 << 16;

/// Number of `u64` words backing one block.
const BLOCK_WORDS: usize = BLOCK_SPAN / 64;

/// A fixed 65536-bit array with `[u64]` storage.
///
/// Bits are stored in LSB order: bit 0 is the least significant bit of word 0,
/// bit 64 is the LSB of word 1, and so on. The span is exactly `BLOCK_SPAN`,
/// so every word is interior and no tail masking is needed.
#[derive(Clone, PartialEq, Eq)]
pub struct BitBlock {
    words: Box<[u64; BLOCK_WORDS]>,
}

impl BitBlock {
    /// Creates a block with all bits reset.
    pub fn empty() -> BitBlock {
        BitBlock {
            words: Box::new([0; BLOCK_WORDS]),
        }
    }

    /// Creates a block with all bits set.
    pub fn full() -> BitBlock {
        BitBlock {
            words: Box::new([u64::MAX; BLOCK_WORDS]),
        }
    }

    #[inline]
    pub fn set(&mut self, pos: u16) {
        self.words[(pos >> 6) as usize] |= 1u64 << (pos & 63);
    }

    #[inline]
    pub fn contains(&self, pos: u16) -> bool {
        self.words[(pos >> 6) as usize] & (1u64 << (pos & 63)) != 0
    }

    /// Sets all bits in the inclusive run `[first, last]`.
    pub fn set_run(&mut self, first: u16, last: u16) {
        debug_assert!(first <= last);
        let first_word = (first >> 6) as usize;
        let last_word = (last >> 6) as usize;
        let lead = u64::MAX << (first & 63);
        let trail = u64::MAX >> (63 - (last & 63));
        if first_word == last_word {
            self.words[first_word] |= lead & trail;
        } else {
            self.words[first_word] |= lead;
            for word in &mut self.words[first_word + 1..last_word] {
                *word = u64::MAX;
            }
            self.words[last_word] |= trail;
        }
    }

    /// Counts the set bits.
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|word| word.count_ones() as usize).sum()
    }

    pub fn or_with(&mut self, other: &BitBlock) {
        for (word, other_word) in self.words.iter_mut().zip(other.words.iter()) {
            *word |= other_word;
        }
    }

    pub fn and_with(&mut self, other: &BitBlock) {
        for (word, other_word) in self.words.iter_mut().zip(other.words.iter()) {
            *word &= other_word;
        }
    }

    pub fn and_not_with(&mut self, other: &BitBlock) {
        for (word, other_word) in self.words.iter_mut().zip(other.words.iter()) {
            *word &= !other_word;
        }
    }

    /// Returns an iterator over the set positions in ascending order.
    pub fn iter(&self) -> BitBlockIter<'_> {
        BitBlockIter {
            words: &self.words,
            word_index: 0,
            current: self.words[0],
        }
    }
}

impl std::fmt::Debug for BitBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitBlock")
            .field("count_ones", &self.count_ones())
            .finish()
    }
}

/// Word-walking iterator over the set positions of a [`BitBlock`].
pub struct BitBlockIter<'a> {
    words: &'a [u64; BLOCK_WORDS],
    word_index: usize,
    current: u64,
}

impl Iterator for BitBlockIter<'_> {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        while self.current == 0 {
            self.word_index += 1;
            if self.word_index == BLOCK_WORDS {
                return None;
            }
            self.current = self.words[self.word_index];
        }
        let bit = self.current.trailing_zeros() as usize;
        self.current &= self.current - 1;
        Some(((self.word_index << 6) | bit) as u16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_contains() {
        let mut block = BitBlock::empty();
        assert!(!block.contains(0));
        block.set(0);
        block.set(63);
        block.set(64);
        block.set(u16::MAX);
        assert!(block.contains(0));
        assert!(block.contains(63));
        assert!(block.contains(64));
        assert!(block.contains(u16::MAX));
        assert!(!block.contains(1));
        assert_eq!(block.count_ones(), 4);
    }

    #[test]
    fn test_full_block() {
        let block = BitBlock::full();
        assert_eq!(block.count_ones(), BLOCK_SPAN);
        assert!(block.contains(0));
        assert!(block.contains(u16::MAX));
    }

    #[test]
    fn test_set_run_within_one_word() {
        let mut block = BitBlock::empty();
        block.set_run(3, 10);
        assert_eq!(block.count_ones(), 8);
        assert!(!block.contains(2));
        assert!(block.contains(3));
        assert!(block.contains(10));
        assert!(!block.contains(11));
    }

    #[test]
    fn test_set_run_across_words() {
        let mut block = BitBlock::empty();
        block.set_run(60, 200);
        assert_eq!(block.count_ones(), 141);
        assert!(!block.contains(59));
        assert!(block.contains(60));
        assert!(block.contains(127));
        assert!(block.contains(128));
        assert!(block.contains(200));
        assert!(!block.contains(201));
    }

    #[test]
    fn test_set_run_full_span() {
        let mut block = BitBlock::empty();
        block.set_run(0, u16::MAX);
        assert_eq!(block, BitBlock::full());
    }

    #[test]
    fn test_iter_matches_reference() {
        let mut block = BitBlock::empty();
        let mut reference = Vec::new();
        fastrand::seed(83561294);
        for _ in 0..500 {
            let pos = fastrand::u16(..);
            if !block.contains(pos) {
                reference.push(pos);
            }
            block.set(pos);
        }
        reference.sort_unstable();
        assert_eq!(block.iter().collect::<Vec<_>>(), reference);
    }

    #[test]
    fn test_word_ops_match_reference() {
        fastrand::seed(2751082396);
        let left: Vec<u16> = (0..300).map(|_| fastrand::u16(..)).collect();
        let right: Vec<u16> = (0..300).map(|_| fastrand::u16(..)).collect();

        let mut a = BitBlock::empty();
        let mut b = BitBlock::empty();
        left.iter().for_each(|&pos| a.set(pos));
        right.iter().for_each(|&pos| b.set(pos));

        let mut union = a.clone();
        union.or_with(&b);
        let mut intersection = a.clone();
        intersection.and_with(&b);
        let mut difference = a.clone();
        difference.and_not_with(&b);

        for pos in 0..=u16::MAX {
            assert_eq!(union.contains(pos), a.contains(pos) || b.contains(pos));
            assert_eq!(intersection.contains(pos), a.contains(pos) && b.contains(pos));
            assert_eq!(difference.contains(pos), a.contains(pos) && !b.contains(pos));
        }
    }
}

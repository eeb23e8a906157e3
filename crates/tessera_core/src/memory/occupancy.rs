//! # Occupancy Bit-Set
//!
//! One bit per slot: 1 = occupied, 0 = free. 64 slots per word.

/// Fixed length bit-set tracking which slots of a pool hold a live entity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Occupancy {
    /// Bit words, lowest slot in the lowest bit of word 0.
    bits: Vec<u64>,
    /// Number of tracked slots.
    len: usize,
    /// Cached number of set bits.
    count: usize,
}

impl Occupancy {
    /// Creates a bit-set with every slot free.
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            bits: vec![0u64; len.div_ceil(64)],
            len,
            count: 0,
        }
    }

    /// Number of tracked slots.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Checks if the set tracks no slots at all.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of occupied slots.
    #[inline]
    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }

    /// Checks if a slot is occupied. Out of range slots read as free.
    #[inline]
    #[must_use]
    pub fn contains(&self, slot: usize) -> bool {
        if slot >= self.len {
            return false;
        }
        (self.bits[slot / 64] >> (slot % 64)) & 1 == 1
    }

    /// Sets a slot's bit. Returns `false` if it was already set or is out of range.
    #[inline]
    pub fn insert(&mut self, slot: usize) -> bool {
        if slot >= self.len {
            return false;
        }
        let mask = 1u64 << (slot % 64);
        let word = &mut self.bits[slot / 64];
        if *word & mask != 0 {
            return false;
        }
        *word |= mask;
        self.count += 1;
        true
    }

    /// Clears a slot's bit. Returns `false` if it was already clear or is out of range.
    #[inline]
    pub fn remove(&mut self, slot: usize) -> bool {
        if slot >= self.len {
            return false;
        }
        let mask = 1u64 << (slot % 64);
        let word = &mut self.bits[slot / 64];
        if *word & mask == 0 {
            return false;
        }
        *word &= !mask;
        self.count -= 1;
        true
    }

    /// Finds the lowest free slot at or above `from`.
    ///
    /// Skips full words with a single comparison each.
    #[must_use]
    pub fn first_free(&self, from: usize) -> Option<usize> {
        if from >= self.len {
            return None;
        }
        let mut word_idx = from / 64;
        // Treat bits below `from` as occupied in the first word
        let mut word = self.bits[word_idx] | ((1u64 << (from % 64)) - 1);
        loop {
            if word != u64::MAX {
                let slot = word_idx * 64 + (!word).trailing_zeros() as usize;
                return (slot < self.len).then_some(slot);
            }
            word_idx += 1;
            if word_idx >= self.bits.len() {
                return None;
            }
            word = self.bits[word_idx];
        }
    }

    /// Clears every bit.
    pub fn clear(&mut self) {
        for word in &mut self.bits {
            *word = 0;
        }
        self.count = 0;
    }

    /// Iterates over occupied slots in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits.iter().enumerate().flat_map(|(word_idx, &word)| {
            let mut rest = word;
            std::iter::from_fn(move || {
                if rest == 0 {
                    return None;
                }
                let bit = rest.trailing_zeros() as usize;
                rest &= rest - 1;
                Some(word_idx * 64 + bit)
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_remove() {
        let mut occ = Occupancy::new(130);
        assert!(occ.insert(0));
        assert!(occ.insert(129));
        assert!(!occ.insert(129));
        assert_eq!(occ.count(), 2);
        assert!(occ.contains(129));

        assert!(occ.remove(0));
        assert!(!occ.remove(0));
        assert!(!occ.remove(500));
        assert_eq!(occ.count(), 1);
    }

    #[test]
    fn test_first_free_skips_full_words() {
        let mut occ = Occupancy::new(200);
        for slot in 0..130 {
            occ.insert(slot);
        }
        assert_eq!(occ.first_free(0), Some(130));
        occ.remove(7);
        assert_eq!(occ.first_free(0), Some(7));
        assert_eq!(occ.first_free(8), Some(130));
    }

    #[test]
    fn test_first_free_respects_len() {
        let mut occ = Occupancy::new(3);
        occ.insert(0);
        occ.insert(1);
        occ.insert(2);
        assert_eq!(occ.first_free(0), None);
    }

    #[test]
    fn test_iter_ascending() {
        let mut occ = Occupancy::new(300);
        for slot in [299, 3, 64, 65] {
            occ.insert(slot);
        }
        assert_eq!(occ.iter().collect::<Vec<_>>(), vec![3, 64, 65, 299]);
    }
}

use std::fmt;

const WORD_BITS: usize = 64;

/// A growable bit set backed by `u64` words.
///
/// Used for component masks, system masks, and the alive/enabled/dying
/// tracking in the entity manager. Trailing zero words are always trimmed,
/// so two sets holding the same bits compare and hash equal regardless of
/// how they were built. That property is what lets the composition registry
/// key a hash map by `Bits`.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Bits {
    words: Vec<u64>,
}

impl Bits {
    /// Creates an empty bit set.
    pub fn new() -> Self {
        Self { words: Vec::new() }
    }

    /// Creates a bit set from a list of bit indices.
    pub fn from_indices(indices: impl IntoIterator<Item = usize>) -> Self {
        let mut bits = Self::new();
        for index in indices {
            bits.insert(index);
        }
        bits
    }

    /// Sets the bit at `index`. Returns `true` if it was not set before.
    pub fn insert(&mut self, index: usize) -> bool {
        let word = index / WORD_BITS;
        let mask = 1u64 << (index % WORD_BITS);
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        let was_set = self.words[word] & mask != 0;
        self.words[word] |= mask;
        !was_set
    }

    /// Clears the bit at `index`. Returns `true` if it was set before.
    pub fn remove(&mut self, index: usize) -> bool {
        let word = index / WORD_BITS;
        let mask = 1u64 << (index % WORD_BITS);
        match self.words.get_mut(word) {
            Some(w) if *w & mask != 0 => {
                *w &= !mask;
                self.trim();
                true
            }
            _ => false,
        }
    }

    /// Returns true if the bit at `index` is set.
    pub fn contains(&self, index: usize) -> bool {
        self.words
            .get(index / WORD_BITS)
            .is_some_and(|w| w & (1u64 << (index % WORD_BITS)) != 0)
    }

    /// Returns true if no bit is set.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Number of set bits.
    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Clears every bit, keeping the allocation.
    pub fn clear(&mut self) {
        self.words.clear();
    }

    /// Returns true if every bit of `self` is also set in `other`.
    pub fn is_subset(&self, other: &Bits) -> bool {
        self.words.iter().enumerate().all(|(i, w)| {
            let o = other.words.get(i).copied().unwrap_or(0);
            w & o == *w
        })
    }

    /// Returns true if `self` and `other` share at least one bit.
    pub fn intersects(&self, other: &Bits) -> bool {
        self.words
            .iter()
            .zip(other.words.iter())
            .any(|(a, b)| a & b != 0)
    }

    /// Iterates the indices of set bits in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &word)| {
            let mut rest = word;
            std::iter::from_fn(move || {
                if rest == 0 {
                    return None;
                }
                let bit = rest.trailing_zeros() as usize;
                rest &= rest - 1;
                Some(i * WORD_BITS + bit)
            })
        })
    }

    fn trim(&mut self) {
        while self.words.last() == Some(&0) {
            self.words.pop();
        }
    }
}

impl fmt::Debug for Bits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl fmt::Display for Bits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|i| i.to_string()).collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

impl FromIterator<usize> for Bits {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self::from_indices(iter)
    }
}

//! Growable bit vectors indexed by variable slot address.

use std::fmt;

const WORD: usize = u64::BITS as usize;

#[derive(Clone, Default, PartialEq, Eq)]
pub struct Bits {
    words: Vec<u64>,
}

impl Bits {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure(&mut self, bit: usize) {
        let len = bit / WORD + 1;
        if self.words.len() < len {
            self.words.resize(len, 0);
        }
    }

    pub fn incl(&mut self, bit: usize) {
        self.ensure(bit);
        self.words[bit / WORD] |= 1 << (bit % WORD);
    }

    pub fn excl(&mut self, bit: usize) {
        if let Some(word) = self.words.get_mut(bit / WORD) {
            *word &= !(1 << (bit % WORD));
        }
    }

    #[must_use]
    pub fn is_member(&self, bit: usize) -> bool {
        self.words
            .get(bit / WORD)
            .map_or(false, |word| word & (1 << (bit % WORD)) != 0)
    }

    /// Sets every bit in `start..limit`.
    pub fn incl_range(&mut self, start: usize, limit: usize) {
        for bit in start..limit {
            self.incl(bit);
        }
    }

    /// Clears every bit from `start` on.
    pub fn exclude_from(&mut self, start: usize) {
        let first = start / WORD;
        if first >= self.words.len() {
            return;
        }
        self.words[first] &= (1u64 << (start % WORD)).wrapping_sub(1);
        for word in &mut self.words[first + 1..] {
            *word = 0;
        }
    }

    pub fn and_set(&mut self, other: &Bits) -> &mut Self {
        for (i, word) in self.words.iter_mut().enumerate() {
            *word &= other.words.get(i).copied().unwrap_or(0);
        }
        self
    }

    pub fn or_set(&mut self, other: &Bits) -> &mut Self {
        if self.words.len() < other.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        for (word, o) in self.words.iter_mut().zip(&other.words) {
            *word |= o;
        }
        self
    }

    /// Removes every member of `other`.
    pub fn diff_set(&mut self, other: &Bits) -> &mut Self {
        for (word, o) in self.words.iter_mut().zip(&other.words) {
            *word &= !o;
        }
        self
    }

    /// `self & other` as a new vector.
    #[must_use]
    pub fn and(&self, other: &Bits) -> Bits {
        let mut out = self.clone();
        out.and_set(other);
        out
    }

    /// The first member at or after `from`.
    #[must_use]
    pub fn next_bit(&self, from: usize) -> Option<usize> {
        let mut idx = from / WORD;
        let mut word = *self.words.get(idx)? & (!0u64 << (from % WORD));
        loop {
            if word != 0 {
                return Some(idx * WORD + word.trailing_zeros() as usize);
            }
            idx += 1;
            word = *self.words.get(idx)?;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        let mut next = self.next_bit(0);
        std::iter::from_fn(move || {
            let bit = next?;
            next = self.next_bit(bit + 1);
            Some(bit)
        })
    }
}

impl fmt::Debug for Bits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

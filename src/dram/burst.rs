//! Data Bursts.
//!
//! A burst is the unit of data moved by one READ or WRITE command: up to 32
//! 32-bit words, each with a 4-bit byte mask. Bit `i` of a mask selects byte
//! `i` of the word in little-endian memory order; `0xF` writes the whole word
//! and `0x0` suppresses it.
//!
//! Bursts are move-only. A write burst is created when a transaction is split
//! into commands, travels inside its `Command`, and is finally handed to the
//! bank; a read burst is created by the bank and handed back to the scheduler.
//! Every construction and destruction is counted per thread so tests can
//! check that no burst leaks.

use std::cell::Cell;
use std::fmt;

/// Maximum number of words a burst can carry.
pub const MAX_BURST_WORDS: usize = 32;

/// Mask value that writes all four bytes of a word.
pub const FULL_MASK: u8 = 0xF;

thread_local! {
    static CREATED: Cell<u64> = const { Cell::new(0) };
    static DESTROYED: Cell<u64> = const { Cell::new(0) };
}

/// Construction and destruction counters for a move-only type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InstanceCounts {
    pub created: u64,
    pub destroyed: u64,
}

impl InstanceCounts {
    /// Instances currently alive.
    pub fn live(&self) -> u64 {
        self.created - self.destroyed
    }
}

/// A fixed-capacity vector of words with per-word byte masks.
pub struct Burst {
    words: [u32; MAX_BURST_WORDS],
    masks: [u8; MAX_BURST_WORDS],
    len: usize,
}

impl Burst {
    /// Creates a zero-filled burst of `len` words with every byte enabled.
    pub fn new(len: usize) -> Self {
        if len == 0 || len > MAX_BURST_WORDS {
            fatal!("Burst", "new", "length {} is out of range (1..={})", len, MAX_BURST_WORDS);
        }
        CREATED.with(|c| c.set(c.get() + 1));
        Self {
            words: [0; MAX_BURST_WORDS],
            masks: [FULL_MASK; MAX_BURST_WORDS],
            len,
        }
    }

    /// Creates a fully enabled burst holding `words`.
    pub fn from_words(words: &[u32]) -> Self {
        let mut burst = Self::new(words.len());
        burst.words[..words.len()].copy_from_slice(words);
        burst
    }

    /// Creates a `len`-word burst and fills it from little-endian `bytes`.
    ///
    /// When `bytes` is shorter than the burst, the bytes it does not cover are
    /// masked out, so applying the burst leaves the destination untouched
    /// there.
    pub fn from_bytes(len: usize, bytes: &[u8]) -> Self {
        let mut burst = Self::new(len);
        burst.set_data(bytes);
        burst
    }

    /// Overwrites the burst contents from little-endian bytes.
    ///
    /// Words wholly covered by `bytes` become fully enabled, a partially
    /// covered word enables only the covered bytes, and uncovered words are
    /// masked out entirely.
    pub fn set_data(&mut self, bytes: &[u8]) {
        if bytes.len() > self.byte_len() {
            fatal!(
                "Burst",
                "set_data",
                "{} bytes do not fit in a {}-word burst",
                bytes.len(),
                self.len
            );
        }
        for i in 0..self.len {
            let start = i * 4;
            let mut word = [0u8; 4];
            let mut mask = 0u8;
            for (b, slot) in word.iter_mut().enumerate() {
                if let Some(&byte) = bytes.get(start + b) {
                    *slot = byte;
                    mask |= 1 << b;
                }
            }
            self.words[i] = u32::from_le_bytes(word);
            self.masks[i] = mask;
        }
    }

    /// Disables every byte whose entry in `enabled` is `false`.
    ///
    /// `enabled` is indexed by byte offset within the burst; bytes beyond its
    /// end keep their current mask.
    pub fn restrict_to_bytes(&mut self, enabled: &[bool]) {
        for (offset, &on) in enabled.iter().enumerate().take(self.byte_len()) {
            if !on {
                self.masks[offset / 4] &= !(1 << (offset % 4));
            }
        }
    }

    /// Number of words.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always `false`; a burst holds at least one word.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of bytes carried (`4 * len`).
    pub fn byte_len(&self) -> usize {
        self.len * 4
    }

    /// The words of the burst.
    pub fn words(&self) -> &[u32] {
        &self.words[..self.len]
    }

    /// The byte masks of the burst, one per word.
    pub fn masks(&self) -> &[u8] {
        &self.masks[..self.len]
    }

    pub fn word(&self, index: usize) -> u32 {
        self.check_index("word", index);
        self.words[index]
    }

    pub fn set_word(&mut self, index: usize, value: u32) {
        self.check_index("set_word", index);
        self.words[index] = value;
    }

    pub fn mask(&self, index: usize) -> u8 {
        self.check_index("mask", index);
        self.masks[index]
    }

    pub fn set_mask(&mut self, index: usize, mask: u8) {
        self.check_index("set_mask", index);
        self.masks[index] = mask & FULL_MASK;
    }

    /// Returns `true` if any byte of the burst is disabled.
    pub fn is_masked(&self) -> bool {
        self.masks().iter().any(|&m| m != FULL_MASK)
    }

    /// Merges the enabled bytes of word `index` into `dest`.
    ///
    /// # Returns
    ///
    /// `dest` with every byte selected by the word's mask replaced.
    pub fn apply(&self, index: usize, dest: u32) -> u32 {
        self.check_index("apply", index);
        let mask = self.masks[index];
        if mask == FULL_MASK {
            return self.words[index];
        }
        let mut bit_mask = 0u32;
        for b in 0..4 {
            if mask & (1 << b) != 0 {
                bit_mask |= 0xFF << (8 * b);
            }
        }
        (dest & !bit_mask) | (self.words[index] & bit_mask)
    }

    /// Serialises the words to little-endian bytes, ignoring masks.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.words().iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    /// Bursts created and destroyed so far on this thread.
    pub fn instances() -> InstanceCounts {
        InstanceCounts {
            created: CREATED.with(Cell::get),
            destroyed: DESTROYED.with(Cell::get),
        }
    }

    fn check_index(&self, operation: &str, index: usize) {
        if index >= self.len {
            fatal!(
                "Burst",
                operation,
                "word index {} out of range for a {}-word burst",
                index,
                self.len
            );
        }
    }
}

impl Drop for Burst {
    fn drop(&mut self) {
        DESTROYED.with(|c| c.set(c.get() + 1));
    }
}

impl fmt::Debug for Burst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Burst")
            .field("words", &self.words())
            .field("masks", &self.masks())
            .finish()
    }
}

impl fmt::Display for Burst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (word, mask)) in self.words().iter().zip(self.masks()).enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            if *mask == FULL_MASK {
                write!(f, "{:08x}", word)?;
            } else {
                write!(f, "{:08x}/{:x}", word, mask)?;
            }
        }
        write!(f, "}}")
    }
}

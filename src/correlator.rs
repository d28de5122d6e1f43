//! Approximate sync-word correlator.
//!
//! The correlator keeps the last 128 line bits in two 64-bit words and, on
//! request, compares that window against every pattern of a
//! [`PatternTable`]. A pattern matches when the number of differing bits
//! (population count of the masked XOR) is within its tolerance.
//!
//! The window layout mirrors [`SyncPatternSpec::pattern`]: `window[0]` holds
//! the newest 64 bits with the newest bit in its LSB, `window[1]` the 64 bits
//! before that.
//!
//! [`SyncPatternSpec::pattern`]: crate::pattern::SyncPatternSpec::pattern

use crate::consts::MAX_SYNC_BITS;
use crate::pattern::PatternTable;

/// Mask selecting the newest `length_bits` bits of a window.
pub(crate) const fn window_mask(length_bits: u8) -> [u64; 2] {
    match length_bits {
        0 => [0, 0],
        1..=63 => [(1u64 << length_bits) - 1, 0],
        64 => [u64::MAX, 0],
        65..=127 => [u64::MAX, (1u64 << (length_bits - 64)) - 1],
        _ => [u64::MAX, u64::MAX],
    }
}

/// A sync word prepared for matching: bits above its length are masked off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SyncWord {
    bits: [u64; 2],
    mask: [u64; 2],
    pub(crate) length_bits: u8,
    pub(crate) max_distance: u8,
}

impl SyncWord {
    pub(crate) const fn new(pattern: [u64; 2], length_bits: u8, max_distance: u8) -> Self {
        let mask = window_mask(length_bits);
        Self {
            bits: [pattern[0] & mask[0], pattern[1] & mask[1]],
            mask,
            length_bits,
            max_distance,
        }
    }

    /// Hamming distance between this word and the newest bits of `window`.
    pub(crate) fn distance(&self, window: &[u64; 2]) -> u32 {
        ((window[0] ^ self.bits[0]) & self.mask[0]).count_ones()
            + ((window[1] ^ self.bits[1]) & self.mask[1]).count_ones()
    }
}

/// Outcome of a successful correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncMatch {
    /// Table position of the matching pattern.
    pub index: usize,
    /// Number of bit errors in the sync word.
    pub distance: u8,
}

/// Rolling 128-bit window with a table-driven matcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Correlator {
    window: [u64; 2],
    /// Bits shifted in since the last reset, saturating at the window width.
    fill: u8,
}

impl Correlator {
    /// Creates a correlator with an empty (all-zero) window.
    pub const fn new() -> Self {
        Self {
            window: [0, 0],
            fill: 0,
        }
    }

    /// Shifts `bit` in as the newest bit; the oldest bit falls off.
    pub fn shift(&mut self, bit: bool) {
        self.window[1] = (self.window[1] << 1) | (self.window[0] >> 63);
        self.window[0] = (self.window[0] << 1) | u64::from(bit);
        if self.fill < MAX_SYNC_BITS {
            self.fill += 1;
        }
    }

    /// Returns the first pattern in table order that matches the window.
    ///
    /// Patterns longer than the number of bits seen since the last reset are
    /// skipped, so a freshly zeroed window never matches an all-zero word.
    pub fn find(&self, table: &PatternTable<'_>) -> Option<SyncMatch> {
        for (index, entry) in table.entries().iter().enumerate() {
            let word = &entry.word;
            if word.length_bits > self.fill {
                continue;
            }
            let distance = word.distance(&self.window);
            if distance <= u32::from(word.max_distance) {
                return Some(SyncMatch {
                    index,
                    distance: distance as u8,
                });
            }
        }
        None
    }

    /// The current window, newest bits in `window()[0]`.
    pub fn window(&self) -> [u64; 2] {
        self.window
    }

    /// Clears the window.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

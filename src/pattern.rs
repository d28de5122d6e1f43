//! Sync pattern descriptors and the validated pattern table.
//!
//! A [`SyncPatternSpec`] describes one protocol: the sync word to look for,
//! how many bit errors to tolerate, and how to extract the payload that
//! follows it. A [`PatternTable`] is an ordered, fully validated set of
//! these; table order decides which pattern wins when several match the
//! same window.
//!
//! ## Bit order of `pattern`
//!
//! `pattern[0]` holds the most recently received 64 bits, with its LSB
//! being the last bit of the sync word on air. `pattern[1]` holds the
//! 64 bits before that. A sync word written the usual way (first bit on air
//! as the MSB) of up to 64 bits therefore goes straight into `pattern[0]`:
//!
//! ```rust
//! use sondesync::pattern::{DataMode, SyncPatternSpec};
//!
//! // 16-bit sync word 0x2dd4, first bit on air is the MSB.
//! let spec = SyncPatternSpec::new(7, [0x2dd4, 0], 16, DataMode::Raw, 32);
//! assert_eq!(spec.pattern[0], 0x2dd4);
//! ```

use core::fmt;

use heapless::Vec;

use crate::consts::{IPC_DATA_SIZE, MAX_SYNC_BITS, MAX_SYNC_PATTERNS};
use crate::correlator::SyncWord;
use crate::error::ConfigError;
use crate::finisher::FrameFinisher;

/// Payload decoding mode entered after a sync match.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum DataMode {
    /// Line bits packed MSB first.
    #[default]
    Raw,
    /// Asynchronous serial framing: start bit, 8 data bits LSB first, stop bit.
    Uart8n1,
    /// Two half-bits per bit; a mid-bit level change is a `1`.
    BiphaseS,
}

/// Descriptor for one sync pattern and the frame following it.
#[derive(Clone, Copy, Default)]
pub struct SyncPatternSpec<'a> {
    /// Reported as the frame opcode on match.
    pub id: u8,
    /// The sync word, see the module docs for bit order.
    pub pattern: [u64; 2],
    /// Length of the sync word in bits (1..=128).
    pub length_bits: u8,
    /// Maximum number of differing bits still accepted as a match.
    pub max_hamming_distance: u8,
    /// Payload bits to read after the sync word (data bits only for UART).
    pub frame_length_bits: u16,
    /// Byte offset in the slot for the first payload byte.
    pub start_offset: u16,
    /// Decoding mode for the payload.
    pub data_state: DataMode,
    /// Flip the bit sense of the payload.
    pub inverted: bool,
    /// Runs on the finished frame before it is published.
    pub post_process: Option<&'a dyn FrameFinisher>,
    /// Payload bits per sub-block, 0 to disable sub-blocking.
    pub sub_block_bits: u16,
    /// Bytes reserved per sub-block in the slot.
    pub sub_block_bytes: u16,
}

impl<'a> SyncPatternSpec<'a> {
    /// Creates an exact-match pattern writing its payload from offset 0.
    pub const fn new(
        id: u8,
        pattern: [u64; 2],
        length_bits: u8,
        data_state: DataMode,
        frame_length_bits: u16,
    ) -> Self {
        Self {
            id,
            pattern,
            length_bits,
            max_hamming_distance: 0,
            frame_length_bits,
            start_offset: 0,
            data_state,
            inverted: false,
            post_process: None,
            sub_block_bits: 0,
            sub_block_bytes: 0,
        }
    }

    /// Accepts up to `max` bit errors in the sync word.
    pub const fn with_tolerance(mut self, max: u8) -> Self {
        self.max_hamming_distance = max;
        self
    }

    /// Writes the first payload byte at `offset`.
    pub const fn with_start_offset(mut self, offset: u16) -> Self {
        self.start_offset = offset;
        self
    }

    /// Flips the payload bit sense.
    pub const fn with_inverted(mut self, inverted: bool) -> Self {
        self.inverted = inverted;
        self
    }

    /// Splits the payload into `bits`-sized sub-blocks, each aligned to a
    /// fresh byte in the slot.
    pub const fn with_sub_blocks(mut self, bits: u16) -> Self {
        self.sub_block_bits = bits;
        self.sub_block_bytes = bits.div_ceil(8);
        self
    }

    /// Attaches a finisher.
    pub const fn with_finisher(mut self, finisher: &'a dyn FrameFinisher) -> Self {
        self.post_process = Some(finisher);
        self
    }

    /// Number of slot bytes the payload occupies, starting at `start_offset`.
    pub fn footprint_bytes(&self) -> usize {
        let frame = usize::from(self.frame_length_bits);
        if self.sub_block_bits == 0 {
            return frame.div_ceil(8);
        }
        let sub = usize::from(self.sub_block_bits);
        (frame / sub) * usize::from(self.sub_block_bytes) + (frame % sub).div_ceil(8)
    }

    pub(crate) fn validate(&self, index: usize) -> Result<(), ConfigError> {
        let id = self.id;
        if self.length_bits == 0 || self.length_bits > MAX_SYNC_BITS {
            return Err(ConfigError::SyncLength {
                index,
                id,
                length_bits: self.length_bits,
            });
        }
        if self.max_hamming_distance >= self.length_bits {
            return Err(ConfigError::Tolerance {
                index,
                id,
                length_bits: self.length_bits,
                max_hamming_distance: self.max_hamming_distance,
            });
        }
        if self.frame_length_bits == 0 {
            return Err(ConfigError::EmptyFrame { index, id });
        }
        if self.sub_block_bits > 0 {
            let expected = self.sub_block_bits.div_ceil(8);
            if self.sub_block_bytes != expected {
                return Err(ConfigError::SubBlockSize {
                    index,
                    id,
                    sub_block_bits: self.sub_block_bits,
                    sub_block_bytes: self.sub_block_bytes,
                    expected,
                });
            }
            if self.data_state == DataMode::Uart8n1 && self.sub_block_bits % 8 != 0 {
                return Err(ConfigError::UnalignedUartSubBlock {
                    index,
                    id,
                    sub_block_bits: self.sub_block_bits,
                });
            }
        }
        let end = usize::from(self.start_offset) + self.footprint_bytes();
        if end > IPC_DATA_SIZE {
            return Err(ConfigError::FrameOverflow {
                index,
                id,
                end,
                capacity: IPC_DATA_SIZE,
            });
        }
        Ok(())
    }
}

impl fmt::Debug for SyncPatternSpec<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncPatternSpec")
            .field("id", &self.id)
            .field("pattern", &self.pattern)
            .field("length_bits", &self.length_bits)
            .field("max_hamming_distance", &self.max_hamming_distance)
            .field("frame_length_bits", &self.frame_length_bits)
            .field("start_offset", &self.start_offset)
            .field("data_state", &self.data_state)
            .field("inverted", &self.inverted)
            .field("post_process", &self.post_process.is_some())
            .field("sub_block_bits", &self.sub_block_bits)
            .field("sub_block_bytes", &self.sub_block_bytes)
            .finish()
    }
}

/// A validated pattern together with its precomputed correlator masks.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PatternEntry<'a> {
    pub(crate) spec: SyncPatternSpec<'a>,
    pub(crate) word: SyncWord,
}

/// Ordered set of validated sync patterns.
///
/// A table is only ever built whole: [`PatternTable::from_specs`] either
/// accepts every entry or returns the first violation.
#[derive(Debug, Default)]
pub struct PatternTable<'a> {
    entries: Vec<PatternEntry<'a>, MAX_SYNC_PATTERNS>,
}

impl<'a> PatternTable<'a> {
    /// An empty table. An engine with an empty table hunts forever.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Validates `specs` and builds a table in the same order.
    pub fn from_specs(specs: &[SyncPatternSpec<'a>]) -> Result<Self, ConfigError> {
        if specs.len() > MAX_SYNC_PATTERNS {
            return Err(ConfigError::TooManyPatterns {
                count: specs.len(),
                capacity: MAX_SYNC_PATTERNS,
            });
        }
        let mut entries = Vec::new();
        for (index, spec) in specs.iter().enumerate() {
            spec.validate(index)?;
            let entry = PatternEntry {
                spec: *spec,
                word: SyncWord::new(spec.pattern, spec.length_bits, spec.max_hamming_distance),
            };
            entries
                .push(entry)
                .map_err(|_| ConfigError::TooManyPatterns {
                    count: specs.len(),
                    capacity: MAX_SYNC_PATTERNS,
                })?;
        }
        Ok(Self { entries })
    }

    /// Number of installed patterns.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no pattern is installed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The pattern at table position `index`.
    pub fn get(&self, index: usize) -> Option<&SyncPatternSpec<'a>> {
        self.entries.get(index).map(|e| &e.spec)
    }

    /// Iterates over the patterns in table order.
    pub fn iter(&self) -> impl Iterator<Item = &SyncPatternSpec<'a>> {
        self.entries.iter().map(|e| &e.spec)
    }

    pub(crate) fn entries(&self) -> &[PatternEntry<'a>] {
        &self.entries
    }
}

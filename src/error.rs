//! Configuration errors.
//!
//! The run-time path has no error type: a missing sync match is the normal
//! hunting state, UART framing violations are counted, and pool overwrites
//! are accepted loss. Everything that can be rejected is rejected when a
//! pattern table is installed.

use thiserror::Error;

/// Reasons for rejecting a sync pattern table.
///
/// `index` is the position of the offending entry in the slice handed to
/// [`SyncEngine::configure`](crate::engine::SyncEngine::configure), `id` its
/// pattern id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum ConfigError {
    /// More entries than the fixed-capacity table can hold.
    #[error("{count} sync patterns exceed the table capacity of {capacity}")]
    TooManyPatterns {
        /// Number of entries supplied.
        count: usize,
        /// Table capacity.
        capacity: usize,
    },
    /// Sync length is zero or wider than the correlator window.
    #[error("pattern #{index} (id {id}): sync length of {length_bits} bits is outside 1..=128")]
    SyncLength {
        /// Entry position.
        index: usize,
        /// Pattern id.
        id: u8,
        /// Configured sync length.
        length_bits: u8,
    },
    /// Tolerance so wide that every window would match.
    ///
    /// This is a restriction of this crate rather than of the pattern
    /// format: `max_hamming_distance` must stay below `length_bits`, so the
    /// widest accepted tolerance is `length_bits - 1`.
    #[error("pattern #{index} (id {id}): tolerance of {max_hamming_distance} bits admits any {length_bits}-bit window")]
    Tolerance {
        /// Entry position.
        index: usize,
        /// Pattern id.
        id: u8,
        /// Configured sync length.
        length_bits: u8,
        /// Configured tolerance.
        max_hamming_distance: u8,
    },
    /// A frame of zero payload bits.
    #[error("pattern #{index} (id {id}): frame length is zero")]
    EmptyFrame {
        /// Entry position.
        index: usize,
        /// Pattern id.
        id: u8,
    },
    /// Sub-block byte size does not match the sub-block bit size.
    #[error("pattern #{index} (id {id}): {sub_block_bits}-bit sub-blocks need {expected} bytes, got {sub_block_bytes}")]
    SubBlockSize {
        /// Entry position.
        index: usize,
        /// Pattern id.
        id: u8,
        /// Configured sub-block size in bits.
        sub_block_bits: u16,
        /// Configured sub-block size in bytes.
        sub_block_bytes: u16,
        /// `ceil(sub_block_bits / 8)`.
        expected: u16,
    },
    /// UART framing emits whole bytes, so sub-blocks must be whole bytes too.
    #[error("pattern #{index} (id {id}): UART sub-blocks of {sub_block_bits} bits are not byte aligned")]
    UnalignedUartSubBlock {
        /// Entry position.
        index: usize,
        /// Pattern id.
        id: u8,
        /// Configured sub-block size in bits.
        sub_block_bits: u16,
    },
    /// The frame would be written past the end of a slot.
    #[error("pattern #{index} (id {id}): frame ends at byte {end}, slots hold {capacity}")]
    FrameOverflow {
        /// Entry position.
        index: usize,
        /// Pattern id.
        id: u8,
        /// One past the last byte the frame writes.
        end: usize,
        /// Slot payload capacity.
        capacity: usize,
    },
    /// The hosted global engine has not been set up yet.
    #[error("sync engine has not been opened")]
    NotOpen,
}

//! Constants shared by the synchronizer and the frame handoff pool.
//!
//! The slot geometry ([`IPC_DATA_SIZE`], [`IPC_NUM_BUFFERS`]) is part of the
//! contract with the consuming processor: both sides of the shared-memory
//! handoff must be built with the same values.
//!
//! ## Key Concepts
//!
//! - **Sync width**: the rolling correlator window is two 64-bit words, so no
//!   sync pattern can be longer than [`MAX_SYNC_BITS`].
//! - **Table capacity**: the pattern table is a fixed-capacity vector, so
//!   `configure()` rejects more than [`MAX_SYNC_PATTERNS`] entries instead of
//!   growing at run time.

/// Size (in bytes) of the payload area of each handoff slot.
pub const IPC_DATA_SIZE: usize = 1024;

/// Number of frame slots in the handoff pool.
///
/// Slots are reused round-robin; a consumer that falls more than this many
/// frames behind loses the oldest unread frame.
pub const IPC_NUM_BUFFERS: usize = 4;

/// Width (in bits) of the rolling correlator window.
pub const MAX_SYNC_BITS: u8 = 128;

/// Maximum number of sync patterns a table can hold.
pub const MAX_SYNC_PATTERNS: usize = 8;

//! # sondesync
//!
//! A portable, no_std bit synchronizer and frame extractor for radiosonde
//! receivers.
//!
//! The crate sits between a demodulator producing one line bit per bit
//! period and the protocol decoders consuming whole frames:
//! - a 128-bit correlator finds sync words with a configurable number of
//!   tolerated bit errors, several protocols at once
//! - per pattern payload extraction: raw bits, UART 8N1 characters or
//!   biphase-S cells, with optional sub-block alignment
//! - an optional finishing step per pattern (CRC check, descrambling) runs
//!   before a frame leaves the receive path
//! - finished frames are handed over through a fixed pool of four
//!   1024-byte slots that never blocks the producer
//!
//! ## Crate features
//! | Feature               | Description |
//! |-----------------------|-------------|
//! | `std`                 | Disables `#![no_std]` support |
//! | `delay-loop`          | Blocking pin sampler built on `embedded_hal::delay::DelayNs` |
//! | `timer-isr` (default) | Engine hosted behind `critical_section::with` for bit clock interrupts |
//! | `defmt-0-3`           | Uses `defmt` logging |
//! | `log`                 | Uses `log` logging |
//!
//! ## Usage
//!
//! ```rust
//! use sondesync::engine::SyncEngine;
//! use sondesync::pattern::{DataMode, SyncPatternSpec};
//! use sondesync::pool::{BufferPool, FrameRecord};
//!
//! let mut pool = BufferPool::new();
//! let (producer, mut consumer) = pool.split();
//!
//! let mut engine = SyncEngine::open(producer);
//! engine
//!     .configure(&[
//!         // 32-bit sync word with up to 2 bit errors, 64 raw payload bits.
//!         SyncPatternSpec::new(1, [0x1acf_fc1d, 0], 32, DataMode::Raw, 64).with_tolerance(2),
//!         // 16-bit sync word, 40 bytes of UART payload.
//!         SyncPatternSpec::new(2, [0x2dd4, 0], 16, DataMode::Uart8n1, 320),
//!     ])
//!     .unwrap();
//!
//! // Producer side, once per bit period:
//! # let (bit, now) = (false, 0);
//! engine.feed_bit(bit, now);
//!
//! // Consumer side, whenever convenient:
//! let mut frame = FrameRecord::new();
//! if consumer.read(&mut frame).is_ok() {
//!     // frame.opcode tells which pattern matched
//! }
//! ```
//!
//! ## Integration Notes
//!
//! - `feed_bit` must be called once per line bit; biphase patterns need the
//!   line sampled at twice the symbol rate, see [`timer::line_bit_rate`]
//! - `configure` must not race `feed_bit`; with `timer-isr` use
//!   [`timer::global_sync_engine_configure`] which runs in a critical section
//! - the pool drops the oldest unread frame when the consumer falls four
//!   frames behind
//!
//! --
//! Designed for `#![no_std]` use in resource-constrained embedded environments.

#![deny(
    bad_style,
    dead_code,
    improper_ctypes,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    unconditional_recursion,
    unused,
    while_true,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications,
    unused_results
)]
#![cfg_attr(not(feature = "std"), no_std)]

#[macro_use]
mod fmt;

#[cfg(feature = "timer-isr")]
pub use critical_section;

pub use heapless;

pub mod collector;
pub mod consts;
pub mod correlator;
pub(crate) mod crc;
pub mod encoding;
pub mod engine;
pub mod error;
pub mod finisher;
pub mod pattern;
pub mod pool;
pub mod timer;

pub use engine::{SyncEngine, SyncState, SyncStats};
pub use error::ConfigError;
pub use pattern::{DataMode, SyncPatternSpec};
pub use pool::{BufferPool, Consumer, FrameRecord, Producer};

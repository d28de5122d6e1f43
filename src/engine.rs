//! Bit-synchronous receive engine.
//!
//! [`SyncEngine`] sits behind the demodulator and consumes the recovered
//! line one bit at a time. While hunting it correlates the last 128 bits
//! against every installed [`SyncPatternSpec`]; on a match it switches to
//! the pattern's decoding mode, collects the payload into a staging
//! [`FrameRecord`], runs the pattern's finisher and publishes the frame
//! through the [`Producer`] half of a [`BufferPool`].
//!
//! ## Example
//!
//! ```rust
//! use sondesync::engine::{SyncEngine, SyncState};
//! use sondesync::pattern::{DataMode, SyncPatternSpec};
//! use sondesync::pool::{BufferPool, FrameRecord};
//!
//! let mut pool = BufferPool::new();
//! let (producer, mut consumer) = pool.split();
//! let mut engine = SyncEngine::open(producer);
//! engine
//!     .configure(&[SyncPatternSpec::new(1, [0x2dd4, 0], 16, DataMode::Raw, 8)])
//!     .unwrap();
//!
//! // Sync word, then one payload byte, first bit on air is the MSB.
//! let line = (0x2dd4_u32 << 8) | 0x5a;
//! for (now, i) in (0..24).rev().enumerate() {
//!     engine.feed_bit((line >> i) & 1 != 0, now as u32);
//! }
//! assert_eq!(engine.state(), SyncState::Hunt);
//!
//! let mut frame = FrameRecord::new();
//! assert!(consumer.read(&mut frame).is_ok());
//! assert_eq!(frame.opcode, 1);
//! assert_eq!(frame.rx_time, 15);
//! assert_eq!(frame.data[0], 0x5a);
//! ```
//!
//! [`BufferPool`]: crate::pool::BufferPool

use embedded_hal::digital::InputPin;

use crate::collector::{FrameCollector, FrameLayout, Progress};
use crate::correlator::Correlator;
use crate::error::ConfigError;
use crate::pattern::{DataMode, PatternTable, SyncPatternSpec};
use crate::pool::{FrameRecord, Producer};

/// Receive state of a [`SyncEngine`].
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum SyncState {
    /// Correlating every bit against the pattern table.
    #[default]
    Hunt,
    /// Collecting raw payload bits.
    DataRaw,
    /// Collecting UART 8N1 characters.
    DataUart8n1,
    /// Collecting biphase-S half-bits.
    DataBiphaseS,
}

impl From<DataMode> for SyncState {
    fn from(mode: DataMode) -> Self {
        match mode {
            DataMode::Raw => SyncState::DataRaw,
            DataMode::Uart8n1 => SyncState::DataUart8n1,
            DataMode::BiphaseS => SyncState::DataBiphaseS,
        }
    }
}

/// Running counters kept by the engine since it was opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct SyncStats {
    /// Sync words accepted.
    pub sync_matches: u32,
    /// Frames handed to the pool.
    pub frames_published: u32,
    /// UART characters with a bad start or stop bit.
    pub framing_errors: u32,
    /// Published frames that overwrote an unread slot.
    pub overruns: u32,
}

/// Producer-side sync detector and frame extractor.
///
/// The engine is single threaded: [`feed_bit`](Self::feed_bit) and
/// [`configure`](Self::configure) must not run concurrently. When bits are
/// fed from an interrupt, see [`crate::timer`] for the hosted variant.
#[derive(Debug)]
pub struct SyncEngine<'a> {
    table: PatternTable<'a>,
    correlator: Correlator,
    collector: FrameCollector,
    state: SyncState,
    active: Option<usize>,
    staging: FrameRecord,
    producer: Producer<'a>,
    stats: SyncStats,
}

impl<'a> SyncEngine<'a> {
    /// Creates an engine publishing through `producer`.
    ///
    /// The engine starts hunting with an empty register and an empty pattern
    /// table. Every pool slot is marked empty.
    pub fn open(mut producer: Producer<'a>) -> Self {
        producer.reset();
        Self {
            table: PatternTable::new(),
            correlator: Correlator::new(),
            collector: FrameCollector::new(),
            state: SyncState::Hunt,
            active: None,
            staging: FrameRecord::new(),
            producer,
            stats: SyncStats::default(),
        }
    }

    /// Installs a new pattern table, replacing the current one.
    ///
    /// The whole table is validated first. On error nothing changes: the
    /// previous table stays installed and an ongoing frame keeps going. On
    /// success the engine drops any partial frame, clears its register and
    /// goes back to hunting.
    ///
    /// Must not be called while a [`feed_bit`](Self::feed_bit) call is in
    /// flight.
    pub fn configure(&mut self, patterns: &[SyncPatternSpec<'a>]) -> Result<(), ConfigError> {
        let table = match PatternTable::from_specs(patterns) {
            Ok(table) => table,
            Err(err) => {
                warn!("pattern table rejected: {}", err);
                return Err(err);
            }
        };
        info!("installed {} sync patterns", table.len());
        self.table = table;
        self.resync();
        Ok(())
    }

    /// Consumes one line bit sampled at time `now`.
    ///
    /// `now` is any free-running counter; it is stored as the frame's
    /// `rx_time` when this bit completes a sync word.
    ///
    /// # Timing
    /// A hunting bit costs one masked popcount per installed pattern and a
    /// payload bit a few shifts. The bit that completes a frame is the worst
    /// case: it runs the finisher, copies the whole [`FrameRecord`] into a
    /// pool slot and zeroes the staging record (about 1 KiB each), so the
    /// bit period must leave room for two 1 KiB memory passes. The full clear
    /// keeps bytes a finisher wrote outside the payload from leaking into the
    /// next frame.
    pub fn feed_bit(&mut self, bit: bool, now: u32) {
        self.correlator.shift(bit);
        if self.state == SyncState::Hunt {
            if let Some(found) = self.correlator.find(&self.table) {
                debug!(
                    "sync pattern #{} matched with {} bit errors",
                    found.index, found.distance
                );
                self.begin_frame(found.index, now);
            }
            return;
        }
        if self.collector.push(bit, &mut self.staging.data) == Progress::Complete {
            self.finish_frame();
        }
    }

    /// Samples `rx` and feeds the result as one line bit.
    ///
    /// A pin read error is taken as a low line.
    pub fn sample<RX: InputPin>(&mut self, rx: &mut RX, now: u32) {
        let bit = rx.is_high().unwrap_or(false);
        self.feed_bit(bit, now);
    }

    fn begin_frame(&mut self, index: usize, now: u32) {
        let Some(spec) = self.table.get(index) else {
            return;
        };
        self.staging.opcode = spec.id;
        self.staging.param = 0;
        self.staging.rx_time = now;
        self.collector.begin(FrameLayout::from(spec));
        self.state = SyncState::from(spec.data_state);
        self.active = Some(index);
        self.stats.sync_matches = self.stats.sync_matches.wrapping_add(1);
    }

    fn finish_frame(&mut self) {
        let framing_errors = self.collector.framing_errors();
        if self.state == SyncState::DataUart8n1 {
            self.staging.param = framing_errors;
        }
        if let Some(finisher) = self
            .active
            .and_then(|index| self.table.get(index))
            .and_then(|spec| spec.post_process)
        {
            finisher.finish(&mut self.staging);
        }

        let slot = self.producer.publish(&self.staging);
        debug!(
            "frame {} published to slot {} (param {})",
            self.staging.opcode, slot, self.staging.param
        );
        self.stats.frames_published = self.stats.frames_published.wrapping_add(1);
        self.stats.framing_errors = self
            .stats
            .framing_errors
            .wrapping_add(u32::from(framing_errors));
        self.stats.overruns = self.producer.overruns();

        self.staging.clear();
        self.collector.reset();
        self.active = None;
        self.state = SyncState::Hunt;
    }

    fn resync(&mut self) {
        self.correlator.reset();
        self.collector.reset();
        self.staging.clear();
        self.active = None;
        self.state = SyncState::Hunt;
    }

    /// Current receive state.
    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Table position of the pattern being collected, if any.
    pub fn active_pattern(&self) -> Option<usize> {
        self.active
    }

    /// Counters since [`open`](Self::open).
    pub fn stats(&self) -> SyncStats {
        self.stats
    }

    /// The installed pattern table.
    pub fn table(&self) -> &PatternTable<'a> {
        &self.table
    }
}

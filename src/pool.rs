//! Lossy frame handoff between the receive context and a consumer.
//!
//! The [`BufferPool`] is a fixed array of [`IPC_NUM_BUFFERS`] slots meant to
//! live in memory shared by two execution contexts (typically two cores).
//! It is split once into a [`Producer`], owned by the sync engine, and a
//! [`Consumer`], polled by the downstream decoders.
//!
//! ## Handoff rules
//!
//! - The producer fills slots round-robin from a free-running write index.
//! - A slot is published by writing the record first and setting `valid`
//!   last, with release ordering.
//! - The consumer copies a valid slot out and then clears `valid`.
//! - There is no back-pressure. If the consumer is more than
//!   [`IPC_NUM_BUFFERS`] frames behind, the producer overwrites the unread
//!   slot and counts an overrun. Fresh data wins over complete delivery.
//!
//! Each slot also carries a sequence number that is odd while the producer
//! is writing. A consumer whose copy overlapped a rewrite sees the number
//! change and drops the copy instead of returning a torn frame. Only atomic
//! loads and stores are used, so the pool works on cores without
//! compare-and-swap (Cortex-M0).
//!
//! ## Memory layout
//!
//! The pool is `#[repr(C)]` all the way down so that a consumer built
//! separately for the other core can address it directly. Each of the
//! [`IPC_NUM_BUFFERS`] slots is laid out back to back as:
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0      | 1    | `valid` (0 or 1) |
//! | 4      | 4    | `sequence` |
//! | 8      | 1    | `opcode` |
//! | 10     | 2    | `param` |
//! | 12     | 4    | `rx_time` |
//! | 16     | 1024 | `data` |
//!
//! for a slot size of [`SLOT_SIZE`] bytes, all fields in native byte order.

use core::cell::UnsafeCell;
use core::convert::Infallible;
use core::ptr;
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering, fence};

use crate::consts::{IPC_DATA_SIZE, IPC_NUM_BUFFERS};

/// One extracted frame as seen by the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct FrameRecord {
    /// Id of the sync pattern that started this frame.
    pub opcode: u8,
    /// Mode-specific auxiliary value (UART framing errors, finisher flags).
    pub param: u16,
    /// Time counter sampled when the sync word matched.
    pub rx_time: u32,
    /// Payload area.
    pub data: [u8; IPC_DATA_SIZE],
}

impl FrameRecord {
    /// An all-zero record.
    pub const fn new() -> Self {
        Self {
            opcode: 0,
            param: 0,
            rx_time: 0,
            data: [0; IPC_DATA_SIZE],
        }
    }

    /// Zeroes every field.
    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

impl Default for FrameRecord {
    fn default() -> Self {
        Self::new()
    }
}

/// Bytes occupied by one slot in the shared pool.
pub const SLOT_SIZE: usize = 16 + IPC_DATA_SIZE;

#[derive(Debug)]
#[repr(C)]
struct Slot {
    valid: AtomicBool,
    sequence: AtomicU32,
    record: UnsafeCell<FrameRecord>,
}

impl Slot {
    const fn new() -> Self {
        Self {
            valid: AtomicBool::new(false),
            sequence: AtomicU32::new(0),
            record: UnsafeCell::new(FrameRecord::new()),
        }
    }
}

/// Fixed set of frame slots shared between one producer and one consumer.
#[derive(Debug)]
#[repr(C)]
pub struct BufferPool {
    slots: [Slot; IPC_NUM_BUFFERS],
}

// SAFETY: slot records are only written by the single `Producer` and only
// read by the single `Consumer`; `split` hands out exactly one of each. The
// `valid` flag and the sequence number order every access, and a consumer
// never returns a copy taken while the sequence number moved.
unsafe impl Sync for BufferPool {}

impl BufferPool {
    /// Creates a pool with every slot empty.
    pub const fn new() -> Self {
        Self {
            slots: [const { Slot::new() }; IPC_NUM_BUFFERS],
        }
    }

    /// Splits the pool into its producer and consumer halves.
    pub fn split(&mut self) -> (Producer<'_>, Consumer<'_>) {
        let pool: &BufferPool = self;
        (
            Producer {
                pool,
                write_index: 0,
                overruns: 0,
            },
            Consumer {
                pool,
                next: 0,
                torn: 0,
            },
        )
    }

    /// Number of slots.
    pub const fn capacity(&self) -> usize {
        IPC_NUM_BUFFERS
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}

/// Publishing half of a [`BufferPool`].
#[derive(Debug)]
pub struct Producer<'a> {
    pool: &'a BufferPool,
    write_index: u32,
    overruns: u32,
}

impl Producer<'_> {
    /// Marks every slot empty.
    ///
    /// Only call this while the consumer is not reading.
    pub fn reset(&mut self) {
        for slot in &self.pool.slots {
            slot.valid.store(false, Ordering::Release);
        }
    }

    /// Index of the slot the next [`publish`](Self::publish) will use.
    pub fn next_slot(&self) -> usize {
        self.write_index as usize % IPC_NUM_BUFFERS
    }

    /// Copies `record` into the next slot and marks it valid.
    ///
    /// Never blocks. Returns the slot index used.
    pub fn publish(&mut self, record: &FrameRecord) -> usize {
        let index = self.next_slot();
        self.write_index = self.write_index.wrapping_add(1);
        let slot = &self.pool.slots[index];

        if slot.valid.load(Ordering::Acquire) {
            self.overruns = self.overruns.wrapping_add(1);
            warn!("slot {} overwritten before it was read", index);
        }

        let seq = slot.sequence.load(Ordering::Relaxed);
        slot.sequence.store(seq.wrapping_add(1), Ordering::Relaxed);
        fence(Ordering::Release);
        // SAFETY: this is the only writer of slot records. A consumer may be
        // copying the same slot at the same time; that overlap is a data race
        // in the Rust memory model (the usual seqlock caveat). It sees the
        // sequence change and discards whatever bytes it got, so no torn
        // record is ever returned.
        unsafe { ptr::copy_nonoverlapping(record, slot.record.get(), 1) };
        slot.sequence.store(seq.wrapping_add(2), Ordering::Release);
        slot.valid.store(true, Ordering::Release);
        index
    }

    /// Frames overwritten before the consumer read them.
    pub fn overruns(&self) -> u32 {
        self.overruns
    }

    /// Frames published since the split.
    pub fn published(&self) -> u32 {
        self.write_index
    }
}

/// Reading half of a [`BufferPool`].
#[derive(Debug)]
pub struct Consumer<'a> {
    pool: &'a BufferPool,
    /// Slot to look at first, one past the last slot read.
    next: usize,
    torn: u32,
}

impl Consumer<'_> {
    /// Copies the next ready frame into `out` and frees its slot.
    ///
    /// Slots are scanned starting after the last one read, which yields
    /// frames in publish order as long as the consumer keeps up. Returns the
    /// slot index, or `WouldBlock` when no slot is ready.
    pub fn read(&mut self, out: &mut FrameRecord) -> nb::Result<usize, Infallible> {
        for step in 0..IPC_NUM_BUFFERS {
            let index = (self.next + step) % IPC_NUM_BUFFERS;
            let slot = &self.pool.slots[index];
            if !slot.valid.load(Ordering::Acquire) {
                continue;
            }
            let before = slot.sequence.load(Ordering::Acquire);
            if before % 2 != 0 {
                // Being rewritten; it turns valid again once done.
                continue;
            }
            // SAFETY: see `Producer::publish`. This copy can race a rewrite
            // of the same slot; the sequence check below detects the overlap
            // and the copy is dropped unread.
            unsafe { ptr::copy_nonoverlapping(slot.record.get(), out, 1) };
            fence(Ordering::Acquire);
            if slot.sequence.load(Ordering::Relaxed) != before {
                self.torn = self.torn.wrapping_add(1);
                continue;
            }
            slot.valid.store(false, Ordering::Release);
            self.next = (index + 1) % IPC_NUM_BUFFERS;
            return Ok(index);
        }
        Err(nb::Error::WouldBlock)
    }

    /// Whether slot `index` holds an unread frame.
    pub fn is_ready(&self, index: usize) -> bool {
        self.pool
            .slots
            .get(index)
            .is_some_and(|slot| slot.valid.load(Ordering::Acquire))
    }

    /// Number of slots holding unread frames.
    pub fn pending(&self) -> usize {
        self.pool
            .slots
            .iter()
            .filter(|slot| slot.valid.load(Ordering::Acquire))
            .count()
    }

    /// Copies dropped because the producer rewrote the slot meanwhile.
    pub fn torn_reads(&self) -> u32 {
        self.torn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(opcode: u8) -> FrameRecord {
        let mut record = FrameRecord::new();
        record.opcode = opcode;
        record.rx_time = u32::from(opcode) * 100;
        record.data[0] = opcode;
        record.data[IPC_DATA_SIZE - 1] = !opcode;
        record
    }

    #[test]
    fn test_shared_layout_is_fixed() {
        use core::mem::offset_of;

        assert_eq!(offset_of!(FrameRecord, opcode), 0);
        assert_eq!(offset_of!(FrameRecord, param), 2);
        assert_eq!(offset_of!(FrameRecord, rx_time), 4);
        assert_eq!(offset_of!(FrameRecord, data), 8);
        assert_eq!(size_of::<FrameRecord>(), 8 + IPC_DATA_SIZE);

        assert_eq!(offset_of!(Slot, valid), 0);
        assert_eq!(offset_of!(Slot, sequence), 4);
        assert_eq!(offset_of!(Slot, record), 8);
        assert_eq!(size_of::<Slot>(), SLOT_SIZE);
        assert_eq!(size_of::<BufferPool>(), IPC_NUM_BUFFERS * SLOT_SIZE);
    }

    #[test]
    fn test_empty_pool_would_block() {
        let mut pool = BufferPool::new();
        let (_producer, mut consumer) = pool.split();
        let mut out = FrameRecord::new();
        assert_eq!(consumer.read(&mut out), Err(nb::Error::WouldBlock));
        assert_eq!(consumer.pending(), 0);
    }

    #[test]
    fn test_publish_then_read() {
        let mut pool = BufferPool::new();
        let (mut producer, mut consumer) = pool.split();
        assert_eq!(producer.publish(&frame(9)), 0);
        assert!(consumer.is_ready(0));

        let mut out = FrameRecord::new();
        assert_eq!(nb::block!(consumer.read(&mut out)), Ok(0));
        assert_eq!(out, frame(9));
        assert!(!consumer.is_ready(0));
        assert_eq!(consumer.read(&mut out), Err(nb::Error::WouldBlock));
    }

    #[test]
    fn test_fifth_publish_overwrites_slot_zero() {
        let mut pool = BufferPool::new();
        let (mut producer, mut consumer) = pool.split();
        let mut slots: heapless::Vec<usize, 5> = heapless::Vec::new();
        for opcode in 1..=5 {
            slots.push(producer.publish(&frame(opcode))).unwrap();
        }
        assert_eq!(&slots[..], &[0, 1, 2, 3, 0]);
        assert_eq!(producer.overruns(), 1);
        assert_eq!(producer.published(), 5);
        assert_eq!(consumer.pending(), 4);

        let mut out = FrameRecord::new();
        let mut opcodes: heapless::Vec<u8, 4> = heapless::Vec::new();
        while consumer.read(&mut out).is_ok() {
            opcodes.push(out.opcode).unwrap();
        }
        // Frame 1 is gone; slot 0 now carries frame 5.
        assert_eq!(&opcodes[..], &[5, 2, 3, 4]);
    }

    #[test]
    fn test_reader_resumes_after_last_slot() {
        let mut pool = BufferPool::new();
        let (mut producer, mut consumer) = pool.split();
        let mut out = FrameRecord::new();
        for opcode in 1..=6 {
            assert_eq!(producer.publish(&frame(opcode)), usize::from(opcode - 1) % 4);
            assert_eq!(consumer.read(&mut out), Ok(usize::from(opcode - 1) % 4));
            assert_eq!(out.opcode, opcode);
        }
        assert_eq!(producer.overruns(), 0);
    }

    #[test]
    fn test_reset_clears_valid_flags() {
        let mut pool = BufferPool::new();
        let (mut producer, consumer) = pool.split();
        let _ = producer.publish(&frame(1));
        let _ = producer.publish(&frame(2));
        producer.reset();
        assert_eq!(consumer.pending(), 0);
    }

    #[test]
    fn test_concurrent_reader_never_sees_torn_frame() {
        let mut pool = BufferPool::new();
        let (mut producer, mut consumer) = pool.split();
        std::thread::scope(|s| {
            let writer = s.spawn(move || {
                for opcode in 0..=255u8 {
                    let _ = producer.publish(&frame(opcode));
                }
            });
            let mut out = FrameRecord::new();
            while !writer.is_finished() || consumer.pending() > 0 {
                if consumer.read(&mut out).is_ok() {
                    assert_eq!(out, frame(out.opcode));
                }
            }
            writer.join().unwrap();
        });
    }
}

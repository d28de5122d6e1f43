//! Payload extraction after a sync match.
//!
//! The [`FrameCollector`] turns line bits into payload bytes according to the
//! decoding mode of the matched pattern and places them in the slot buffer:
//!
//! - [`DataMode::Raw`]: every line bit is a payload bit, packed MSB first.
//! - [`DataMode::Uart8n1`]: ten line bits per payload byte, see
//!   [`Uart8n1Decoder`].
//! - [`DataMode::BiphaseS`]: two line bits per payload bit, see
//!   [`BiphaseDecoder`]; decoded bits are packed like raw bits.
//!
//! With sub-blocking enabled, every `sub_block_bits` payload bits the write
//! cursor jumps to the start of the next `sub_block_bytes`-sized block, so
//! each block begins on a byte boundary no matter how many bits it holds.
//! The collector only places the blocks; it does not look at their content.

use crate::encoding::{BiphaseDecoder, Uart8n1Decoder};
use crate::pattern::{DataMode, SyncPatternSpec};

/// The part of a [`SyncPatternSpec`] the collector needs while running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameLayout {
    /// Decoding mode.
    pub mode: DataMode,
    /// Payload bits to collect.
    pub frame_length_bits: u16,
    /// First payload byte position.
    pub start_offset: u16,
    /// Flip payload bit sense.
    pub inverted: bool,
    /// Payload bits per sub-block, 0 for none.
    pub sub_block_bits: u16,
    /// Slot bytes per sub-block.
    pub sub_block_bytes: u16,
}

impl From<&SyncPatternSpec<'_>> for FrameLayout {
    fn from(spec: &SyncPatternSpec<'_>) -> Self {
        Self {
            mode: spec.data_state,
            frame_length_bits: spec.frame_length_bits,
            start_offset: spec.start_offset,
            inverted: spec.inverted,
            sub_block_bits: spec.sub_block_bits,
            sub_block_bytes: spec.sub_block_bytes,
        }
    }
}

/// Result of feeding one line bit to the collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// More bits are needed.
    Pending,
    /// All payload bits have been written.
    Complete,
}

/// Per-frame payload extraction state.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameCollector {
    layout: FrameLayout,
    /// Payload bits written so far (data bits only for UART).
    bits_consumed: u16,
    /// Payload bits written into the current sub-block.
    sub_count: u16,
    block_start: usize,
    cursor: usize,
    /// Partially assembled byte, filled from the LSB upwards.
    acc: u8,
    acc_bits: u8,
    uart: Uart8n1Decoder,
    biphase: BiphaseDecoder,
    framing_errors: u16,
}

impl FrameCollector {
    /// Creates an idle collector.
    pub const fn new() -> Self {
        Self {
            layout: FrameLayout {
                mode: DataMode::Raw,
                frame_length_bits: 0,
                start_offset: 0,
                inverted: false,
                sub_block_bits: 0,
                sub_block_bytes: 0,
            },
            bits_consumed: 0,
            sub_count: 0,
            block_start: 0,
            cursor: 0,
            acc: 0,
            acc_bits: 0,
            uart: Uart8n1Decoder::new(),
            biphase: BiphaseDecoder::new(),
            framing_errors: 0,
        }
    }

    /// Starts collecting a frame with the given layout.
    pub fn begin(&mut self, layout: FrameLayout) {
        let start = usize::from(layout.start_offset);
        *self = Self {
            layout,
            block_start: start,
            cursor: start,
            ..Self::new()
        };
    }

    /// Consumes one line bit, writing completed bytes into `data`.
    ///
    /// Writes outside `data` are dropped; a validated layout never produces
    /// them.
    pub fn push(&mut self, line_bit: bool, data: &mut [u8]) -> Progress {
        let inverted = self.layout.inverted;
        match self.layout.mode {
            DataMode::Raw => self.push_bit(line_bit ^ inverted, data),
            DataMode::BiphaseS => match self.biphase.push(line_bit) {
                Some(bit) => self.push_bit(bit ^ inverted, data),
                None => return Progress::Pending,
            },
            DataMode::Uart8n1 => match self.uart.push(line_bit ^ inverted) {
                Some(ch) => {
                    if ch.framing_error {
                        self.framing_errors = self.framing_errors.saturating_add(1);
                    }
                    self.push_byte(ch.byte, data);
                }
                None => return Progress::Pending,
            },
        }

        if self.bits_consumed >= self.layout.frame_length_bits {
            self.flush(data);
            Progress::Complete
        } else {
            Progress::Pending
        }
    }

    fn push_bit(&mut self, bit: bool, data: &mut [u8]) {
        self.acc = (self.acc << 1) | u8::from(bit);
        self.acc_bits += 1;
        if self.acc_bits == 8 {
            self.store(data);
        }
        self.bits_consumed += 1;
        self.advance_sub_block(1, data);
    }

    fn push_byte(&mut self, byte: u8, data: &mut [u8]) {
        // UART payload never leaves a partial byte in the accumulator.
        self.acc = byte;
        self.store(data);
        self.bits_consumed += 8;
        self.advance_sub_block(8, data);
    }

    fn advance_sub_block(&mut self, bits: u16, data: &mut [u8]) {
        if self.layout.sub_block_bits == 0 {
            return;
        }
        self.sub_count += bits;
        if self.sub_count >= self.layout.sub_block_bits {
            self.flush(data);
            self.block_start += usize::from(self.layout.sub_block_bytes);
            self.cursor = self.block_start;
            self.sub_count = 0;
        }
    }

    fn store(&mut self, data: &mut [u8]) {
        if let Some(byte) = data.get_mut(self.cursor) {
            *byte = self.acc;
        }
        self.cursor += 1;
        self.acc = 0;
        self.acc_bits = 0;
    }

    /// Writes a partial byte left-aligned.
    fn flush(&mut self, data: &mut [u8]) {
        if self.acc_bits > 0 {
            self.acc <<= 8 - self.acc_bits;
            self.store(data);
        }
    }

    /// Payload bits written so far.
    pub fn bits_consumed(&self) -> u16 {
        self.bits_consumed
    }

    /// UART characters with a bad start or stop bit in this frame.
    pub fn framing_errors(&self) -> u16 {
        self.framing_errors
    }

    /// Next byte position the collector will write.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Drops all per-frame state.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::IPC_DATA_SIZE;
    use crate::encoding::{BiphaseEncoder, encode_uart_8n1};

    fn layout(mode: DataMode, frame_length_bits: u16) -> FrameLayout {
        FrameLayout {
            mode,
            frame_length_bits,
            ..FrameLayout::default()
        }
    }

    /// Feeds `bits` and returns the index of the bit that completed the frame.
    fn run(c: &mut FrameCollector, bits: &[bool], data: &mut [u8]) -> Option<usize> {
        for (i, &bit) in bits.iter().enumerate() {
            if c.push(bit, data) == Progress::Complete {
                return Some(i);
            }
        }
        None
    }

    fn msb_bits(bytes: &[u8]) -> heapless::Vec<bool, 256> {
        bytes
            .iter()
            .flat_map(|&b| (0..8).rev().map(move |i| (b >> i) & 1 != 0))
            .collect()
    }

    #[test]
    fn test_raw_packs_msb_first_at_offset() {
        let mut data = [0u8; IPC_DATA_SIZE];
        let mut c = FrameCollector::new();
        c.begin(FrameLayout {
            start_offset: 3,
            ..layout(DataMode::Raw, 16)
        });
        let bits = msb_bits(&[0xc3, 0x5a]);
        assert_eq!(run(&mut c, &bits, &mut data), Some(15));
        assert_eq!(&data[3..5], &[0xc3, 0x5a]);
        assert_eq!(data[2], 0);
        assert_eq!(data[5], 0);
    }

    #[test]
    fn test_raw_partial_byte_is_left_aligned() {
        let mut data = [0u8; 4];
        let mut c = FrameCollector::new();
        c.begin(layout(DataMode::Raw, 12));
        assert_eq!(run(&mut c, &msb_bits(&[0xab, 0xcd]), &mut data), Some(11));
        assert_eq!(&data[..2], &[0xab, 0xc0]);
    }

    #[test]
    fn test_uart_counts_data_bits_only() {
        let mut data = [0u8; 4];
        let mut c = FrameCollector::new();
        c.begin(layout(DataMode::Uart8n1, 16));
        let mut line: heapless::Vec<bool, 20> = heapless::Vec::new();
        line.extend_from_slice(&encode_uart_8n1(0x12)).unwrap();
        line.extend_from_slice(&encode_uart_8n1(0x34)).unwrap();
        // Completes on the second stop bit.
        assert_eq!(run(&mut c, &line, &mut data), Some(19));
        assert_eq!(&data[..2], &[0x12, 0x34]);
        assert_eq!(c.framing_errors(), 0);
    }

    #[test]
    fn test_uart_inverted_line() {
        let mut data = [0u8; 1];
        let mut c = FrameCollector::new();
        c.begin(FrameLayout {
            inverted: true,
            ..layout(DataMode::Uart8n1, 8)
        });
        let line = encode_uart_8n1(0x5c).map(|b| !b);
        assert_eq!(run(&mut c, &line, &mut data), Some(9));
        assert_eq!(data[0], 0x5c);
        assert_eq!(c.framing_errors(), 0);
    }

    #[test]
    fn test_uart_counts_framing_errors() {
        let mut data = [0u8; 2];
        let mut c = FrameCollector::new();
        c.begin(layout(DataMode::Uart8n1, 16));
        let mut first = encode_uart_8n1(0xf0);
        first[9] = false;
        let mut line: heapless::Vec<bool, 20> = heapless::Vec::new();
        line.extend_from_slice(&first).unwrap();
        line.extend_from_slice(&encode_uart_8n1(0x0f)).unwrap();
        assert_eq!(run(&mut c, &line, &mut data), Some(19));
        assert_eq!(&data[..], &[0xf0, 0x0f]);
        assert_eq!(c.framing_errors(), 1);
    }

    #[test]
    fn test_biphase_decodes_into_packed_bits() {
        let mut data = [0u8; 1];
        let mut c = FrameCollector::new();
        c.begin(layout(DataMode::BiphaseS, 8));
        let mut enc = BiphaseEncoder::new(false);
        let line: heapless::Vec<bool, 16> = msb_bits(&[0x96])
            .iter()
            .flat_map(|&b| enc.encode(b))
            .collect();
        assert_eq!(run(&mut c, &line, &mut data), Some(15));
        assert_eq!(data[0], 0x96);
    }

    #[test]
    fn test_biphase_inverted_flips_decoded_bits() {
        let mut data = [0u8; 1];
        let mut c = FrameCollector::new();
        c.begin(FrameLayout {
            inverted: true,
            ..layout(DataMode::BiphaseS, 8)
        });
        let mut enc = BiphaseEncoder::new(true);
        let line: heapless::Vec<bool, 16> = msb_bits(&[0x96])
            .iter()
            .flat_map(|&b| enc.encode(b))
            .collect();
        assert_eq!(run(&mut c, &line, &mut data), Some(15));
        assert_eq!(data[0], !0x96);
    }

    #[test]
    fn test_unaligned_sub_blocks_start_on_byte_boundaries() {
        let mut data = [0u8; 4];
        let mut c = FrameCollector::new();
        c.begin(FrameLayout {
            sub_block_bits: 12,
            sub_block_bytes: 2,
            ..layout(DataMode::Raw, 24)
        });
        // Block 1: 0xabc, block 2: 0x123
        let bits = msb_bits(&[0xab, 0xc1, 0x23]);
        assert_eq!(run(&mut c, &bits, &mut data), Some(23));
        assert_eq!(&data[..], &[0xab, 0xc0, 0x12, 0x30]);
        assert_eq!(c.cursor(), 4);
    }

    #[test]
    fn test_begin_resets_previous_frame() {
        let mut data = [0u8; 2];
        let mut c = FrameCollector::new();
        c.begin(layout(DataMode::BiphaseS, 8));
        assert_eq!(c.push(true, &mut data), Progress::Pending);
        c.begin(FrameLayout {
            start_offset: 1,
            ..layout(DataMode::Raw, 8)
        });
        assert_eq!(c.bits_consumed(), 0);
        assert_eq!(c.cursor(), 1);
        assert_eq!(run(&mut c, &msb_bits(&[0x81]), &mut data), Some(7));
        assert_eq!(data[1], 0x81);
    }
}

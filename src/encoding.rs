//! Line codes used inside sonde frames.
//!
//! This module implements the bit-serial decoding state machines used by the
//! frame collector, together with the matching encoders. The encoders are not
//! needed on the receive path; they exist to synthesize reference streams for
//! loopback testing and for bench signal generators.
//!
//! ## Asynchronous serial (8N1)
//!
//! Some sondes run their payload through a UART before modulation, so every
//! byte appears on air as:
//!
//! | Line bit | Meaning |
//! |----------|---------|
//! | 0        | start bit, always `0` |
//! | 1..=8    | data bits, least-significant bit first |
//! | 9        | stop bit, always `1` |
//!
//! The decoder keeps a fixed 10-bit cadence from the sync word onwards. It
//! never hunts for a start edge: a bad start or stop bit is reported as a
//! framing error but the byte is still produced from the eight data bits.
//!
//! ## Biphase
//!
//! Each logical bit occupies two half-bit line intervals. The convention used
//! throughout this crate:
//!
//! - the two halves **differ** (level change at mid-bit) → `1`
//! - the two halves are **equal** (no change at mid-bit) → `0`
//!
//! The encoder additionally places a level change at every bit-cell boundary,
//! which keeps the line DC-free and gives the receiver a clock. The decoder
//! does not rely on those boundary transitions; it only compares the two
//! halves of each cell. The first half-bit after the sync word is the first
//! half of the first cell.

/// One character recovered by [`Uart8n1Decoder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UartChar {
    /// The eight data bits, assembled LSB first.
    pub byte: u8,
    /// Set when the start bit was not `0` or the stop bit was not `1`.
    pub framing_error: bool,
}

/// Bit-serial 8N1 decoder with a fixed 10-bit character cadence.
#[derive(Debug, Clone, Copy, Default)]
pub struct Uart8n1Decoder {
    /// Position inside the current character (0 = start bit, 9 = stop bit).
    phase: u8,
    byte: u8,
    framing_error: bool,
}

impl Uart8n1Decoder {
    /// Line bits per character (start + 8 data + stop).
    pub const BITS_PER_CHAR: u8 = 10;

    /// Creates a decoder expecting a start bit next.
    pub const fn new() -> Self {
        Self {
            phase: 0,
            byte: 0,
            framing_error: false,
        }
    }

    /// Consumes one line bit.
    ///
    /// Returns the character once its stop bit has been consumed.
    pub fn push(&mut self, bit: bool) -> Option<UartChar> {
        let phase = self.phase;
        match phase {
            0 => {
                self.byte = 0;
                self.framing_error = bit;
                self.phase = 1;
                None
            }
            1..=8 => {
                if bit {
                    self.byte |= 1 << (phase - 1);
                }
                self.phase += 1;
                None
            }
            _ => {
                self.phase = 0;
                Some(UartChar {
                    byte: self.byte,
                    framing_error: self.framing_error || !bit,
                })
            }
        }
    }

    /// Returns to the start-bit position, discarding a partial character.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// Frames one byte as 8N1 line bits, in transmission order.
pub fn encode_uart_8n1(byte: u8) -> [bool; 10] {
    let mut bits = [false; 10];
    for (i, bit) in bits[1..9].iter_mut().enumerate() {
        *bit = (byte >> i) & 1 != 0;
    }
    bits[9] = true;
    bits
}

/// Half-bit pairing decoder for the biphase line code.
#[derive(Debug, Clone, Copy, Default)]
pub struct BiphaseDecoder {
    first_half: Option<bool>,
}

impl BiphaseDecoder {
    /// Creates a decoder expecting the first half of a bit cell next.
    pub const fn new() -> Self {
        Self { first_half: None }
    }

    /// Consumes one half-bit.
    ///
    /// Returns the decoded bit after the second half of each cell.
    pub fn push(&mut self, half: bool) -> Option<bool> {
        match self.first_half.take() {
            None => {
                self.first_half = Some(half);
                None
            }
            Some(first) => Some(first != half),
        }
    }

    /// Drops a pending half-bit.
    pub fn reset(&mut self) {
        self.first_half = None;
    }
}

/// Biphase encoder producing two half-bits per logical bit.
#[derive(Debug, Clone, Copy)]
pub struct BiphaseEncoder {
    /// Line level at the end of the previous cell.
    level: bool,
}

impl BiphaseEncoder {
    /// Creates an encoder whose line currently sits at `level`.
    pub const fn new(level: bool) -> Self {
        Self { level }
    }

    /// Encodes one bit as `[first_half, second_half]`.
    pub fn encode(&mut self, bit: bool) -> [bool; 2] {
        // Every cell opens with a level change.
        let first = !self.level;
        let second = if bit { !first } else { first };
        self.level = second;
        [first, second]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uart_frames_a5_lsb_first() {
        assert_eq!(
            encode_uart_8n1(0xa5),
            [false, true, false, true, false, false, true, false, true, true]
        );
    }

    #[test]
    fn test_uart_decodes_framed_byte() {
        let mut dec = Uart8n1Decoder::new();
        let mut out = None;
        for bit in encode_uart_8n1(0x3c) {
            out = dec.push(bit);
        }
        assert_eq!(
            out,
            Some(UartChar {
                byte: 0x3c,
                framing_error: false
            })
        );
    }

    #[test]
    fn test_uart_tolerates_bad_start_and_stop() {
        let mut line = encode_uart_8n1(0x81);
        line[0] = true;
        line[9] = false;
        let mut dec = Uart8n1Decoder::new();
        let chars: heapless::Vec<UartChar, 2> =
            line.iter().filter_map(|&b| dec.push(b)).collect();
        assert_eq!(chars.len(), 1);
        assert_eq!(chars[0].byte, 0x81);
        assert!(chars[0].framing_error);

        // Cadence is kept: the next character decodes normally.
        let next = encode_uart_8n1(0x42)
            .iter()
            .filter_map(|&b| dec.push(b))
            .last();
        assert_eq!(
            next,
            Some(UartChar {
                byte: 0x42,
                framing_error: false
            })
        );
    }

    #[test]
    fn test_biphase_round_trip() {
        let bits = [true, false, false, true, true];
        let mut enc = BiphaseEncoder::new(false);
        let mut dec = BiphaseDecoder::new();
        let mut decoded: heapless::Vec<bool, 5> = heapless::Vec::new();
        for &bit in &bits {
            for half in enc.encode(bit) {
                if let Some(b) = dec.push(half) {
                    decoded.push(b).unwrap();
                }
            }
        }
        assert_eq!(&decoded[..], &bits[..]);
    }

    #[test]
    fn test_biphase_encoder_toggles_at_cell_boundary() {
        let mut enc = BiphaseEncoder::new(true);
        assert_eq!(enc.encode(false), [false, false]);
        assert_eq!(enc.encode(true), [true, false]);
        assert_eq!(enc.encode(false), [true, true]);
    }
}

//! Pattern-specific finishing steps.
//!
//! A [`FrameFinisher`] runs on the producer side after the last payload bit
//! was collected and before the frame is published. It sees the complete,
//! still writable [`FrameRecord`] and may patch payload bytes or annotate
//! `param`. Finishers run inside the receive timing path, so they should do
//! a bounded amount of work.

use crate::crc::crc16_ccitt;
use crate::pool::FrameRecord;

/// Finishing step selected per sync pattern.
pub trait FrameFinisher: Sync {
    /// Patches `frame` in place before it is handed to the consumer.
    fn finish(&self, frame: &mut FrameRecord);
}

/// Checks a CRC-16/CCITT over a payload range and reports it in `param`.
///
/// `flag` is set in `param` when the CRC stored at `crc_offset` matches the
/// one computed over `start..start + len`, and cleared otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrcCheck {
    /// First byte covered by the CRC.
    pub start: u16,
    /// Number of bytes covered.
    pub len: u16,
    /// Position of the two stored CRC bytes.
    pub crc_offset: u16,
    /// Stored CRC is little endian.
    pub little_endian: bool,
    /// `param` bits to set on success.
    pub flag: u16,
}

impl CrcCheck {
    fn matches(&self, data: &[u8]) -> bool {
        let start = usize::from(self.start);
        let crc_at = usize::from(self.crc_offset);
        let body = data.get(start..start + usize::from(self.len));
        let stored = data.get(crc_at..crc_at + 2);
        match (body, stored) {
            (Some(body), Some(&[a, b])) => {
                let stored = if self.little_endian {
                    u16::from_le_bytes([a, b])
                } else {
                    u16::from_be_bytes([a, b])
                };
                crc16_ccitt(body) == stored
            }
            _ => false,
        }
    }
}

impl FrameFinisher for CrcCheck {
    fn finish(&self, frame: &mut FrameRecord) {
        if self.matches(&frame.data) {
            frame.param |= self.flag;
        } else {
            frame.param &= !self.flag;
        }
    }
}

/// XORs a payload range with a repeating key, for whitened frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XorDescrambler<'k> {
    /// First whitened byte.
    pub start: u16,
    /// Number of whitened bytes.
    pub len: u16,
    /// Whitening sequence, repeated as needed.
    pub key: &'k [u8],
}

impl FrameFinisher for XorDescrambler<'_> {
    fn finish(&self, frame: &mut FrameRecord) {
        if self.key.is_empty() {
            return;
        }
        let start = usize::from(self.start);
        let end = (start + usize::from(self.len)).min(frame.data.len());
        if let Some(range) = frame.data.get_mut(start..end) {
            for (byte, k) in range.iter_mut().zip(self.key.iter().cycle()) {
                *byte ^= k;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc_check_sets_and_clears_flag() {
        let check = CrcCheck {
            start: 2,
            len: 9,
            crc_offset: 11,
            little_endian: false,
            flag: 0x0100,
        };
        let mut frame = FrameRecord::new();
        frame.data[2..11].copy_from_slice(b"123456789");
        frame.data[11..13].copy_from_slice(&[0x29, 0xb1]);
        frame.param = 0x0003;
        check.finish(&mut frame);
        assert_eq!(frame.param, 0x0103);

        frame.data[5] ^= 0x01;
        check.finish(&mut frame);
        assert_eq!(frame.param, 0x0003);
    }

    #[test]
    fn test_crc_check_little_endian() {
        let check = CrcCheck {
            start: 0,
            len: 9,
            crc_offset: 9,
            little_endian: true,
            flag: 1,
        };
        let mut frame = FrameRecord::new();
        frame.data[..9].copy_from_slice(b"123456789");
        frame.data[9..11].copy_from_slice(&[0xb1, 0x29]);
        check.finish(&mut frame);
        assert_eq!(frame.param, 1);
    }

    #[test]
    fn test_crc_check_out_of_range_fails() {
        let check = CrcCheck {
            start: 1020,
            len: 8,
            crc_offset: 0,
            little_endian: false,
            flag: 1,
        };
        let mut frame = FrameRecord::new();
        frame.param = 1;
        check.finish(&mut frame);
        assert_eq!(frame.param, 0);
    }

    #[test]
    fn test_descrambler_repeats_key() {
        let descrambler = XorDescrambler {
            start: 1,
            len: 5,
            key: &[0xff, 0x0f],
        };
        let mut frame = FrameRecord::new();
        descrambler.finish(&mut frame);
        assert_eq!(&frame.data[..7], &[0x00, 0xff, 0x0f, 0xff, 0x0f, 0xff, 0x00]);
    }
}

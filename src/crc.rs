/// CRC-16/CCITT-FALSE: polynomial 0x1021, MSB first, no output xor.
pub(crate) const CRC16_CCITT_INIT: u16 = 0xffff;

pub(crate) fn crc16_ccitt_update(crc: u16, byte: u8) -> u16 {
    let mut crc = crc ^ (u16::from(byte) << 8);
    for _ in 0..8 {
        crc = if crc & 0x8000 != 0 {
            (crc << 1) ^ 0x1021
        } else {
            crc << 1
        };
    }
    crc
}

pub(crate) fn crc16_ccitt(data: &[u8]) -> u16 {
    data.iter()
        .fold(CRC16_CCITT_INIT, |crc, &b| crc16_ccitt_update(crc, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc16_ccitt_check_value() {
        assert_eq!(crc16_ccitt(b"123456789"), 0x29b1);
    }

    #[test]
    fn test_crc16_ccitt_empty_is_init() {
        assert_eq!(crc16_ccitt(&[]), CRC16_CCITT_INIT);
    }
}

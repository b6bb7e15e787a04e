//! Byte-level encodings shared by the register map and the file transfer
//! protocol: BCD digits, the CRC-8 used on packed filenames, and the framing
//! markers.

/// Starts a packet or a directory listing.
pub const BEGIN: u8 = b'<';
/// Separates listing entries, and the filename from its checksum in a packet.
pub const DELIMITER: u8 = b'|';
/// Ends a packet or a listing. Also the stream terminator.
pub const END: u8 = b'>';

/// x^8 + x^5 + x^4 + 1
pub const CRC8_POLYNOMIAL: u8 = 0x31;

/// Decodes one BCD byte. Each nibble is taken as a digit without checking it.
pub const fn bcd_to_dec(bcd: u8) -> u8 {
    (bcd >> 4) * 10 + (bcd & 0x0F)
}

/// Encodes a value in `0..=99` as BCD. Higher values do not fit in two digits.
pub const fn dec_to_bcd(dec: u8) -> u8 {
    ((dec / 10) << 4) | (dec % 10)
}

/// MSB-first CRC-8 with polynomial 0x31, zero init, no reflection, no final xor.
pub fn crc8(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |crc, &byte| {
        (0..8).fold(crc ^ byte, |crc, _| {
            if crc & 0x80 != 0 {
                (crc << 1) ^ CRC8_POLYNOMIAL
            } else {
                crc << 1
            }
        })
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bcd_round_trip() {
        for b in 0..=255u8 {
            let v = b % 100;
            assert_eq!(bcd_to_dec(dec_to_bcd(v)), v);
        }
    }

    #[test]
    fn bcd_digits() {
        assert_eq!(dec_to_bcd(59), 0x59);
        assert_eq!(dec_to_bcd(7), 0x07);
        assert_eq!(bcd_to_dec(0x31), 31);
        assert_eq!(bcd_to_dec(0x00), 0);
    }

    #[test]
    fn crc8_known_values() {
        assert_eq!(crc8(&[]), 0x00);
        assert_eq!(crc8(b"123456789"), 0xA2);
    }

    #[test]
    fn crc8_detects_single_bit_flips() {
        let data = b"<sched.wpi".to_vec();
        let reference = crc8(&data);

        for byte in 0..data.len() {
            for bit in 0..8 {
                let mut flipped = data.clone();
                flipped[byte] ^= 1 << bit;
                assert_ne!(crc8(&flipped), reference, "flip at byte {byte} bit {bit}");
            }
        }
    }
}

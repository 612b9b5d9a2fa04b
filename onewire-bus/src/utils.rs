#[derive(Debug, Default)]
/// Calculate CRC-8 used in 1-Wire communications.
///
/// Polynomial `0x31` (x^8 + x^5 + x^4 + 1), initial value `0`, no output XOR, with bits
/// consumed least significant first, in the order they travel on the wire.
pub struct OneWireCrc(u8);

impl OneWireCrc {
    /// Get the current CRC value
    pub fn value(&self) -> u8 {
        self.0
    }

    /// Update the CRC with the incoming byte.
    pub fn update(&mut self, byte: u8) {
        let mut crc = self.0 ^ byte;
        for _ in 0..8 {
            if crc & 0x1 == 0x1 {
                crc = (crc >> 1) ^ 0x8c; // 0x31 reflected
            } else {
                crc >>= 1;
            }
        }
        self.0 = crc;
    }

    /// Validate a sequence of bytes where the last byte is the 1-Wire CRC of
    /// the previous bytes.
    pub fn validate(sequence: &[u8]) -> bool {
        crc8(sequence) == 0x0
    }
}

/// CRC-8 of `bytes`.
///
/// Computed over a ROM code or a scratchpad including its trailing CRC byte, the result is `0`
/// if and only if the data is intact.
pub fn crc8(bytes: &[u8]) -> u8 {
    let mut crc = OneWireCrc::default();
    for &byte in bytes {
        crc.update(byte);
    }
    crc.value()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn known_rom_code() {
        // Application note example ROM: family 0x02, CRC 0xa2.
        let rom = [0x02, 0x1c, 0xb8, 0x01, 0x00, 0x00, 0x00, 0xa2];
        assert_eq!(crc8(&rom[..7]), 0xa2);
        assert!(OneWireCrc::validate(&rom));
    }

    #[test]
    fn all_zero_is_valid() {
        assert_eq!(crc8(&[0; 9]), 0);
    }

    #[test]
    fn appended_crc_validates_and_bit_flips_do_not() {
        let mut rng = rand::rng();
        for _ in 0..256 {
            let mut buf = [0u8; 9];
            rng.fill(&mut buf[..8]);
            buf[8] = crc8(&buf[..8]);
            assert!(OneWireCrc::validate(&buf));

            let byte = rng.random_range(0..9);
            let bit = rng.random_range(0..8);
            buf[byte] ^= 1 << bit;
            assert!(!OneWireCrc::validate(&buf));
        }
    }
}

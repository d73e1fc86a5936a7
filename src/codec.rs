//! The machine's 4-byte number format.
//!
//! A word is decoded as
//!
//! ```text
//! value = b[3] + b[2] * 16 + b[1] * 256 + (b[0] % 8)
//! ```
//!
//! and negated when `b[0]` is non-zero with `b[0] % 8 == 0`. This is not two's
//! complement and most bit patterns of `b[0]` carry no information. Programs
//! on disk depend on this exact layout, so it must not be "fixed".
//!
//! Only the words produced by [`encode`] are guaranteed to decode back to the
//! same value. Arbitrary bytes still decode, but e.g. `[0, 0, 0x20, 0]` and
//! `[0, 2, 0, 0]` both decode to `512`.

use crate::error::MachineErrorKind;

/// Width of an encoded number in bytes
pub const NUMBER_SIZE: usize = 4;

/// Largest magnitude [`encode`] accepts
pub const MAX_MAGNITUDE: i32 = 0xFFFF;

/// Marker for negative numbers in byte 0 (`8 % 8 == 0` and non-zero)
const NEGATIVE: u8 = 8;

/// Decodes a word
pub fn decode(bytes: [u8; NUMBER_SIZE]) -> i32 {
    let mut value = bytes[3] as i32;
    value += bytes[2] as i32 * 16;
    value += bytes[1] as i32 * 256;
    value += (bytes[0] % 8) as i32;

    if bytes[0] != 0 && bytes[0] % 8 == 0 {
        value = -value;
    }

    value
}

/// Encodes `value` so that [`decode`] yields it again.
///
/// # Errors
///
/// Fails with [`MachineErrorKind::NumberOutOfRange`] when `|value|` exceeds
/// [`MAX_MAGNITUDE`].
pub fn encode(value: i32) -> Result<[u8; NUMBER_SIZE], MachineErrorKind> {
    let magnitude = value.checked_abs().filter(|m| *m <= MAX_MAGNITUDE);
    let magnitude = match magnitude {
        Some(m) => m as u32,
        None => return Err(MachineErrorKind::NumberOutOfRange { value }),
    };

    let sign = if value < 0 { NEGATIVE } else { 0 };

    Ok([
        sign,
        (magnitude >> 8) as u8,
        ((magnitude >> 4) & 0xF) as u8,
        (magnitude & 0xF) as u8,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use color_eyre::eyre::Result;

    #[test]
    fn test_encode_positive() -> Result<()> {
        assert_eq!(encode(0)?, [0, 0, 0, 0]);
        assert_eq!(encode(5)?, [0, 0, 0, 5]);
        assert_eq!(encode(0x1234)?, [0, 0x12, 0x3, 0x4]);

        Ok(())
    }

    #[test]
    fn test_encode_negative() -> Result<()> {
        assert_eq!(encode(-1)?, [8, 0, 0, 1]);
        assert_eq!(encode(-0x1234)?, [8, 0x12, 0x3, 0x4]);

        Ok(())
    }

    #[test]
    fn test_round_trip_over_domain() -> Result<()> {
        for value in (-MAX_MAGNITUDE..=MAX_MAGNITUDE).step_by(7) {
            assert_eq!(decode(encode(value)?), value);
        }
        for value in [-MAX_MAGNITUDE, -1, 0, 1, MAX_MAGNITUDE] {
            assert_eq!(decode(encode(value)?), value);
        }

        Ok(())
    }

    #[test]
    fn test_encode_out_of_range() {
        assert_eq!(
            encode(MAX_MAGNITUDE + 1),
            Err(MachineErrorKind::NumberOutOfRange {
                value: MAX_MAGNITUDE + 1
            })
        );
        assert!(encode(i32::MIN).is_err());
        assert!(encode(-MAX_MAGNITUDE - 1).is_err());
    }

    #[test]
    fn test_decode_quirks() {
        // low bits of byte 0 are added, not shifted
        assert_eq!(decode([3, 0, 0, 0]), 3);
        // byte 2 is weighted by 16 even above 0xF
        assert_eq!(decode([0, 0, 0x20, 0]), 0x200);
        // any non-zero multiple of 8 in byte 0 negates
        assert_eq!(decode([16, 0, 0, 9]), -9);
        assert_eq!(decode([0xF0, 1, 0, 0]), -256);
        // byte 0 = 9 is positive and contributes 1
        assert_eq!(decode([9, 0, 0, 0]), 1);
    }

    #[test]
    fn test_arbitrary_bytes_do_not_round_trip() -> Result<()> {
        let bytes = [0, 0, 0x20, 0];
        assert_ne!(encode(decode(bytes))?, bytes);

        Ok(())
    }
}

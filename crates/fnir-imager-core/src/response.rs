//! LTC2494 response decoding
//!
//! Every transaction clocks out three bytes belonging to the *previous*
//! conversion. Byte 0 carries the status flags:
//!
//! ```text
//! byte0: bit7 = conversion in progress, bit5 = sign
//! ```
//!
//! The magnitude is assembled from `byte0 << 11`, `byte1 << 4` and
//! `byte2 >> 4`. The board firmware has always combined these with a
//! bitwise AND, which leaves no overlapping bits and therefore always
//! yields zero. Downstream calibration may already account for that, so
//! both combinations are kept and selected with [`MagnitudeDecoding`].

use serde::{Deserialize, Serialize};

/// Status bit in response byte 0
pub const STATUS_BIT: u8 = 1 << 7;
/// Sign bit in response byte 0
pub const SIGN_BIT: u8 = 1 << 5;

/// Conversion state reported alongside a result
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConversionStatus {
    /// The converter was still busy; the data is not trustworthy
    Ongoing,
    /// The conversion had completed
    Finished,
}

/// Sign flag of a result.
///
/// A set sign bit is reported as `Positive`, a clear one as `Negative`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sign {
    /// Sign bit set
    Positive,
    /// Sign bit clear
    Negative,
}

/// How the three response bytes are combined into the magnitude
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MagnitudeDecoding {
    /// Bitwise AND of the shifted bytes, bit-exact with the deployed firmware
    #[default]
    Legacy,
    /// Bitwise OR of the shifted bytes
    Combined,
}

impl MagnitudeDecoding {
    /// Combine the response bytes into a 16-bit magnitude
    #[must_use]
    pub const fn magnitude(self, bytes: [u8; 3]) -> u16 {
        let high = (bytes[0] as u32) << 11;
        let mid = (bytes[1] as u32) << 4;
        let low = (bytes[2] as u32) >> 4;

        // Truncation to 16 bits is part of the wire contract.
        match self {
            Self::Legacy => (high & mid & low) as u16,
            Self::Combined => (high | mid | low) as u16,
        }
    }
}

/// Decoded ADC response
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversionResult {
    /// Conversion status
    pub status: ConversionStatus,
    /// Sign flag
    pub sign: Sign,
    /// Normalized magnitude
    pub magnitude: u16,
}

impl ConversionResult {
    /// Result of an all-zero response (idle bus)
    pub const EMPTY: Self = Self {
        status: ConversionStatus::Finished,
        sign: Sign::Negative,
        magnitude: 0,
    };

    /// Decode a 3-byte response. Total: every input has a result.
    #[must_use]
    pub const fn decode(bytes: [u8; 3], decoding: MagnitudeDecoding) -> Self {
        let status = if bytes[0] & STATUS_BIT != 0 {
            ConversionStatus::Ongoing
        } else {
            ConversionStatus::Finished
        };
        let sign = if bytes[0] & SIGN_BIT != 0 { Sign::Positive } else { Sign::Negative };

        Self { status, sign, magnitude: decoding.magnitude(bytes) }
    }

    /// True when the conversion had completed
    #[inline]
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        matches!(self.status, ConversionStatus::Finished)
    }
}

impl Default for ConversionResult {
    fn default() -> Self {
        Self::EMPTY
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ConversionResult {
    fn format(&self, f: defmt::Formatter) {
        let sign = match self.sign {
            Sign::Positive => "+",
            Sign::Negative => "-",
        };
        let busy = if self.is_finished() { "" } else { " (busy)" };
        defmt::write!(f, "{}{}{}", sign, self.magnitude, busy);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_and_sign_bits() {
        let busy = ConversionResult::decode([0x80, 0, 0], MagnitudeDecoding::Legacy);
        assert_eq!(busy.status, ConversionStatus::Ongoing);
        assert_eq!(busy.sign, Sign::Negative);

        let positive = ConversionResult::decode([0x20, 0, 0], MagnitudeDecoding::Legacy);
        assert_eq!(positive.status, ConversionStatus::Finished);
        assert_eq!(positive.sign, Sign::Positive);

        // Bit 6 is neither flag
        let neither = ConversionResult::decode([0x40, 0, 0], MagnitudeDecoding::Legacy);
        assert_eq!(neither.status, ConversionStatus::Finished);
        assert_eq!(neither.sign, Sign::Negative);
    }

    #[test]
    fn test_combined_magnitude() {
        // 0x21 << 11 = 0x10800 -> 0x0800 after truncation
        // 0x34 << 4  = 0x0340
        // 0x56 >> 4  = 0x0005
        let result = ConversionResult::decode([0x21, 0x34, 0x56], MagnitudeDecoding::Combined);
        assert_eq!(result.magnitude, 0x0B45);
        assert_eq!(result.sign, Sign::Positive);
        assert!(result.is_finished());
    }

    #[test]
    fn test_legacy_magnitude_matches_firmware() {
        let bytes = [0x21, 0x34, 0x56];
        let firmware = (((bytes[0] as u32) << 11) & ((bytes[1] as u32) << 4) & ((bytes[2] as u32) >> 4)) as u16;
        let result = ConversionResult::decode(bytes, MagnitudeDecoding::Legacy);
        assert_eq!(result.magnitude, firmware);
        assert_eq!(result.magnitude, 0);
    }

    #[test]
    fn test_empty_matches_zero_response() {
        for decoding in [MagnitudeDecoding::Legacy, MagnitudeDecoding::Combined] {
            assert_eq!(ConversionResult::decode([0; 3], decoding), ConversionResult::EMPTY);
        }
    }

    #[test]
    fn test_decode_is_total() {
        for b0 in 0..=u8::MAX {
            for b1 in 0..=u8::MAX {
                for b2 in 0..=u8::MAX {
                    let bytes = [b0, b1, b2];
                    let legacy = ConversionResult::decode(bytes, MagnitudeDecoding::Legacy);
                    let combined = ConversionResult::decode(bytes, MagnitudeDecoding::Combined);

                    assert_eq!(legacy.status, combined.status);
                    assert_eq!(legacy.sign, combined.sign);
                    assert_eq!(legacy.is_finished(), b0 & 0x80 == 0);
                    // The AND combination never has overlapping bits
                    assert_eq!(legacy.magnitude, 0);
                }
            }
        }
    }
}

//! LTC2494 command word codec
//!
//! The ADC is configured by a 16-bit command word clocked in MSB first:
//!
//! ```text
//!  15 14 | 13 | 12  | 11  | 10 9 8 | 7   | 6  | 5 4 | 3   | 2 1 0
//!  1  0  | EN | SGL | ODD | A2..A0 | EN2 | IM | FA  | SPD | GS2..GS0
//! ```
//!
//! Every selector is a closed enum with a defined bit pattern, including
//! the `Null` variants which leave their field at zero ("keep previous
//! setting" on the chip). Fields are bit-disjoint, so encoding a
//! configuration is the bitwise OR of each field encoded alone.
//!
//! # Example
//!
//! ```rust
//! use fnir_imager_core::command::{
//!     ChannelSelector, CommandConfig, ConversionMode, ConversionSpeed, Gain, NoiseRejection,
//! };
//!
//! let start = CommandConfig::new(
//!     ConversionMode::Enable,
//!     ChannelSelector::SingleEnded0,
//!     NoiseRejection::Reject60Hz,
//!     ConversionSpeed::AutoCalibrate,
//!     Gain::X1,
//! );
//! assert_eq!(start.encode().bits(), 0xB090);
//! assert_eq!(CommandConfig::shutdown().encode().bits(), 0x8000);
//! ```

use serde::{Deserialize, Serialize};

/// Bit offsets and masks of the command word fields
pub mod layout {
    /// Preamble shift (2 bits)
    pub const PREAMBLE_SHIFT: u16 = 14;
    /// Preamble constant, identical for every command
    pub const PREAMBLE: u16 = 0b10;
    /// Primary enable bit
    pub const EN: u16 = 1 << 13;
    /// Single-ended (1) / differential (0) input
    pub const SGL: u16 = 1 << 12;
    /// Odd channel / reversed polarity
    pub const ODD: u16 = 1 << 11;
    /// Channel address shift (3 bits)
    pub const ADDR_SHIFT: u16 = 8;
    /// Channel address mask (unshifted)
    pub const ADDR_MASK: u16 = 0b111;
    /// Second enable bit, set when the configuration changes
    pub const EN2: u16 = 1 << 7;
    /// Internal temperature sensor select
    pub const IM: u16 = 1 << 6;
    /// Powerline rejection shift (2 bits)
    pub const FILTER_SHIFT: u16 = 4;
    /// Powerline rejection mask (unshifted)
    pub const FILTER_MASK: u16 = 0b11;
    /// Speed select bit
    pub const SPD: u16 = 1 << 3;
    /// Gain shift (3 bits)
    pub const GAIN_SHIFT: u16 = 0;
    /// Gain mask (unshifted)
    pub const GAIN_MASK: u16 = 0b111;

    /// Preamble bits in place
    pub const PREAMBLE_BITS: u16 = PREAMBLE << PREAMBLE_SHIFT;
}

// ============================================================================
// Selectors
// ============================================================================

/// Conversion handshake.
///
/// `Enable` sets both enable bits and loads the new configuration,
/// `Repeat` sets only the primary bit so the chip repeats the last
/// conversion unchanged, `Disable` clears both.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConversionMode {
    /// Shut the converter down after the current transaction
    Disable,
    /// Start a conversion with the settings in this word
    Enable,
    /// Repeat the previous conversion without changing settings
    Repeat,
}

impl ConversionMode {
    /// All modes
    pub const ALL: [Self; 3] = [Self::Disable, Self::Enable, Self::Repeat];

    /// Enable bits contributed to the command word
    #[must_use]
    pub const fn bits(self) -> u16 {
        match self {
            Self::Disable => 0,
            Self::Enable => layout::EN | layout::EN2,
            Self::Repeat => layout::EN,
        }
    }
}

/// Input multiplexer selection.
///
/// Differential pairs come forward/reverse per pair (`Differential0_1`
/// measures IN0 against IN1, `Differential1_0` the reverse), followed by the
/// sixteen single-ended inputs referenced to COM.
#[allow(missing_docs)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ChannelSelector {
    Differential0_1 = 0,
    Differential1_0,
    Differential2_3,
    Differential3_2,
    Differential4_5,
    Differential5_4,
    Differential6_7,
    Differential7_6,
    Differential8_9,
    Differential9_8,
    Differential10_11,
    Differential11_10,
    Differential12_13,
    Differential13_12,
    Differential14_15,
    Differential15_14,
    SingleEnded0,
    SingleEnded1,
    SingleEnded2,
    SingleEnded3,
    SingleEnded4,
    SingleEnded5,
    SingleEnded6,
    SingleEnded7,
    SingleEnded8,
    SingleEnded9,
    SingleEnded10,
    SingleEnded11,
    SingleEnded12,
    SingleEnded13,
    SingleEnded14,
    SingleEnded15,
    /// Internal temperature sensor; only sets the IM bit
    InternalTemperature,
    /// Leave the multiplexer unchanged
    Null,
}

/// Multiplexer bits for one input selection
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct MuxSetting {
    /// SGL bit
    pub single_ended: bool,
    /// ODD bit
    pub odd: bool,
    /// 3-bit channel address
    pub address: u8,
}

impl ChannelSelector {
    /// Every selector in declaration order
    pub const ALL: [Self; 34] = {
        use ChannelSelector::*;
        [
            Differential0_1, Differential1_0, Differential2_3, Differential3_2,
            Differential4_5, Differential5_4, Differential6_7, Differential7_6,
            Differential8_9, Differential9_8, Differential10_11, Differential11_10,
            Differential12_13, Differential13_12, Differential14_15, Differential15_14,
            SingleEnded0, SingleEnded1, SingleEnded2, SingleEnded3,
            SingleEnded4, SingleEnded5, SingleEnded6, SingleEnded7,
            SingleEnded8, SingleEnded9, SingleEnded10, SingleEnded11,
            SingleEnded12, SingleEnded13, SingleEnded14, SingleEnded15,
            InternalTemperature, Null,
        ]
    };

    /// Single-ended selector for input `n` (0-15)
    #[must_use]
    pub const fn single_ended(n: u8) -> Option<Self> {
        if n < 16 {
            Some(Self::ALL[16 + n as usize])
        } else {
            None
        }
    }

    /// Multiplexer bits, or `None` for the temperature and null selectors
    /// which do not touch SGL/ODD/address.
    #[must_use]
    pub const fn mux(self) -> Option<MuxSetting> {
        let index = self as u8;
        match index {
            0..=15 => Some(MuxSetting { single_ended: false, odd: index % 2 == 1, address: index / 2 }),
            16..=31 => {
                let input = index - 16;
                Some(MuxSetting { single_ended: true, odd: input % 2 == 1, address: input / 2 })
            }
            _ => None,
        }
    }

    /// Multiplexer bits contributed to the command word
    #[must_use]
    pub const fn bits(self) -> u16 {
        match self {
            Self::InternalTemperature => layout::IM,
            Self::Null => 0,
            _ => match self.mux() {
                Some(mux) => {
                    let mut bits = (mux.address as u16 & layout::ADDR_MASK) << layout::ADDR_SHIFT;
                    if mux.single_ended {
                        bits |= layout::SGL;
                    }
                    if mux.odd {
                        bits |= layout::ODD;
                    }
                    bits
                }
                None => 0,
            },
        }
    }
}

/// Powerline noise rejection
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoiseRejection {
    /// Reject 50 Hz
    Reject50Hz,
    /// Reject 60 Hz
    Reject60Hz,
    /// Reject both 50 Hz and 60 Hz
    Reject50And60Hz,
    /// Leave unchanged
    Null,
}

impl NoiseRejection {
    /// All variants
    pub const ALL: [Self; 4] = [Self::Reject50Hz, Self::Reject60Hz, Self::Reject50And60Hz, Self::Null];

    /// Filter bits contributed to the command word
    #[must_use]
    pub const fn bits(self) -> u16 {
        let code = match self {
            Self::Reject50Hz | Self::Null => 0b00,
            Self::Reject60Hz => 0b01,
            Self::Reject50And60Hz => 0b10,
        };
        (code & layout::FILTER_MASK) << layout::FILTER_SHIFT
    }
}

/// Conversion speed
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConversionSpeed {
    /// 1x output rate with continuous offset calibration
    AutoCalibrate,
    /// 2x output rate, no auto-calibration
    DoubleSpeed,
    /// Leave unchanged
    Null,
}

impl ConversionSpeed {
    /// All variants
    pub const ALL: [Self; 3] = [Self::AutoCalibrate, Self::DoubleSpeed, Self::Null];

    /// Speed bit contributed to the command word
    #[must_use]
    pub const fn bits(self) -> u16 {
        match self {
            Self::DoubleSpeed => layout::SPD,
            Self::AutoCalibrate | Self::Null => 0,
        }
    }
}

/// Programmable gain
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gain {
    /// 1x (unity)
    X1,
    /// 2x
    X2,
    /// 4x
    X4,
    /// 8x
    X8,
    /// 16x
    X16,
    /// 32x
    X32,
    /// 64x
    X64,
    /// 128x
    X128,
    /// Leave unchanged
    Null,
}

impl Gain {
    /// All variants
    pub const ALL: [Self; 9] = [
        Self::X1, Self::X2, Self::X4, Self::X8, Self::X16,
        Self::X32, Self::X64, Self::X128, Self::Null,
    ];

    /// Gain multiplier, `None` for `Null`
    #[must_use]
    pub const fn multiplier(self) -> Option<u8> {
        match self {
            Self::X1 => Some(1),
            Self::X2 => Some(2),
            Self::X4 => Some(4),
            Self::X8 => Some(8),
            Self::X16 => Some(16),
            Self::X32 => Some(32),
            Self::X64 => Some(64),
            Self::X128 => Some(128),
            Self::Null => None,
        }
    }

    /// Gain bits contributed to the command word
    #[must_use]
    pub const fn bits(self) -> u16 {
        let code: u16 = match self.multiplier() {
            // log2 of the multiplier
            Some(m) => m.trailing_zeros() as u16,
            None => 0,
        };
        (code & layout::GAIN_MASK) << layout::GAIN_SHIFT
    }
}

// ============================================================================
// Command Configuration
// ============================================================================

/// A complete command: one choice per selector.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandConfig {
    /// Enable handshake
    pub mode: ConversionMode,
    /// Input multiplexer
    pub channel: ChannelSelector,
    /// Powerline rejection
    pub rejection: NoiseRejection,
    /// Conversion speed
    pub speed: ConversionSpeed,
    /// Gain stage
    pub gain: Gain,
}

impl CommandConfig {
    /// Create a command from its five selectors
    #[must_use]
    pub const fn new(
        mode: ConversionMode,
        channel: ChannelSelector,
        rejection: NoiseRejection,
        speed: ConversionSpeed,
        gain: Gain,
    ) -> Self {
        Self { mode, channel, rejection, speed, gain }
    }

    /// Disable with every other selector at `Null`.
    ///
    /// Used to fetch the pending result while shutting the converter down.
    #[must_use]
    pub const fn shutdown() -> Self {
        Self::new(
            ConversionMode::Disable,
            ChannelSelector::Null,
            NoiseRejection::Null,
            ConversionSpeed::Null,
            Gain::Null,
        )
    }

    /// Pack into the 16-bit command word
    #[must_use]
    pub const fn encode(&self) -> CommandWord {
        CommandWord(
            layout::PREAMBLE_BITS
                | self.mode.bits()
                | self.channel.bits()
                | self.rejection.bits()
                | self.speed.bits()
                | self.gain.bits(),
        )
    }
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self::shutdown()
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for CommandConfig {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Cmd(0x{:04X})", self.encode().bits());
    }
}

// ============================================================================
// Command Word
// ============================================================================

/// Encoded 16-bit command word
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandWord(u16);

impl CommandWord {
    /// Wrap raw bits
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    /// Raw bits
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Bytes in transmission order (high byte first)
    #[inline]
    #[must_use]
    pub const fn to_bytes(self) -> [u8; 2] {
        self.0.to_be_bytes()
    }

    /// Full 3-byte transaction frame: command word plus one dummy byte
    #[inline]
    #[must_use]
    pub const fn frame(self) -> [u8; 3] {
        let [hi, lo] = self.to_bytes();
        [hi, lo, 0x00]
    }

    /// 2-bit preamble
    #[must_use]
    pub const fn preamble(self) -> u16 {
        self.0 >> layout::PREAMBLE_SHIFT
    }

    /// Primary enable bit
    #[must_use]
    pub const fn enabled(self) -> bool {
        self.0 & layout::EN != 0
    }

    /// Second enable bit
    #[must_use]
    pub const fn settings_changed(self) -> bool {
        self.0 & layout::EN2 != 0
    }

    /// SGL bit
    #[must_use]
    pub const fn single_ended(self) -> bool {
        self.0 & layout::SGL != 0
    }

    /// ODD bit
    #[must_use]
    pub const fn odd(self) -> bool {
        self.0 & layout::ODD != 0
    }

    /// 3-bit channel address
    #[must_use]
    pub const fn address(self) -> u8 {
        ((self.0 >> layout::ADDR_SHIFT) & layout::ADDR_MASK) as u8
    }

    /// IM bit
    #[must_use]
    pub const fn internal_temperature(self) -> bool {
        self.0 & layout::IM != 0
    }

    /// 2-bit rejection code
    #[must_use]
    pub const fn filter(self) -> u8 {
        ((self.0 >> layout::FILTER_SHIFT) & layout::FILTER_MASK) as u8
    }

    /// Speed bit
    #[must_use]
    pub const fn double_speed(self) -> bool {
        self.0 & layout::SPD != 0
    }

    /// 3-bit gain code
    #[must_use]
    pub const fn gain(self) -> u8 {
        ((self.0 >> layout::GAIN_SHIFT) & layout::GAIN_MASK) as u8
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for CommandWord {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "0x{:04X}", self.0);
    }
}

// ============================================================================
// Tests
// ============================================================================

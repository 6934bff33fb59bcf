//! Core scan types
//!
//! The imager measures 16 scan channels. Each channel is lit by one of four
//! dual-wavelength LED groups and read through a single-ended ADC input;
//! several channels share a photodiode input because of how the board is
//! wired (see [`ScanChannel::selector`]).

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::command::ChannelSelector;
use crate::error::ScanFaultKind;
use crate::response::ConversionResult;

/// Number of scan channels
pub const SCAN_CHANNELS: u8 = 16;

/// Channels per LED group
pub const CHANNELS_PER_GROUP: u8 = 4;

// ============================================================================
// Illumination
// ============================================================================

/// NIR illumination for one measurement.
///
/// The two wavelengths sit either side of the hemoglobin isosbestic point
/// (~800nm); the dark reading is the ambient/offset baseline.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum Illuminant {
    /// All LEDs off
    Off = 0,
    /// 730nm: HbR absorbs more strongly
    Nm730 = 730,
    /// 850nm: HbO₂ absorbs more strongly
    Nm850 = 850,
}

impl Illuminant {
    /// Wavelength in nanometers, `None` when dark
    #[inline]
    #[must_use]
    pub const fn nm(self) -> Option<u16> {
        match self {
            Self::Off => None,
            Self::Nm730 | Self::Nm850 => Some(self as u16),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Illuminant {
    fn format(&self, f: defmt::Formatter) {
        match self.nm() {
            Some(nm) => defmt::write!(f, "{}nm", nm),
            None => defmt::write!(f, "dark"),
        }
    }
}

/// One of the four LED groups (a 730nm + 850nm pair)
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LedGroup(u8);

impl LedGroup {
    /// Number of groups on the board
    pub const COUNT: u8 = SCAN_CHANNELS / CHANNELS_PER_GROUP;

    /// Create a group index (0-3)
    #[must_use]
    pub const fn new(index: u8) -> Option<Self> {
        if index < Self::COUNT {
            Some(Self(index))
        } else {
            None
        }
    }

    /// Group index
    #[inline]
    #[must_use]
    pub const fn index(self) -> u8 {
        self.0
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for LedGroup {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "G{}", self.0);
    }
}

// ============================================================================
// Scan Channels
// ============================================================================

/// Scan channel id to ADC input.
///
/// Pairs (2,4) (3,5) (6,8) (7,9) (10,12) (11,13) share one photodiode input
/// each; 14 and 15 have their own.
const CHANNEL_INPUTS: [ChannelSelector; SCAN_CHANNELS as usize] = [
    ChannelSelector::SingleEnded0,
    ChannelSelector::SingleEnded1,
    ChannelSelector::SingleEnded2,
    ChannelSelector::SingleEnded3,
    ChannelSelector::SingleEnded2,
    ChannelSelector::SingleEnded3,
    ChannelSelector::SingleEnded4,
    ChannelSelector::SingleEnded5,
    ChannelSelector::SingleEnded4,
    ChannelSelector::SingleEnded5,
    ChannelSelector::SingleEnded6,
    ChannelSelector::SingleEnded7,
    ChannelSelector::SingleEnded6,
    ChannelSelector::SingleEnded7,
    ChannelSelector::SingleEnded9,
    ChannelSelector::SingleEnded11,
];

/// A validated scan channel id (0-15)
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScanChannel(u8);

impl ScanChannel {
    /// First channel of a scan
    pub const FIRST: Self = Self(0);

    /// Validate a channel id
    #[must_use]
    pub const fn new(id: u8) -> Option<Self> {
        if id < SCAN_CHANNELS {
            Some(Self(id))
        } else {
            None
        }
    }

    /// Channel id
    #[inline]
    #[must_use]
    pub const fn id(self) -> u8 {
        self.0
    }

    /// ADC input wired to this channel
    #[inline]
    #[must_use]
    pub const fn selector(self) -> ChannelSelector {
        CHANNEL_INPUTS[self.0 as usize]
    }

    /// LED group illuminating this channel
    #[inline]
    #[must_use]
    pub const fn led_group(self) -> LedGroup {
        LedGroup(self.0 / CHANNELS_PER_GROUP)
    }
}

impl fmt::Display for ScanChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CH{}", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ScanChannel {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "CH{}", self.0);
    }
}

// ============================================================================
// Scan State
// ============================================================================

/// Phase of the per-channel scan state machine.
///
/// `Null → Nir730 → Nir850 → Idle → Null`, one step per tick. `Stop`
/// preempts everything and is only left through a host command.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ScanPhase {
    /// Settle tick, no hardware access
    Null = 0,
    /// Measure with the 730nm LED
    Nir730 = 1,
    /// Measure with the 850nm LED
    Nir850 = 2,
    /// Dark measurement, then report and advance
    Idle = 3,
    /// Paused
    #[default]
    Stop = 4,
}

impl ScanPhase {
    /// Phase that follows a successful tick
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Null => Self::Nir730,
            Self::Nir730 => Self::Nir850,
            Self::Nir850 => Self::Idle,
            Self::Idle => Self::Null,
            Self::Stop => Self::Stop,
        }
    }

    /// Illumination and triple slot for measuring phases
    #[must_use]
    pub const fn measurement(self) -> Option<(Illuminant, usize)> {
        match self {
            Self::Nir730 => Some((Illuminant::Nm730, 0)),
            Self::Nir850 => Some((Illuminant::Nm850, 1)),
            Self::Idle => Some((Illuminant::Off, 2)),
            Self::Null | Self::Stop => None,
        }
    }

    /// Short name for logs
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Nir730 => "730nm",
            Self::Nir850 => "850nm",
            Self::Idle => "dark",
            Self::Stop => "stop",
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ScanPhase {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{}", self.name());
    }
}

/// The three readings taken for one channel
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasurementTriple {
    /// Reading with the 730nm LED on
    pub nir730: ConversionResult,
    /// Reading with the 850nm LED on
    pub nir850: ConversionResult,
    /// Dark baseline
    pub dark: ConversionResult,
}

impl MeasurementTriple {
    /// Build from slot order `[730nm, 850nm, dark]`
    #[must_use]
    pub const fn from_slots(slots: [ConversionResult; 3]) -> Self {
        Self { nir730: slots[0], nir850: slots[1], dark: slots[2] }
    }
}

/// A completed channel measurement
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelReport {
    /// Channel measured
    pub channel: ScanChannel,
    /// Its readings
    pub triple: MeasurementTriple,
}

#[cfg(feature = "defmt")]
impl defmt::Format for ChannelReport {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f, "{}: 730nm={} 850nm={} dark={}",
            self.channel, self.triple.nir730, self.triple.nir850, self.triple.dark
        );
    }
}

/// A fault raised while scanning, as seen by the host
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanFault {
    /// Raw channel id the sequencer was on
    pub channel: u8,
    /// Phase that failed (and will be retried unless the channel was invalid)
    pub phase: ScanPhase,
    /// What went wrong
    pub kind: ScanFaultKind,
}

impl fmt::Display for ScanFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CH{} {}: {}", self.channel, self.phase.name(), self.kind)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ScanFault {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "CH{} {}: {}", self.channel, self.phase, self.kind);
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Driver and scan configuration
//!
//! Both structs are plain `Copy` values so they can live in a `static` on
//! the board and be sent over the wire by the host.

use serde::{Deserialize, Serialize};

use crate::command::{ChannelSelector, CommandConfig, ConversionMode, ConversionSpeed, Gain, NoiseRejection};
use crate::response::MagnitudeDecoding;
use crate::types::{ScanChannel, SCAN_CHANNELS};

/// Default bound on the conversion-ready poll (µs).
///
/// A 60Hz-rejecting conversion takes ~150ms at 1x speed; twice that is the
/// longest a healthy converter keeps the line high.
pub const DEFAULT_READY_TIMEOUT_US: u32 = 300_000;

/// Default interval between conversion-ready polls (µs)
pub const DEFAULT_READY_POLL_INTERVAL_US: u32 = 1_000;

// ============================================================================
// ADC Configuration
// ============================================================================

/// LTC2494 driver configuration
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdcConfig {
    /// Response magnitude combination
    pub magnitude: MagnitudeDecoding,
    /// Give up on a conversion after this long (µs)
    pub ready_timeout_us: u32,
    /// Delay between polls of the ready line (µs)
    pub ready_poll_interval_us: u32,
}

impl Default for AdcConfig {
    fn default() -> Self {
        Self {
            magnitude: MagnitudeDecoding::Legacy,
            ready_timeout_us: DEFAULT_READY_TIMEOUT_US,
            ready_poll_interval_us: DEFAULT_READY_POLL_INTERVAL_US,
        }
    }
}

// ============================================================================
// Scan Configuration
// ============================================================================

/// How the scan channel advances after the last channel.
///
/// The board firmware checks `channel < 16` before incrementing, so the id
/// reaches 16 before it wraps. `Legacy` keeps that sequence; the invalid
/// channel is reported as a fault and skipped.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelWrap {
    /// `(channel + 1) % 16`
    #[default]
    Modulo,
    /// `channel + 1` while below 16, else 0
    Legacy,
}

impl ChannelWrap {
    /// Raw channel id following `channel`
    #[must_use]
    pub const fn advance(self, channel: u8) -> u8 {
        match self {
            Self::Modulo => (channel.wrapping_add(1)) % SCAN_CHANNELS,
            Self::Legacy => {
                if channel < SCAN_CHANNELS {
                    channel + 1
                } else {
                    0
                }
            }
        }
    }
}

/// Scan sequencer configuration
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Powerline rejection for every measurement
    pub rejection: NoiseRejection,
    /// Conversion speed for every measurement
    pub speed: ConversionSpeed,
    /// Gain for every measurement
    pub gain: Gain,
    /// Channel advance after the last channel
    pub channel_wrap: ChannelWrap,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            rejection: NoiseRejection::Reject60Hz,
            speed: ConversionSpeed::AutoCalibrate,
            gain: Gain::X1,
            channel_wrap: ChannelWrap::Modulo,
        }
    }
}

impl ScanConfig {
    /// Command that starts a conversion on `channel`
    #[must_use]
    pub const fn start_command(&self, channel: ScanChannel) -> CommandConfig {
        self.command_for(channel.selector())
    }

    /// Enable command for an arbitrary input
    #[must_use]
    pub const fn command_for(&self, input: ChannelSelector) -> CommandConfig {
        CommandConfig::new(ConversionMode::Enable, input, self.rejection, self.speed, self.gain)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ScanConfig {
    fn format(&self, f: defmt::Formatter) {
        let wrap = match self.channel_wrap {
            ChannelWrap::Modulo => "modulo",
            ChannelWrap::Legacy => "legacy",
        };
        defmt::write!(f, "ScanConfig(wrap={})", wrap);
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Error types for the fNIR imager
//!
//! All errors work in `no_std` environments and carry enough context to
//! be reported to the host without heap allocation. The command codec has
//! no error type: every selector variant has a defined bit pattern.

use core::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// ADC Driver Errors
// ============================================================================

/// Errors from the LTC2494 ADC driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdcError<E> {
    /// Byte exchange on the serial bus failed
    Spi(E),
    /// Chip-select pin could not be driven
    ChipSelect,
    /// Conversion-ready line could not be read
    ReadyLine,
    /// Conversion did not finish within the configured bound
    ConversionTimeout {
        /// Timeout duration in microseconds
        timeout_us: u32,
    },
}

impl<E> AdcError<E> {
    /// True for the conversion-ready timeout
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::ConversionTimeout { .. })
    }
}

impl<E: fmt::Debug> fmt::Display for AdcError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spi(e) => write!(f, "SPI communication error: {e:?}"),
            Self::ChipSelect => write!(f, "Chip-select pin error"),
            Self::ReadyLine => write!(f, "Conversion-ready line error"),
            Self::ConversionTimeout { timeout_us } => {
                write!(f, "ADC conversion timeout after {timeout_us}µs")
            }
        }
    }
}

#[cfg(feature = "defmt")]
impl<E: defmt::Format> defmt::Format for AdcError<E> {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Spi(e) => defmt::write!(f, "SPI error: {}", e),
            Self::ChipSelect => defmt::write!(f, "CS error"),
            Self::ReadyLine => defmt::write!(f, "Ready line error"),
            Self::ConversionTimeout { timeout_us } => {
                defmt::write!(f, "ADC timeout: {}us", timeout_us);
            }
        }
    }
}

// ============================================================================
// Scan Errors
// ============================================================================

/// Errors from one scan sequencer tick.
///
/// `EB` is the serial bus error, `EL` the LED driver error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanError<EB, EL> {
    /// Measurement transaction failed
    Adc(AdcError<EB>),
    /// LED selection failed
    Illumination(EL),
    /// Channel id has no input mapping
    ChannelOutOfRange {
        /// The rejected channel id
        channel: u8,
    },
}

impl<EB, EL> ScanError<EB, EL> {
    /// Classification handed to the host reporter
    #[must_use]
    pub const fn kind(&self) -> ScanFaultKind {
        match self {
            Self::Adc(AdcError::ConversionTimeout { timeout_us }) => {
                ScanFaultKind::BusTimeout { timeout_us: *timeout_us }
            }
            Self::Adc(_) => ScanFaultKind::Bus,
            Self::Illumination(_) => ScanFaultKind::Illumination,
            Self::ChannelOutOfRange { channel } => ScanFaultKind::ChannelRange { channel: *channel },
        }
    }

    /// Whether the sequencer stays on the failed phase and retries it
    #[must_use]
    pub const fn is_retried(&self) -> bool {
        !matches!(self, Self::ChannelOutOfRange { .. })
    }
}

impl<EB, EL> From<AdcError<EB>> for ScanError<EB, EL> {
    fn from(e: AdcError<EB>) -> Self {
        Self::Adc(e)
    }
}

impl<EB: fmt::Debug, EL: fmt::Debug> fmt::Display for ScanError<EB, EL> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Adc(e) => write!(f, "Measurement failed: {e}"),
            Self::Illumination(e) => write!(f, "LED selection failed: {e:?}"),
            Self::ChannelOutOfRange { channel } => {
                write!(f, "Scan channel {channel} has no ADC input")
            }
        }
    }
}

#[cfg(feature = "defmt")]
impl<EB: defmt::Format, EL: defmt::Format> defmt::Format for ScanError<EB, EL> {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Adc(e) => defmt::write!(f, "Measure: {}", e),
            Self::Illumination(e) => defmt::write!(f, "LED: {}", e),
            Self::ChannelOutOfRange { channel } => defmt::write!(f, "Bad channel {}", channel),
        }
    }
}

/// Bus-independent fault classification
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScanFaultKind {
    /// Conversion-ready poll timed out
    BusTimeout {
        /// Timeout duration in microseconds
        timeout_us: u32,
    },
    /// Serial bus or its control lines failed
    Bus,
    /// LED selection failed
    Illumination,
    /// Channel id outside 0..16
    ChannelRange {
        /// The rejected channel id
        channel: u8,
    },
}

impl fmt::Display for ScanFaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BusTimeout { timeout_us } => write!(f, "bus timeout after {timeout_us}us"),
            Self::Bus => write!(f, "bus error"),
            Self::Illumination => write!(f, "LED error"),
            Self::ChannelRange { channel } => write!(f, "channel {channel} out of range"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ScanFaultKind {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::BusTimeout { timeout_us } => defmt::write!(f, "timeout {}us", timeout_us),
            Self::Bus => defmt::write!(f, "bus"),
            Self::Illumination => defmt::write!(f, "led"),
            Self::ChannelRange { channel } => defmt::write!(f, "range {}", channel),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

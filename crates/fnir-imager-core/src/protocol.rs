//! Host link protocol
//!
//! The board talks to the host over a CDC serial port using plain text:
//!
//! - host → device: single command bytes (`s` start, `p` stop)
//! - device → host: CRLF-terminated lines (acknowledgements and one CSV
//!   record per measured channel)
//!
//! ```text
//! channel,nir730,nir850,dark,estimate\r\n
//! ```

use core::fmt::{self, Write};

use heapless::String;
use serde::{Deserialize, Serialize};

use crate::types::{ChannelReport, ScanFault};

/// Line sent once the host has enumerated the device
pub const DEVICE_CONNECTED: &str = "Device Connected\r\n";

/// Longest line the device emits.
///
/// `"15,65535,65535,65535,65535\r\n"` is 28 bytes.
pub const MAX_LINE_LEN: usize = 32;

/// A single outgoing text line
pub type Line = String<MAX_LINE_LEN>;

// ============================================================================
// Host Commands
// ============================================================================

/// Command byte received from the host
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum HostCommand {
    /// Begin (or restart) scanning from the settle phase
    Start = b's',
    /// Pause scanning
    Stop = b'p',
}

impl HostCommand {
    /// Parse a command byte; anything else is ignored by the device
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b's' => Some(Self::Start),
            b'p' => Some(Self::Stop),
            _ => None,
        }
    }

    /// Wire byte
    #[inline]
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }

    /// Acknowledgement line sent back to the host
    #[must_use]
    pub const fn acknowledgement(self) -> &'static str {
        match self {
            Self::Start => "Starting\r\n",
            Self::Stop => "Stopping\r\n",
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for HostCommand {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Start => defmt::write!(f, "Start"),
            Self::Stop => defmt::write!(f, "Stop"),
        }
    }
}

// ============================================================================
// Report Records
// ============================================================================

/// One CSV record sent per measured channel
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRecord {
    /// Channel id
    pub channel: u8,
    /// 730nm magnitude
    pub nir730: u16,
    /// 850nm magnitude
    pub nir850: u16,
    /// Dark magnitude
    pub dark: u16,
    /// Oxygenation estimate; always 0 until the estimator exists
    pub estimate: u16,
}

impl ReportRecord {
    /// Build a record from a completed channel
    #[must_use]
    pub const fn from_report(report: &ChannelReport) -> Self {
        Self {
            channel: report.channel.id(),
            nir730: report.triple.nir730.magnitude,
            nir850: report.triple.nir850.magnitude,
            dark: report.triple.dark.magnitude,
            estimate: 0,
        }
    }

    /// Render as a CRLF-terminated CSV line
    ///
    /// # Errors
    ///
    /// Never fails for records built from the sequencer; the line buffer is
    /// sized for the widest possible record.
    pub fn to_line(&self) -> Result<Line, fmt::Error> {
        let mut line = Line::new();
        write!(line, "{self}\r\n")?;
        Ok(line)
    }
}

impl From<&ChannelReport> for ReportRecord {
    fn from(report: &ChannelReport) -> Self {
        Self::from_report(report)
    }
}

impl fmt::Display for ReportRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{},{}", self.channel, self.nir730, self.nir850, self.dark, self.estimate)
    }
}

/// Render a scan fault as a host line (`#`-prefixed so CSV parsers skip it)
///
/// # Errors
///
/// Returns `fmt::Error` if the message does not fit in a line.
pub fn fault_line(fault: &ScanFault) -> Result<String<64>, fmt::Error> {
    let mut line = String::new();
    write!(line, "# {fault}\r\n")?;
    Ok(line)
}

// ============================================================================
// Tests
// ============================================================================

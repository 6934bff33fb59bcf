//! fNIR Imager Core - `no_std` codecs and types
//!
//! This crate holds everything about the imager board that does not touch
//! hardware: the LTC2494 command and response codecs, the scan channel map,
//! configuration, errors and the host text protocol. It is designed to
//! work in `no_std` environments (the board) as well as `std` environments
//! (host tools and tests).
//!
//! # Modules
//!
//! - [`command`]: 16-bit LTC2494 command word encoding
//! - [`response`]: 3-byte conversion result decoding
//! - [`types`]: Scan channels, LED groups, phases and measurements
//! - [`config`]: ADC driver and scan configuration
//! - [`error`]: Error types for the driver and the sequencer
//! - [`protocol`]: Host command bytes and CSV report lines
//!
//! # Features
//!
//! - `std`: Enable standard library support
//! - `defmt`: Enable `defmt` formatting for embedded logging
//!
//! # Example
//!
//! ```rust
//! use fnir_imager_core::config::ScanConfig;
//! use fnir_imager_core::response::{ConversionResult, MagnitudeDecoding};
//! use fnir_imager_core::types::ScanChannel;
//!
//! // Start a conversion on channel 15 (single-ended input 11)
//! let channel = ScanChannel::new(15).unwrap();
//! let frame = ScanConfig::default().start_command(channel).encode().frame();
//! assert_eq!(frame, [0xBD, 0x90, 0x00]);
//!
//! // Decode what the converter clocked back
//! let result = ConversionResult::decode([0x21, 0x34, 0x56], MagnitudeDecoding::Combined);
//! assert_eq!(result.magnitude, 0x0B45);
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

#[cfg(feature = "std")]
extern crate std;

pub mod command;
pub mod config;
pub mod error;
pub mod protocol;
pub mod response;
pub mod types;

// Re-export commonly used types at crate root
pub use command::{
    ChannelSelector, CommandConfig, CommandWord, ConversionMode, ConversionSpeed, Gain, NoiseRejection,
};
pub use config::{AdcConfig, ChannelWrap, ScanConfig};
pub use error::{AdcError, ScanError, ScanFaultKind};
pub use protocol::{HostCommand, ReportRecord};
pub use response::{ConversionResult, ConversionStatus, MagnitudeDecoding, Sign};
pub use types::{
    ChannelReport, Illuminant, LedGroup, MeasurementTriple, ScanChannel, ScanFault, ScanPhase,
};

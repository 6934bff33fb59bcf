//! fNIR Imager Embedded - board drivers and scan sequencing
//!
//! This crate provides the hardware side of the fNIR imager:
//! - LTC2494 ADC driver (SPI, embedded-hal 1.0)
//! - NIR LED bank driver (GPIO)
//! - Scan sequencer stepping 16 channels through 730nm, 850nm and dark
//!   measurements
//!
//! # Hardware
//!
//! - LTC2494 16-bit, 16-input delta-sigma ADC
//! - Four dual-wavelength NIR LED groups (730nm + 850nm)
//! - Photodiode amplifiers on single-ended inputs 0-7, 9 and 11
//!
//! # Pin Assignments
//!
//! ```text
//! SPI (LTC2494):  SCK, MOSI, MISO, CS; MISO doubles as conversion-ready
//! LEDs:           8 outputs (730nm on even, 850nm on odd)
//! ```
//!
//! # Example
//!
//! ```ignore
//! let adc = Ltc2494::new(spi, cs, miso_ready, delay, AdcConfig::default());
//! let leds = GpioIlluminator::new(led_pins);
//! let mut scanner = ScanSequencer::new(adc, leds, ScanConfig::default());
//! scanner.init()?;
//!
//! loop {
//!     if let Some(command) = usb.read_byte().and_then(HostCommand::from_byte) {
//!         usb.write_str(scanner.apply(command));
//!     }
//!     let _ = scanner.tick(&mut usb_reporter);
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod drivers;
pub mod scan;

#[cfg(test)]
mod mock;

// Re-export driver types
pub use drivers::ltc2494::Ltc2494;
pub use drivers::nir_leds::GpioIlluminator;

// Re-export the sequencer and its capabilities
pub use scan::{ChannelAdc, Illuminator, ScanReporter, ScanSequencer, TickError, TickOutcome};

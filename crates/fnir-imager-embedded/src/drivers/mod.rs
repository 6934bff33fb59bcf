//! Hardware drivers for the imager board
//!
//! - [`ltc2494`]: LTC2494 16-bit delta-sigma ADC (SPI)
//! - [`nir_leds`]: 730nm/850nm NIR LED bank (GPIO)

pub mod ltc2494;
pub mod nir_leds;

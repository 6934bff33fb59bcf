//! LTC2494 ADC Driver
//!
//! Driver for the Analog Devices (Linear) LTC2494, a 16-bit, 16-input
//! delta-sigma ADC with an SPI-like serial interface. On the imager board it
//! digitizes the photodiode amplifiers behind the NIR LEDs.
//!
//! # Protocol
//!
//! Every transaction is three bytes in each direction. The host shifts in a
//! 16-bit command word followed by a zero byte; the converter shifts out the
//! result of the *previous* conversion at the same time. A measurement is
//! therefore:
//!
//! 1. assert CS
//! 2. send the enable command for the wanted input (response discarded)
//! 3. wait while the converter holds its ready line (SDO) high
//! 4. send the shutdown command, which clocks out the new result
//! 5. release CS
//!
//! CS stays asserted for the whole sequence so nothing else can use the bus
//! between starting and fetching a conversion.
//!
//! # Example
//!
//! ```ignore
//! let mut adc = Ltc2494::new(spi, cs, sdo, delay, AdcConfig::default());
//! adc.init()?;
//!
//! let command = ScanConfig::default().start_command(channel);
//! let result = adc.measure(command)?;
//! ```

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiBus;

use fnir_imager_core::command::{CommandConfig, CommandWord};
use fnir_imager_core::config::AdcConfig;
use fnir_imager_core::error::AdcError;
use fnir_imager_core::response::ConversionResult;

use crate::scan::ChannelAdc;

/// Bytes per transaction
pub const FRAME_LEN: usize = 3;

/// LTC2494 driver
///
/// `BUSY` is the conversion-ready line (the converter's SDO pin, high while
/// a conversion is in progress). The SPI peripheral's bit order and clock
/// are configured by the HAL before it is handed over.
pub struct Ltc2494<SPI, CS, BUSY, D> {
    spi: SPI,
    cs: CS,
    busy: BUSY,
    delay: D,
    config: AdcConfig,
}

impl<SPI, CS, BUSY, D, E> Ltc2494<SPI, CS, BUSY, D>
where
    SPI: SpiBus<u8, Error = E>,
    CS: OutputPin,
    BUSY: InputPin,
    D: DelayNs,
{
    /// Create a new LTC2494 driver
    #[must_use]
    pub fn new(spi: SPI, cs: CS, busy: BUSY, delay: D, config: AdcConfig) -> Self {
        Self { spi, cs, busy, delay, config }
    }

    /// Release the bus and pins
    pub fn release(self) -> (SPI, CS, BUSY, D) {
        (self.spi, self.cs, self.busy, self.delay)
    }

    /// Initialize the LTC2494
    ///
    /// Clocks three zero bytes through the converter to flush whatever was
    /// left in the serial buffers at power-up.
    pub fn init(&mut self) -> Result<(), AdcError<E>> {
        self.selected(|adc| {
            let mut flush = [0u8; FRAME_LEN];
            adc.spi.transfer_in_place(&mut flush).map_err(AdcError::Spi)?;
            adc.spi.flush().map_err(AdcError::Spi)
        })?;

        #[cfg(feature = "defmt")]
        defmt::debug!("LTC2494: serial buffers flushed");

        Ok(())
    }

    /// Run one raw transaction: send `command`, return the response it
    /// clocked out (the previous conversion's result).
    pub fn transfer(&mut self, command: CommandConfig) -> Result<ConversionResult, AdcError<E>> {
        let word = command.encode();
        self.selected(|adc| adc.exchange(word))
    }

    /// Start a conversion with `command`, wait for it and fetch the result
    /// while shutting the converter down.
    pub fn measure(&mut self, command: CommandConfig) -> Result<ConversionResult, AdcError<E>> {
        let start = command.encode();

        let result = self.selected(|adc| {
            // Data from whatever ran before; not ours
            adc.exchange(start)?;
            adc.wait_ready()?;
            adc.exchange(CommandConfig::shutdown().encode())
        })?;

        #[cfg(feature = "defmt")]
        defmt::debug!("LTC2494: {} -> {}", start, result);

        Ok(result)
    }

    /// Check the ready line (true while a conversion is running)
    #[inline]
    pub fn conversion_busy(&mut self) -> Result<bool, AdcError<E>> {
        self.busy.is_high().map_err(|_| AdcError::ReadyLine)
    }

    /// Run `f` with CS asserted. CS is released on every path; a failed
    /// release is only reported when `f` itself succeeded.
    fn selected<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, AdcError<E>>,
    ) -> Result<T, AdcError<E>> {
        self.cs.set_low().map_err(|_| AdcError::ChipSelect)?;
        let result = f(self);
        let released = self.cs.set_high();

        let value = result?;
        released.map_err(|_| AdcError::ChipSelect)?;
        Ok(value)
    }

    fn exchange(&mut self, word: CommandWord) -> Result<ConversionResult, AdcError<E>> {
        let mut frame = word.frame();
        self.spi.transfer_in_place(&mut frame).map_err(AdcError::Spi)?;
        self.spi.flush().map_err(AdcError::Spi)?;
        Ok(ConversionResult::decode(frame, self.config.magnitude))
    }

    /// Poll the ready line until it drops or the configured timeout passes.
    /// The delays never add up to more than the timeout.
    fn wait_ready(&mut self) -> Result<(), AdcError<E>> {
        let timeout = self.config.ready_timeout_us;
        let interval = self.config.ready_poll_interval_us.max(1);
        let mut waited = 0u32;

        loop {
            if !self.conversion_busy()? {
                return Ok(());
            }
            if waited >= timeout {
                break;
            }
            let step = interval.min(timeout - waited);
            self.delay.delay_us(step);
            waited += step;
        }

        #[cfg(feature = "defmt")]
        defmt::warn!("LTC2494: conversion timeout after {}us", timeout);

        Err(AdcError::ConversionTimeout { timeout_us: timeout })
    }
}

impl<SPI, CS, BUSY, D, E> ChannelAdc for Ltc2494<SPI, CS, BUSY, D>
where
    SPI: SpiBus<u8, Error = E>,
    CS: OutputPin,
    BUSY: InputPin,
    D: DelayNs,
{
    type BusError = E;

    fn measure(&mut self, command: CommandConfig) -> Result<ConversionResult, AdcError<E>> {
        Ltc2494::measure(self, command)
    }
}

// ============================================================================
// Tests
// ============================================================================

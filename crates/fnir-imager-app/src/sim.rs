//! Simulated imager board
//!
//! Models the LTC2494 serial protocol and the photodiode optics closely
//! enough that the real [`Ltc2494`](fnir_imager_embedded::Ltc2494) driver
//! and [`GpioIlluminator`](fnir_imager_embedded::GpioIlluminator) can run
//! unmodified on a host:
//!
//! - responses are pipelined (each transfer clocks out the previous result)
//! - the ready line stays high for a configurable number of polls after an
//!   enable command
//! - the reading depends on which LED is lit when the conversion starts

use std::cell::{RefCell, RefMut};
use std::convert::Infallible;
use std::f64::consts::PI;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, InputPin, OutputPin};
use embedded_hal::spi::{self, SpiBus};
use tracing::{debug, trace};

use fnir_imager_core::command::{layout, ChannelSelector, CommandWord};
use fnir_imager_core::response::{SIGN_BIT, STATUS_BIT};
use fnir_imager_core::types::{LedGroup, ScanChannel, SCAN_CHANNELS};

/// Dark reading at input 0 (counts)
const DARK_BASE: f64 = 1_200.0;
/// Extra dark reading per input number (counts)
const DARK_STEP: f64 = 40.0;
/// Full-coupling reading under the 730nm LED (counts)
const GAIN_730: f64 = 18_000.0;
/// Full-coupling reading under the 850nm LED (counts)
const GAIN_850: f64 = 24_000.0;
/// Coupling between an LED group and a photodiode it is not wired to
const CROSSTALK: f64 = 0.08;
/// Slow hemodynamic oscillation (Hz)
const HEMODYNAMIC_HZ: f64 = 0.1;

/// Simulation parameters
#[derive(Clone, Copy, Debug)]
pub struct SimConfig {
    /// Polls the ready line stays high after each enable command
    pub busy_polls: u32,
    /// Every Nth conversion never finishes (0 = never)
    pub stall_every: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self { busy_polls: 150, stall_every: 0 }
    }
}

/// Shared board state
#[derive(Debug, Default)]
struct Board {
    config: SimConfig,
    selected: bool,
    leds: u8,
    /// Bytes clocked out by the next transfer
    output: [u8; 3],
    busy_remaining: u32,
    stalled: bool,
    conversions: u32,
    clock_ns: u64,
}

impl Board {
    fn seconds(&self) -> f64 {
        self.clock_ns as f64 / 1e9
    }

    /// Apply one 3-byte transaction and return what the converter sent
    fn exchange(&mut self, tx: [u8; 3]) -> [u8; 3] {
        let rx = if self.busy_remaining > 0 || self.stalled {
            [self.output[0] | STATUS_BIT, self.output[1], self.output[2]]
        } else {
            self.output
        };

        let word = CommandWord::from_bits(u16::from_be_bytes([tx[0], tx[1]]));
        if !self.selected {
            trace!("sim: transfer without CS ignored");
            return rx;
        }
        if word.bits() & layout::EN != 0 {
            self.start_conversion(word);
        }
        rx
    }

    fn start_conversion(&mut self, word: CommandWord) {
        self.conversions += 1;
        self.busy_remaining = self.config.busy_polls;
        self.stalled = self.config.stall_every != 0 && self.conversions % self.config.stall_every == 0;

        let value = if word.single_ended() {
            let input = word.address() * 2 + u8::from(word.odd());
            self.photodiode(input)
        } else {
            0
        };
        self.output = encode_reading(value, true);

        debug!(
            command = format_args!("0x{:04X}", word.bits()),
            leds = format_args!("{:08b}", self.leds),
            value,
            stalled = self.stalled,
            "sim: conversion started"
        );
    }

    /// Reading of single-ended `input` under the current illumination
    fn photodiode(&self, input: u8) -> u16 {
        let dark = DARK_BASE + DARK_STEP * f64::from(input);
        let phase = 2.0 * PI * HEMODYNAMIC_HZ * self.seconds();

        let lit = (0..8u8).find(|bit| self.leds & (1 << bit) != 0);
        let light = match lit {
            Some(bit) => {
                let group = LedGroup::new(bit / 2).map_or(CROSSTALK, |g| coupling(g, input));
                if bit % 2 == 0 {
                    GAIN_730 * group * (1.0 - 0.03 * phase.sin())
                } else {
                    GAIN_850 * group * (1.0 + 0.02 * phase.sin())
                }
            }
            None => 0.0,
        };

        (dark + light).clamp(0.0, f64::from(u16::MAX)) as u16
    }
}

/// How strongly `group` illuminates photodiode `input`
fn coupling(group: LedGroup, input: u8) -> f64 {
    let wired = (0..SCAN_CHANNELS)
        .filter_map(ScanChannel::new)
        .any(|ch| ch.led_group() == group && ChannelSelector::single_ended(input) == Some(ch.selector()));
    if wired {
        1.0
    } else {
        CROSSTALK
    }
}

/// Response bytes that decode (OR combination) to `value`
#[must_use]
pub fn encode_reading(value: u16, positive: bool) -> [u8; 3] {
    let sign = if positive { SIGN_BIT } else { 0 };
    let [hi, lo] = value.to_be_bytes();
    let [_, mid] = (value >> 4).to_be_bytes();
    [sign | (hi >> 3), mid, lo << 4]
}

/// Handle to a simulated board; hands out the peripherals
#[derive(Clone)]
pub struct SimBoard(Rc<RefCell<Board>>);

impl SimBoard {
    /// Create a board
    #[must_use]
    pub fn new(config: SimConfig) -> Self {
        Self(Rc::new(RefCell::new(Board { config, ..Board::default() })))
    }

    fn state(&self) -> RefMut<'_, Board> {
        self.0.borrow_mut()
    }

    /// SPI bus wired to the converter
    pub fn spi(&self) -> SimSpi {
        SimSpi(self.clone())
    }

    /// Converter chip select
    pub fn cs(&self) -> SimCs {
        SimCs(self.clone())
    }

    /// Converter ready line
    pub fn ready(&self) -> SimReady {
        SimReady(self.clone())
    }

    /// Delay provider advancing the simulated clock
    pub fn delay(&self) -> SimDelay {
        SimDelay(self.clone())
    }

    /// The eight LED outputs
    pub fn leds(&self) -> [SimLed; 8] {
        std::array::from_fn(|i| SimLed { board: self.clone(), bit: i as u8 })
    }

    /// Simulated time in seconds
    pub fn seconds(&self) -> f64 {
        self.0.borrow().seconds()
    }

    /// Conversions started so far
    pub fn conversions(&self) -> u32 {
        self.0.borrow().conversions
    }

    /// Bitmask of lit LEDs
    #[cfg(test)]
    pub fn lit_leds(&self) -> u8 {
        self.0.borrow().leds
    }
}

/// Simulated SPI bus
pub struct SimSpi(SimBoard);

impl spi::ErrorType for SimSpi {
    type Error = Infallible;
}

impl SpiBus<u8> for SimSpi {
    fn read(&mut self, words: &mut [u8]) -> Result<(), Infallible> {
        words.fill(0);
        Ok(())
    }

    fn write(&mut self, words: &[u8]) -> Result<(), Infallible> {
        let mut scratch = words.to_vec();
        self.transfer_in_place(&mut scratch)
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Infallible> {
        let mut scratch = write.to_vec();
        self.transfer_in_place(&mut scratch)?;
        let n = read.len().min(scratch.len());
        read[..n].copy_from_slice(&scratch[..n]);
        Ok(())
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Infallible> {
        let mut board = self.0.state();
        for frame in words.chunks_mut(3) {
            let mut tx = [0u8; 3];
            tx[..frame.len()].copy_from_slice(frame);
            let rx = board.exchange(tx);
            let n = frame.len();
            frame.copy_from_slice(&rx[..n]);
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Infallible> {
        Ok(())
    }
}

/// Simulated chip select (active low)
pub struct SimCs(SimBoard);

impl digital::ErrorType for SimCs {
    type Error = Infallible;
}

impl OutputPin for SimCs {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.0.state().selected = true;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.0.state().selected = false;
        Ok(())
    }
}

/// Simulated conversion-ready line (high while converting)
pub struct SimReady(SimBoard);

impl digital::ErrorType for SimReady {
    type Error = Infallible;
}

impl InputPin for SimReady {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        let mut board = self.0.state();
        if board.stalled {
            return Ok(true);
        }
        if board.busy_remaining > 0 {
            board.busy_remaining -= 1;
            return Ok(true);
        }
        Ok(false)
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        self.is_high().map(|high| !high)
    }
}

/// Simulated delay: advances the board clock instead of sleeping
pub struct SimDelay(SimBoard);

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.0.state().clock_ns += u64::from(ns);
    }
}

/// One simulated LED output
pub struct SimLed {
    board: SimBoard,
    bit: u8,
}

impl digital::ErrorType for SimLed {
    type Error = Infallible;
}

impl OutputPin for SimLed {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.board.state().leds &= !(1 << self.bit);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.board.state().leds |= 1 << self.bit;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fnir_imager_core::config::{AdcConfig, ScanConfig};
    use fnir_imager_core::response::{ConversionResult, MagnitudeDecoding};
    use fnir_imager_core::types::Illuminant;
    use fnir_imager_embedded::{GpioIlluminator, Illuminator, Ltc2494};

    #[test]
    fn test_encode_reading_decodes() {
        for value in [0, 1, 0x0B45, 0x7FFF, 0x8000, u16::MAX] {
            let bytes = encode_reading(value, true);
            let result = ConversionResult::decode(bytes, MagnitudeDecoding::Combined);
            assert_eq!(result.magnitude, value);
            assert!(result.is_finished());
        }
    }

    #[test]
    fn test_coupling_follows_wiring() {
        let group0 = LedGroup::new(0).unwrap();
        let group1 = LedGroup::new(1).unwrap();
        // Input 2 is shared by channel 2 (group 0) and channel 4 (group 1)
        assert!((coupling(group0, 2) - 1.0).abs() < f64::EPSILON);
        assert!((coupling(group1, 2) - 1.0).abs() < f64::EPSILON);
        assert!((coupling(group1, 0) - CROSSTALK).abs() < f64::EPSILON);
    }

    #[test]
    fn test_driver_reads_lit_channel_brighter() {
        let board = SimBoard::new(SimConfig { busy_polls: 5, stall_every: 0 });
        let config = AdcConfig { magnitude: MagnitudeDecoding::Combined, ..AdcConfig::default() };
        let mut adc = Ltc2494::new(board.spi(), board.cs(), board.ready(), board.delay(), config);
        let mut leds = GpioIlluminator::new(board.leds());
        adc.init().unwrap();

        let channel = ScanChannel::new(5).unwrap();
        let command = ScanConfig::default().start_command(channel);

        leds.select(Illuminant::Off, channel.led_group()).unwrap();
        let dark = adc.measure(command).unwrap();
        leds.select(Illuminant::Nm850, channel.led_group()).unwrap();
        let lit = adc.measure(command).unwrap();

        assert_eq!(board.lit_leds(), 1 << 3);
        assert!(lit.magnitude > dark.magnitude + 10_000);
        assert_eq!(board.conversions(), 2);
        assert!(board.seconds() > 0.0);
    }

    #[test]
    fn test_stall_times_out() {
        let board = SimBoard::new(SimConfig { busy_polls: 1, stall_every: 1 });
        let config = AdcConfig { ready_timeout_us: 5_000, ..AdcConfig::default() };
        let mut adc = Ltc2494::new(board.spi(), board.cs(), board.ready(), board.delay(), config);

        let command = ScanConfig::default().start_command(ScanChannel::FIRST);
        assert!(adc.measure(command).unwrap_err().is_timeout());
    }
}

//! Hardware doubles for sequencer tests
//!
//! Every double borrows one shared [`Board`] that records what the code
//! under test did to it and scripts what it sees back. Unlike the
//! `embedded-hal-mock` expectations, they keep the CS state of each frame
//! and the total delay, and they let the LED bank, converter and sequencer
//! share one board model.

use core::cell::{Cell, RefCell};

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, InputPin, OutputPin};
use embedded_hal::spi::{self, SpiBus};
use heapless::{Deque, Vec};

use fnir_imager_core::command::{layout, CommandConfig, CommandWord};
use fnir_imager_core::error::AdcError;
use fnir_imager_core::response::{ConversionResult, ConversionStatus, Sign};
use fnir_imager_core::types::{ChannelReport, ScanFault};

use crate::scan::{ChannelAdc, ScanReporter};

/// Recording capacity
pub const CAPACITY: usize = 64;

/// Injected SPI failure
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BusFault;

impl spi::Error for BusFault {
    fn kind(&self) -> spi::ErrorKind {
        spi::ErrorKind::Other
    }
}

/// Injected pin failure
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PinFault;

impl digital::Error for PinFault {
    fn kind(&self) -> digital::ErrorKind {
        digital::ErrorKind::Other
    }
}

/// One recorded SPI transaction
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    /// Bytes sent
    pub tx: [u8; 3],
    /// CS state during the transfer
    pub selected: bool,
}

/// Shared state behind the doubles
#[derive(Default)]
pub struct Board {
    pub selected: Cell<bool>,
    pub selects: Cell<u32>,
    pub frames: RefCell<Vec<Frame, CAPACITY>>,
    pub responses: RefCell<Deque<[u8; 3], CAPACITY>>,
    pub fail_next_transfer: Cell<bool>,
    /// Polls that report busy after each enable command
    pub busy_per_conversion: Cell<u32>,
    pub busy_remaining: Cell<u32>,
    pub stuck_busy: Cell<bool>,
    pub waited_ns: Cell<u64>,
    /// Bitmask of lit LED outputs
    pub leds: Cell<u8>,
    pub fail_leds: Cell<bool>,
    /// Commands seen by [`FakeAdc`]
    pub commands: RefCell<Vec<CommandWord, CAPACITY>>,
    pub timeout_next: Cell<bool>,
    pub next_magnitude: Cell<u16>,
}

impl Board {
    /// Queue the bytes the converter clocks out on the next transfer
    pub fn push_response(&self, bytes: [u8; 3]) {
        self.responses.borrow_mut().push_back(bytes).unwrap();
    }

    /// Total delay requested, in microseconds
    pub fn waited_us(&self) -> u64 {
        self.waited_ns.get() / 1_000
    }
}

// ============================================================================
// Bus and pins
// ============================================================================

/// SPI bus double
pub struct MockSpi<'a>(pub &'a Board);

impl spi::ErrorType for MockSpi<'_> {
    type Error = BusFault;
}

impl SpiBus<u8> for MockSpi<'_> {
    fn read(&mut self, words: &mut [u8]) -> Result<(), BusFault> {
        words.fill(0);
        Ok(())
    }

    fn write(&mut self, words: &[u8]) -> Result<(), BusFault> {
        let mut scratch = [0u8; 3];
        let n = words.len().min(3);
        scratch[..n].copy_from_slice(&words[..n]);
        self.transfer_in_place(&mut scratch)
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), BusFault> {
        let mut scratch = [0u8; 3];
        let n = write.len().min(3);
        scratch[..n].copy_from_slice(&write[..n]);
        self.transfer_in_place(&mut scratch)?;
        let m = read.len().min(3);
        read[..m].copy_from_slice(&scratch[..m]);
        Ok(())
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), BusFault> {
        let board = self.0;
        if board.fail_next_transfer.take() {
            return Err(BusFault);
        }

        let mut tx = [0u8; 3];
        let n = words.len().min(3);
        tx[..n].copy_from_slice(&words[..n]);
        board.frames.borrow_mut().push(Frame { tx, selected: board.selected.get() }).unwrap();

        // An enable command starts a conversion
        if u16::from_be_bytes([tx[0], tx[1]]) & layout::EN != 0 {
            board.busy_remaining.set(board.busy_per_conversion.get());
        }

        let rx = board.responses.borrow_mut().pop_front().unwrap_or([0; 3]);
        words[..n].copy_from_slice(&rx[..n]);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), BusFault> {
        Ok(())
    }
}

/// Chip-select double (active low)
pub struct Cs<'a>(pub &'a Board);

impl digital::ErrorType for Cs<'_> {
    type Error = PinFault;
}

impl OutputPin for Cs<'_> {
    fn set_low(&mut self) -> Result<(), PinFault> {
        self.0.selected.set(true);
        self.0.selects.set(self.0.selects.get() + 1);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), PinFault> {
        self.0.selected.set(false);
        Ok(())
    }
}

/// Conversion-ready line double
pub struct Busy<'a>(pub &'a Board);

impl digital::ErrorType for Busy<'_> {
    type Error = PinFault;
}

impl InputPin for Busy<'_> {
    fn is_high(&mut self) -> Result<bool, PinFault> {
        let board = self.0;
        if board.stuck_busy.get() {
            return Ok(true);
        }
        let remaining = board.busy_remaining.get();
        if remaining > 0 {
            board.busy_remaining.set(remaining - 1);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn is_low(&mut self) -> Result<bool, PinFault> {
        self.is_high().map(|high| !high)
    }
}

/// Delay double: records, never sleeps
pub struct Delay<'a>(pub &'a Board);

impl DelayNs for Delay<'_> {
    fn delay_ns(&mut self, ns: u32) {
        self.0.waited_ns.set(self.0.waited_ns.get() + u64::from(ns));
    }
}

/// One LED output
pub struct Led<'a> {
    board: &'a Board,
    bit: u8,
}

impl digital::ErrorType for Led<'_> {
    type Error = PinFault;
}

impl OutputPin for Led<'_> {
    fn set_low(&mut self) -> Result<(), PinFault> {
        if self.board.fail_leds.get() {
            return Err(PinFault);
        }
        self.board.leds.set(self.board.leds.get() & !(1 << self.bit));
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), PinFault> {
        if self.board.fail_leds.get() {
            return Err(PinFault);
        }
        self.board.leds.set(self.board.leds.get() | (1 << self.bit));
        Ok(())
    }
}

/// The eight LED outputs, bit `n` = output `n`
pub fn leds(board: &Board) -> [Led<'_>; 8] {
    core::array::from_fn(|i| Led { board, bit: i as u8 })
}

// ============================================================================
// Collaborators
// ============================================================================

/// ADC stand-in that counts up one magnitude per measurement
pub struct FakeAdc<'a>(pub &'a Board);

impl ChannelAdc for FakeAdc<'_> {
    type BusError = BusFault;

    fn measure(&mut self, command: CommandConfig) -> Result<ConversionResult, AdcError<BusFault>> {
        let board = self.0;
        board.commands.borrow_mut().push(command.encode()).unwrap();
        if board.timeout_next.take() {
            return Err(AdcError::ConversionTimeout { timeout_us: 1_000 });
        }

        let magnitude = board.next_magnitude.get() + 1;
        board.next_magnitude.set(magnitude);
        Ok(ConversionResult { status: ConversionStatus::Finished, sign: Sign::Positive, magnitude })
    }
}

/// Reporter that keeps everything it is handed
#[derive(Default)]
pub struct Recorder {
    pub reports: Vec<ChannelReport, CAPACITY>,
    pub faults: Vec<ScanFault, CAPACITY>,
}

impl ScanReporter for Recorder {
    fn report(&mut self, report: &ChannelReport) {
        self.reports.push(*report).unwrap();
    }

    fn fault(&mut self, fault: &ScanFault) {
        self.faults.push(*fault).unwrap();
    }
}

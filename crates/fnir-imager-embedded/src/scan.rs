//! Scan sequencer
//!
//! Cooperative state machine that walks the 16 scan channels. Each call to
//! [`ScanSequencer::tick`] does at most one ADC measurement, so the main
//! loop can service the host link between ticks:
//!
//! ```text
//! Null ──▶ Nir730 ──▶ Nir850 ──▶ Idle ──▶ Null (next channel)
//!  settle   730nm+ADC  850nm+ADC  dark+ADC, report
//!
//! Stop: no-op until a Start command
//! ```
//!
//! A failed tick leaves the phase where it was, so the next tick repeats the
//! same measurement. Every failure is also handed to the [`ScanReporter`].

use fnir_imager_core::command::CommandConfig;
use fnir_imager_core::config::ScanConfig;
use fnir_imager_core::error::{AdcError, ScanError};
use fnir_imager_core::protocol::HostCommand;
use fnir_imager_core::response::ConversionResult;
use fnir_imager_core::types::{
    ChannelReport, Illuminant, LedGroup, MeasurementTriple, ScanChannel, ScanFault, ScanPhase,
};

// ============================================================================
// Capabilities
// ============================================================================

/// One blocking ADC measurement
pub trait ChannelAdc {
    /// Bus error type
    type BusError;

    /// Start a conversion with `command` and return its result
    fn measure(&mut self, command: CommandConfig) -> Result<ConversionResult, AdcError<Self::BusError>>;
}

/// LED selection
pub trait Illuminator {
    /// Error type
    type Error;

    /// Light `illuminant` on `group` and nothing else (`Off` lights nothing)
    fn select(&mut self, illuminant: Illuminant, group: LedGroup) -> Result<(), Self::Error>;

    /// Turn off all LEDs
    fn all_off(&mut self) -> Result<(), Self::Error>;
}

/// Receiver for completed channels and faults
pub trait ScanReporter {
    /// A channel finished its three measurements
    fn report(&mut self, report: &ChannelReport);

    /// A tick failed
    fn fault(&mut self, fault: &ScanFault);
}

/// What a successful tick did
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Stopped; nothing happened
    Stopped,
    /// Settle tick, no hardware access
    Settled,
    /// One measurement stored
    Measured {
        /// Channel measured
        channel: ScanChannel,
        /// Illumination used
        illuminant: Illuminant,
        /// The reading
        result: ConversionResult,
    },
    /// Channel complete and reported
    Reported(ChannelReport),
}

// ============================================================================
// Sequencer
// ============================================================================

/// Error type of a sequencer over `ADC` and `LED`
pub type TickError<ADC, LED> = ScanError<<ADC as ChannelAdc>::BusError, <LED as Illuminator>::Error>;

/// Per-channel scan state machine
pub struct ScanSequencer<ADC, LED> {
    adc: ADC,
    leds: LED,
    config: ScanConfig,
    phase: ScanPhase,
    channel: u8,
    pending: [ConversionResult; 3],
}

impl<ADC, LED> ScanSequencer<ADC, LED>
where
    ADC: ChannelAdc,
    LED: Illuminator,
{
    /// Create a stopped sequencer positioned on channel 0
    #[must_use]
    pub fn new(adc: ADC, leds: LED, config: ScanConfig) -> Self {
        Self {
            adc,
            leds,
            config,
            phase: ScanPhase::Stop,
            channel: ScanChannel::FIRST.id(),
            pending: [ConversionResult::EMPTY; 3],
        }
    }

    /// Switch every LED off
    pub fn init(&mut self) -> Result<(), TickError<ADC, LED>> {
        self.leds.all_off().map_err(ScanError::Illumination)
    }

    /// Begin scanning from the settle phase
    pub fn start(&mut self) {
        self.phase = ScanPhase::Null;

        #[cfg(feature = "defmt")]
        defmt::info!("Scan started at CH{}", self.channel);
    }

    /// Stop scanning; the channel position is kept
    pub fn stop(&mut self) {
        self.phase = ScanPhase::Stop;

        #[cfg(feature = "defmt")]
        defmt::info!("Scan stopped at CH{}", self.channel);
    }

    /// Apply a host command, returning the acknowledgement line
    pub fn apply(&mut self, command: HostCommand) -> &'static str {
        match command {
            HostCommand::Start => self.start(),
            HostCommand::Stop => self.stop(),
        }
        command.acknowledgement()
    }

    /// Advance the state machine by one step
    ///
    /// # Errors
    ///
    /// Returns the measurement or LED failure. The phase is unchanged so the
    /// next tick retries, except for an out-of-range channel, which is
    /// skipped. The fault has already been passed to `reporter`.
    pub fn tick<R: ScanReporter>(&mut self, reporter: &mut R) -> Result<TickOutcome, TickError<ADC, LED>> {
        let Some((illuminant, slot)) = self.phase.measurement() else {
            return Ok(match self.phase {
                ScanPhase::Stop => TickOutcome::Stopped,
                phase => {
                    self.phase = phase.next();
                    TickOutcome::Settled
                }
            });
        };

        let (channel, result) = match self.measure(illuminant) {
            Ok(measured) => measured,
            Err(e) => {
                let fault = ScanFault { channel: self.channel, phase: self.phase, kind: e.kind() };

                #[cfg(feature = "defmt")]
                defmt::warn!("Scan fault: {}", fault);

                reporter.fault(&fault);
                if !e.is_retried() {
                    self.channel = self.config.channel_wrap.advance(self.channel);
                    self.phase = ScanPhase::Null;
                }
                return Err(e);
            }
        };

        self.pending[slot] = result;

        if self.phase == ScanPhase::Idle {
            let report = ChannelReport { channel, triple: MeasurementTriple::from_slots(self.pending) };
            reporter.report(&report);

            #[cfg(feature = "defmt")]
            defmt::debug!("{}", report);

            self.channel = self.config.channel_wrap.advance(self.channel);
            self.phase = ScanPhase::Null;
            Ok(TickOutcome::Reported(report))
        } else {
            self.phase = self.phase.next();
            Ok(TickOutcome::Measured { channel, illuminant, result })
        }
    }

    fn measure(&mut self, illuminant: Illuminant) -> Result<(ScanChannel, ConversionResult), TickError<ADC, LED>> {
        let channel =
            ScanChannel::new(self.channel).ok_or(ScanError::ChannelOutOfRange { channel: self.channel })?;

        self.leds.select(illuminant, channel.led_group()).map_err(ScanError::Illumination)?;
        let result = self.adc.measure(self.config.start_command(channel))?;
        Ok((channel, result))
    }

    /// Current phase
    #[must_use]
    pub fn phase(&self) -> ScanPhase {
        self.phase
    }

    /// Raw id of the channel being measured (may be 16 with legacy wrap)
    #[must_use]
    pub fn channel(&self) -> u8 {
        self.channel
    }

    /// Readings gathered so far for the current channel, `[730nm, 850nm, dark]`
    #[must_use]
    pub fn pending(&self) -> &[ConversionResult; 3] {
        &self.pending
    }
}

// ============================================================================
// Tests
// ============================================================================

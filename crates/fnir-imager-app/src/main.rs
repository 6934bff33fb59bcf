//! fNIR Imager Host Application
//!
//! Runs the scan sequencer and LTC2494 driver against a simulated board and
//! prints what the board would send over its serial port.
//!
//! # Usage
//!
//! ```bash
//! # Four full scans (16 channels x 4 ticks)
//! fnir-imager --ticks 256
//!
//! # Start, then stop after the first channel
//! fnir-imager --commands "s...p" --ticks 16
//!
//! # Decode magnitudes with OR instead of the firmware's AND
//! fnir-imager --magnitude combined
//!
//! # Make every 10th conversion hang to exercise the timeout path
//! fnir-imager --stall-every 10 --timeout-us 20000
//! ```

mod sim;

use std::io::{self, Write};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use fnir_imager_core::config::{AdcConfig, ChannelWrap, ScanConfig, DEFAULT_READY_POLL_INTERVAL_US, DEFAULT_READY_TIMEOUT_US};
use fnir_imager_core::protocol::{fault_line, HostCommand, ReportRecord, DEVICE_CONNECTED};
use fnir_imager_core::response::MagnitudeDecoding;
use fnir_imager_core::types::{ChannelReport, ScanFault};
use fnir_imager_embedded::{GpioIlluminator, Ltc2494, ScanReporter, ScanSequencer, TickOutcome};

use crate::sim::{SimBoard, SimConfig};

/// fNIR Imager Application
#[derive(Parser, Debug)]
#[command(name = "fnir-imager")]
#[command(author, version, about = "fNIR imager scan sequencer on a simulated board", long_about = None)]
struct Cli {
    /// Logging verbosity level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Number of sequencer ticks to run
    #[arg(short, long, default_value = "64")]
    ticks: u32,

    /// Host command bytes, one fed before each tick ('s' start, 'p' stop,
    /// anything else ignored)
    #[arg(short, long, default_value = "s")]
    commands: String,

    /// Response magnitude decoding
    #[arg(long, value_enum, default_value = "legacy")]
    magnitude: MagnitudeArg,

    /// Channel advance after the last channel
    #[arg(long, value_enum, default_value = "modulo")]
    wrap: WrapArg,

    /// Conversion-ready timeout in microseconds
    #[arg(long, default_value_t = DEFAULT_READY_TIMEOUT_US)]
    timeout_us: u32,

    /// Interval between conversion-ready polls in microseconds
    #[arg(long, default_value_t = DEFAULT_READY_POLL_INTERVAL_US)]
    poll_interval_us: u32,

    /// Polls the simulated converter stays busy per conversion
    #[arg(long, default_value = "150")]
    busy_polls: u32,

    /// Make every Nth simulated conversion hang (0 = never)
    #[arg(long, default_value = "0")]
    stall_every: u32,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum MagnitudeArg {
    /// AND of the shifted response bytes (bit-exact with deployed firmware)
    Legacy,
    /// OR of the shifted response bytes
    Combined,
}

impl From<MagnitudeArg> for MagnitudeDecoding {
    fn from(arg: MagnitudeArg) -> Self {
        match arg {
            MagnitudeArg::Legacy => Self::Legacy,
            MagnitudeArg::Combined => Self::Combined,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum WrapArg {
    /// (channel + 1) mod 16
    Modulo,
    /// Firmware sequence; channel 16 is reported as a fault and skipped
    Legacy,
}

impl From<WrapArg> for ChannelWrap {
    fn from(arg: WrapArg) -> Self {
        match arg {
            WrapArg::Modulo => Self::Modulo,
            WrapArg::Legacy => Self::Legacy,
        }
    }
}

/// Writes the board's serial output (CSV records and fault lines)
struct SerialReporter<W: Write> {
    out: W,
    records: u32,
    faults: u32,
    error: Option<io::Error>,
}

impl<W: Write> SerialReporter<W> {
    fn new(out: W) -> Self {
        Self { out, records: 0, faults: 0, error: None }
    }

    fn write_line(&mut self, line: &str) {
        if self.error.is_none() {
            if let Err(e) = self.out.write_all(line.as_bytes()) {
                self.error = Some(e);
            }
        }
    }

    /// Surface the first write failure, if any
    fn check(&mut self) -> anyhow::Result<()> {
        match self.error.take() {
            Some(e) => Err(e).context("writing serial output"),
            None => Ok(()),
        }
    }
}

impl<W: Write> ScanReporter for SerialReporter<W> {
    fn report(&mut self, report: &ChannelReport) {
        self.records += 1;
        match ReportRecord::from(report).to_line() {
            Ok(line) => self.write_line(&line),
            Err(_) => warn!(channel = %report.channel, "record did not fit a line"),
        }
    }

    fn fault(&mut self, fault: &ScanFault) {
        self.faults += 1;
        warn!(%fault, "scan fault");
        if let Ok(line) = fault_line(fault) {
            self.write_line(&line);
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("fNIR imager v{}", env!("CARGO_PKG_VERSION"));

    run(&cli)
}

/// Bring up the simulated board and run the host loop
fn run(cli: &Cli) -> anyhow::Result<()> {
    let board = SimBoard::new(SimConfig { busy_polls: cli.busy_polls, stall_every: cli.stall_every });

    let adc_config = AdcConfig {
        magnitude: cli.magnitude.into(),
        ready_timeout_us: cli.timeout_us,
        ready_poll_interval_us: cli.poll_interval_us,
    };
    let scan_config = ScanConfig { channel_wrap: cli.wrap.into(), ..ScanConfig::default() };
    info!(?adc_config, ?scan_config, "configuration");

    let mut adc = Ltc2494::new(board.spi(), board.cs(), board.ready(), board.delay(), adc_config);
    adc.init().map_err(|e| anyhow::anyhow!("{e}")).context("LTC2494 init")?;

    let leds = GpioIlluminator::new(board.leds());
    let mut scanner = ScanSequencer::new(adc, leds, scan_config);
    scanner.init().map_err(|e| anyhow::anyhow!("{e}")).context("LED init")?;

    let stdout = io::stdout();
    let mut reporter = SerialReporter::new(stdout.lock());
    reporter.write_line(DEVICE_CONNECTED);

    let mut commands = cli.commands.bytes();
    for tick in 0..cli.ticks {
        if let Some(byte) = commands.next() {
            match HostCommand::from_byte(byte) {
                Some(command) => {
                    debug!(tick, ?command, "host command");
                    let ack = scanner.apply(command);
                    reporter.write_line(ack);
                }
                None => debug!(tick, byte, "ignored host byte"),
            }
        }

        match scanner.tick(&mut reporter) {
            Ok(TickOutcome::Measured { channel, illuminant, result }) => {
                debug!(tick, %channel, ?illuminant, magnitude = result.magnitude, "measured");
            }
            Ok(TickOutcome::Reported(report)) => {
                debug!(tick, channel = %report.channel, "channel complete");
            }
            Ok(TickOutcome::Settled | TickOutcome::Stopped) => {}
            // Already reported; the next tick retries or skips
            Err(e) => debug!(tick, error = %e, "tick failed"),
        }
        reporter.check()?;
    }

    reporter.out.flush().context("flushing serial output")?;
    info!(
        records = reporter.records,
        faults = reporter.faults,
        conversions = board.conversions(),
        simulated_s = board.seconds(),
        phase = scanner.phase().name(),
        "done"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_scan(ticks: u32, commands: &str, scan_config: ScanConfig, sim: SimConfig) -> (String, u32) {
        let board = SimBoard::new(sim);
        let adc_config = AdcConfig { magnitude: MagnitudeDecoding::Combined, ..AdcConfig::default() };
        let adc = Ltc2494::new(board.spi(), board.cs(), board.ready(), board.delay(), adc_config);
        let mut scanner = ScanSequencer::new(adc, GpioIlluminator::new(board.leds()), scan_config);
        scanner.init().unwrap();

        let mut reporter = SerialReporter::new(Vec::new());
        let mut bytes = commands.bytes();
        for _ in 0..ticks {
            if let Some(command) = bytes.next().and_then(HostCommand::from_byte) {
                let ack = scanner.apply(command);
                reporter.write_line(ack);
            }
            let _ = scanner.tick(&mut reporter);
        }
        reporter.check().unwrap();
        (String::from_utf8(reporter.out).unwrap(), reporter.faults)
    }

    #[test]
    fn test_one_scan_emits_sixteen_records() {
        let (out, faults) = run_scan(64, "s", ScanConfig::default(), SimConfig::default());
        let lines: Vec<&str> = out.split_terminator("\r\n").collect();

        assert_eq!(lines[0], "Starting");
        assert_eq!(lines.len(), 17);
        assert_eq!(faults, 0);
        for (i, line) in lines[1..].iter().enumerate() {
            let fields: Vec<u32> = line.split(',').map(|f| f.parse().unwrap()).collect();
            assert_eq!(fields.len(), 5);
            assert_eq!(fields[0] as usize, i);
            // Both wavelengths brighter than dark, estimate placeholder
            assert!(fields[1] > fields[3] && fields[2] > fields[3], "{line}");
            assert_eq!(fields[4], 0);
        }
    }

    #[test]
    fn test_stop_command_halts_output() {
        let (out, _) = run_scan(64, "s...p", ScanConfig::default(), SimConfig::default());
        let lines: Vec<&str> = out.split_terminator("\r\n").collect();
        // Channel 0 completes on the fourth tick, then 'p' arrives
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Starting");
        assert!(lines[1].starts_with("0,"), "{}", lines[1]);
        assert_eq!(lines[2], "Stopping");
    }

    #[test]
    fn test_stalls_reported_as_faults() {
        let sim = SimConfig { busy_polls: 2, stall_every: 5 };
        let (out, faults) = run_scan(64, "s", ScanConfig::default(), sim);
        assert!(faults > 0);
        assert!(out.lines().any(|l| l.starts_with("# CH")));
    }
}

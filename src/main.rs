//! serial-pulse
//!
//! A minimal harness that floods a serial link with a paced, incrementing
//! counter, for hardware-in-the-loop testing and throughput characterization.
//!
//! The wire contract is a sequence of ASCII decimal integers, each terminated
//! by a newline, starting at 0 and incrementing by one per message, sent at
//! 115200 baud, 8 data bits, no parity, 1 stop bit, no flow control.
//!
//! # Usage
//!
//! ```bash
//! # List available serial ports
//! serial-pulse list
//!
//! # Transmit on the default port (/dev/ttyUSB0, 115200 baud, 100 µs pacing)
//! serial-pulse run
//!
//! # Transmit on a specific port, aborting on write errors
//! serial-pulse run -p /dev/ttyACM0 --strict
//!
//! # Slow the pacing down to 1 kHz
//! serial-pulse run -i 1000
//! ```

mod serial;
mod transmit;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serial::{LineConfig, SerialConnection};
use transmit::{TransmitConfig, TransmitStats, Transmitter, WritePolicy};

/// Raised by the SIGINT handler; the transmission loop checks it once per
/// iteration.
static STOP_REQUESTED: AtomicBool = AtomicBool::new(false);

/// serial-pulse
///
/// Paced counter-transmission harness for exercising serial links
#[derive(Parser)]
#[command(name = "serial-pulse")]
#[command(version = "0.1.0")]
#[command(about = "Paced counter-transmission harness for exercising serial links")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List available serial ports
    List,

    /// Configure a port and transmit the counter stream until Ctrl+C
    Run {
        /// Serial port path (e.g., /dev/ttyUSB0)
        #[arg(short, long, default_value = serial::port::DEFAULT_DEVICE_PATH)]
        port: String,

        /// Baud rate, applied in both directions
        #[arg(short, long, default_value_t = serial::port::DEFAULT_BAUD_RATE)]
        baud: u32,

        /// Pause between messages, in microseconds
        #[arg(short, long, default_value_t = 100)]
        interval_us: u64,

        /// Abort on write errors instead of ignoring them
        #[arg(long)]
        strict: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logger; --verbose raises the default filter to debug
    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match cli.command {
        Commands::List => serial::port::print_ports(),
        Commands::Run {
            port,
            baud,
            interval_us,
            strict,
        } => handle_run(&port, baud, interval_us, strict),
    }
}

fn handle_run(port: &str, baud: u32, interval_us: u64, strict: bool) -> Result<()> {
    let line_config = LineConfig::new(port).with_baud_rate(baud);
    let transmit_config = TransmitConfig::default()
        .with_interval(Duration::from_micros(interval_us))
        .with_policy(if strict {
            WritePolicy::Strict
        } else {
            WritePolicy::BestEffort
        });
    let nominal_hz = transmit_config.nominal_rate_hz();

    // The configuration phase must succeed before the first write; any
    // failure here aborts with a non-zero status and the handle released.
    let mut conn =
        SerialConnection::open(line_config).context("serial port configuration failed")?;

    println!(
        "{} Connected to {} at {} baud",
        "[OK]".green().bold(),
        port.white().bold(),
        baud
    );
    let settings = conn
        .settings()
        .context("configured port did not report its line settings")?;
    println!(
        "{} Line discipline: {}",
        "[*]".cyan().bold(),
        settings.summary().white()
    );

    install_stop_handler()?;

    println!(
        "{} Transmitting every {} µs (nominal {:.0} Hz)",
        "[TX]".cyan().bold(),
        interval_us,
        nominal_hz
    );
    println!("{}", "Press Ctrl+C to stop\n".yellow());

    let mut transmitter = Transmitter::new(transmit_config);
    let stats = transmitter
        .run(&mut conn, &STOP_REQUESTED)
        .context("transmission aborted")?;

    print_summary(&stats, nominal_hz);
    Ok(())
}

fn print_summary(stats: &TransmitStats, nominal_hz: f64) {
    println!("\n{}", "--- Transmission Summary ---".cyan().bold());
    println!("Messages sent: {}", stats.sent);
    println!("Elapsed: {:.3} s", stats.elapsed.as_secs_f64());
    println!(
        "Achieved rate: {:.1} Hz (nominal {:.0} Hz)",
        stats.achieved_rate_hz(),
        nominal_hz
    );
}

#[cfg(unix)]
fn install_stop_handler() -> Result<()> {
    extern "C" fn handle_sigint(_: libc::c_int) {
        // Only an atomic store: safe inside a signal handler.
        STOP_REQUESTED.store(true, Ordering::SeqCst);
    }

    let previous = unsafe { libc::signal(libc::SIGINT, handle_sigint as libc::sighandler_t) };
    if previous == libc::SIG_ERR {
        return Err(anyhow::anyhow!("failed to install SIGINT handler"));
    }
    Ok(())
}

#[cfg(not(unix))]
fn install_stop_handler() -> Result<()> {
    // No cooperative stop off Unix; the loop ends with the process.
    Ok(())
}

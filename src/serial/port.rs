//! Serial port configuration and connection management
//!
//! Opens the target device and commits a fixed, known line discipline to it
//! before the transmitter sends a single byte.

use crate::serial::error::ConfigError;
use anyhow::{Context, Result};
use colored::Colorize;
use log::debug;
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{self, Write};
use std::time::Duration;

/// Default device path when none is given on the command line
pub const DEFAULT_DEVICE_PATH: &str = "/dev/ttyUSB0";

/// Default baud rate, applied in both directions
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Read timeout committed to the port. No reads ever happen, but the value
/// must still be well-defined (half a second, the classic VTIME=5).
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(500);

/// Desired line discipline for the target device
///
/// Defaults reproduce the fixed wire contract: 115200 baud, 8 data bits, no
/// parity, 1 stop bit, no flow control in either direction. Raw byte mode,
/// non-controlling access, and receiver enablement come with the open itself.
#[derive(Debug, Clone)]
pub struct LineConfig {
    /// Serial device path (e.g., /dev/ttyUSB0, /dev/ttyACM0)
    pub path: String,
    /// Baud rate, both directions (default: 115200)
    pub baud_rate: u32,
    /// Data bits (default: 8)
    pub data_bits: DataBits,
    /// Parity (default: None)
    pub parity: Parity,
    /// Stop bits (default: 1)
    pub stop_bits: StopBits,
    /// Flow control, software and hardware (default: None)
    pub flow_control: FlowControl,
    /// Read timeout
    pub timeout: Duration,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            path: String::from(DEFAULT_DEVICE_PATH),
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            flow_control: FlowControl::None,
            timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

impl LineConfig {
    /// Create a configuration for the given device with default line settings
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            ..Default::default()
        }
    }

    /// Set the baud rate
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Set the read timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Line settings a device reports back when queried
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineSettings {
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub flow_control: FlowControl,
}

impl LineSettings {
    /// Compact "115200 8N1, flow control none" style summary
    pub fn summary(&self) -> String {
        let bits = match self.data_bits {
            DataBits::Five => '5',
            DataBits::Six => '6',
            DataBits::Seven => '7',
            DataBits::Eight => '8',
        };
        let parity = match self.parity {
            Parity::None => 'N',
            Parity::Odd => 'O',
            Parity::Even => 'E',
        };
        let stop = match self.stop_bits {
            StopBits::One => '1',
            StopBits::Two => '2',
        };
        let flow = match self.flow_control {
            FlowControl::None => "none",
            FlowControl::Software => "software",
            FlowControl::Hardware => "hardware",
        };
        format!(
            "{} {}{}{}, flow control {}",
            self.baud_rate, bits, parity, stop, flow
        )
    }
}

/// Exclusively-owned handle to a configured serial device
///
/// Only write access is exposed; the harness never reads from the device.
/// Dropping the connection releases the device, on success and failure paths
/// alike.
pub struct SerialConnection {
    port: Box<dyn SerialPort>,
    config: LineConfig,
}

impl SerialConnection {
    /// Open the device and commit the requested line discipline to it.
    ///
    /// Three strictly sequential stages, none retried: acquire the device,
    /// query its reported settings as the baseline, then apply every
    /// requested parameter. A failure at any stage drops the handle before
    /// the error propagates.
    pub fn open(config: LineConfig) -> std::result::Result<Self, ConfigError> {
        let mut port = serialport::new(&config.path, config.baud_rate)
            .timeout(config.timeout)
            .open()
            .map_err(|source| ConfigError::DeviceUnavailable {
                path: config.path.clone(),
                source,
            })?;

        let baseline = query_settings(&*port).map_err(|source| ConfigError::AttributeQueryFailed {
            path: config.path.clone(),
            source,
        })?;
        debug!("baseline settings on {}: {:?}", config.path, baseline);

        apply_settings(&mut *port, &config).map_err(|source| ConfigError::AttributeApplyFailed {
            path: config.path.clone(),
            source,
        })?;
        debug!(
            "configured {}: {} baud, {:?} data bits, {:?} parity, {:?} stop bits, {:?} flow control",
            config.path, config.baud_rate, config.data_bits, config.parity, config.stop_bits,
            config.flow_control
        );

        Ok(Self { port, config })
    }

    /// Get the requested configuration
    pub fn config(&self) -> &LineConfig {
        &self.config
    }

    /// Query the line settings the device currently reports
    pub fn settings(&self) -> std::result::Result<LineSettings, ConfigError> {
        query_settings(&*self.port).map_err(|source| ConfigError::AttributeQueryFailed {
            path: self.config.path.clone(),
            source,
        })
    }
}

impl Write for SerialConnection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }
}

fn query_settings(port: &dyn SerialPort) -> serialport::Result<LineSettings> {
    Ok(LineSettings {
        baud_rate: port.baud_rate()?,
        data_bits: port.data_bits()?,
        parity: port.parity()?,
        stop_bits: port.stop_bits()?,
        flow_control: port.flow_control()?,
    })
}

fn apply_settings(port: &mut dyn SerialPort, config: &LineConfig) -> serialport::Result<()> {
    // The builder already carried the baud rate, but not every backend honors
    // it on open; committing it again makes the port state unambiguous.
    port.set_baud_rate(config.baud_rate)?;
    port.set_data_bits(config.data_bits)?;
    port.set_parity(config.parity)?;
    port.set_stop_bits(config.stop_bits)?;
    port.set_flow_control(config.flow_control)?;
    port.set_timeout(config.timeout)?;
    Ok(())
}

/// Information about a detected serial port
#[derive(Debug, Clone)]
pub struct PortInfo {
    pub path: String,
    pub port_type: PortType,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub serial_number: Option<String>,
    pub vid: Option<u16>,
    pub pid: Option<u16>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PortType {
    UsbSerial,
    PciSerial,
    Bluetooth,
    Unknown,
}

impl std::fmt::Display for PortType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PortType::UsbSerial => write!(f, "USB Serial"),
            PortType::PciSerial => write!(f, "PCI Serial"),
            PortType::Bluetooth => write!(f, "Bluetooth"),
            PortType::Unknown => write!(f, "Unknown"),
        }
    }
}

/// List all serial ports visible on the host
pub fn list_ports() -> Result<Vec<PortInfo>> {
    let ports = serialport::available_ports().with_context(|| "Failed to enumerate serial ports")?;

    let port_infos: Vec<PortInfo> = ports
        .into_iter()
        .map(|p| {
            let (port_type, manufacturer, product, serial_number, vid, pid) = match p.port_type {
                serialport::SerialPortType::UsbPort(info) => (
                    PortType::UsbSerial,
                    info.manufacturer,
                    info.product,
                    info.serial_number,
                    Some(info.vid),
                    Some(info.pid),
                ),
                serialport::SerialPortType::PciPort => {
                    (PortType::PciSerial, None, None, None, None, None)
                }
                serialport::SerialPortType::BluetoothPort => {
                    (PortType::Bluetooth, None, None, None, None, None)
                }
                serialport::SerialPortType::Unknown => {
                    (PortType::Unknown, None, None, None, None, None)
                }
            };

            PortInfo {
                path: p.port_name,
                port_type,
                manufacturer,
                product,
                serial_number,
                vid,
                pid,
            }
        })
        .collect();

    Ok(port_infos)
}

/// Print a formatted list of the serial ports visible on the host
pub fn print_ports() -> Result<()> {
    let ports = list_ports()?;

    if ports.is_empty() {
        println!("{}", "No serial ports found".yellow());
        println!("\n{}", "Troubleshooting tips:".cyan().bold());
        println!("  1. Connect a USB-to-serial adapter");
        println!("  2. Check if the device is recognized: ls -la /dev/ttyUSB* /dev/ttyACM*");
        println!("  3. Add your user to the 'dialout' group: sudo usermod -aG dialout $USER");
        println!("  4. Check dmesg for connection events: dmesg | tail -20");
        return Ok(());
    }

    println!("{}", "Available Serial Ports:".green().bold());
    println!("{}", "=".repeat(60));

    for port in ports {
        println!("\n{}: {}", "Port".cyan(), port.path.white().bold());
        println!("  Type: {}", port.port_type);

        if let Some(ref mfg) = port.manufacturer {
            println!("  Manufacturer: {}", mfg);
        }
        if let Some(ref prod) = port.product {
            println!("  Product: {}", prod);
        }
        if let Some(ref sn) = port.serial_number {
            println!("  Serial: {}", sn);
        }
        if let (Some(vid), Some(pid)) = (port.vid, port.pid) {
            println!("  VID:PID: {:04x}:{:04x}", vid, pid);
        }
    }

    println!("\n{}", "=".repeat(60));
    println!(
        "{}",
        "Use: serial-pulse run -p <PORT> to start transmitting".yellow()
    );

    Ok(())
}

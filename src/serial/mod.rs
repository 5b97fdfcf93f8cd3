//! Serial device access for the transmission harness
//!
//! This module provides functionality for:
//! - Listing available serial ports (USB-to-serial adapters)
//! - Opening a device and committing a fixed line discipline to it
//! - The error taxonomy of the configuration phase

pub mod error;
pub mod port;

pub use error::ConfigError;
pub use port::{LineConfig, LineSettings, SerialConnection};

//! Errors raised during the one-time port configuration phase.
//!
//! All three variants are fatal: they occur before the first byte is
//! transmitted and are never retried.

use thiserror::Error;

/// A failure while opening or configuring the serial device.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The device could not be opened at all: missing path, exclusive hold
    /// by another process, or insufficient permission.
    #[error("cannot open serial device {path}: {source}")]
    DeviceUnavailable {
        path: String,
        #[source]
        source: serialport::Error,
    },

    /// The freshly opened device did not report its current line settings.
    #[error("cannot read line settings from {path}: {source}")]
    AttributeQueryFailed {
        path: String,
        #[source]
        source: serialport::Error,
    },

    /// The device rejected one of the requested line parameters.
    #[error("cannot apply line settings to {path}: {source}")]
    AttributeApplyFailed {
        path: String,
        #[source]
        source: serialport::Error,
    },
}

impl ConfigError {
    /// Path of the device the failure relates to.
    pub fn path(&self) -> &str {
        match self {
            ConfigError::DeviceUnavailable { path, .. }
            | ConfigError::AttributeQueryFailed { path, .. }
            | ConfigError::AttributeApplyFailed { path, .. } => path,
        }
    }
}

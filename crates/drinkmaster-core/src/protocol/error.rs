//! Protocol errors

use thiserror::Error;

/// Errors in the transport configuration. Raised before any I/O happens.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No serial port name was supplied
    #[error("Serial port is not configured (set UART_PORT)")]
    MissingPort,

    /// A setting could not be parsed or is out of range
    #[error("Invalid value for {key}: '{value}' ({reason})")]
    InvalidValue {
        /// Setting or environment variable name
        key: String,
        /// Value as supplied
        value: String,
        /// Why it was rejected
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(key: &str, value: &str, reason: impl ToString) -> Self {
        ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Faults on the physical serial link
#[derive(Error, Debug)]
pub enum TransportError {
    /// The port could not be opened (missing device, permissions, busy)
    #[error("Failed to open serial port {port}: {source}")]
    Open {
        /// Port name that was tried
        port: String,
        /// Driver error
        #[source]
        source: serialport::Error,
    },

    /// Line settings or timeouts were refused by the driver
    #[error("Serial port configuration failed: {0}")]
    Configure(#[source] serialport::Error),

    /// Writing or flushing the frame failed
    #[error("Serial write failed: {0}")]
    Write(#[source] std::io::Error),

    /// Reading controller output failed, including a device that went away
    #[error("Serial read failed: {0}")]
    Read(#[source] std::io::Error),
}

/// Structural errors found while decoding a frame
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// No bytes at all, not even the end marker
    #[error("Frame is empty")]
    Empty,

    /// Length is not `3 * entries + 1`
    #[error("Frame length {0} is not a multiple of three plus one")]
    InvalidLength(usize),

    /// An entry is not followed by 0xFF
    #[error("Expected separator 0xFF at offset {offset}, got {found:#04x}")]
    MissingSeparator {
        /// Byte offset of the separator
        offset: usize,
        /// Byte found there instead
        found: u8,
    },

    /// The last byte is not 0xFF
    #[error("Expected end-of-frame marker 0xFF, got {0:#04x}")]
    MissingTerminator(u8),
}

//! Error types for FINS exchanges.
//!
//! Every failure is returned to the immediate caller as a [`FinsError`].
//! Nothing is retried or logged here.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for FINS operations.
pub type Result<T> = std::result::Result<T, FinsError>;

/// Errors that can occur during FINS communication.
#[derive(Debug, Error)]
pub enum FinsError {
    /// The local datagram endpoint could not be opened.
    #[error("transport bind failed: {0}")]
    TransportBind(#[source] io::Error),

    /// The command datagram could not be fully written.
    ///
    /// Short writes are reported with [`io::ErrorKind::WriteZero`].
    #[error("transport send failed: {0}")]
    TransportSend(#[source] io::Error),

    /// Polling or reading the incoming datagram failed.
    #[error("transport receive failed: {0}")]
    TransportReceive(#[source] io::Error),

    /// No matching response arrived before the deadline.
    #[error("no response within {} ms", .timeout.as_millis())]
    ResponseTimeout {
        /// The deadline that elapsed.
        timeout: Duration,
    },

    /// The response was too short to carry a status pair.
    #[error("malformed response: {length} bytes, expected at least 14")]
    MalformedFrame {
        /// Length of the rejected datagram.
        length: usize,
    },

    /// The PLC answered with a non-zero status pair.
    #[error("PLC error: main code 0x{main_code:02X}, sub code 0x{sub_code:02X}")]
    DeviceError {
        /// Main response code (MRES).
        main_code: u8,
        /// Sub response code (SRES).
        sub_code: u8,
    },

    /// Invalid parameter provided.
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// Name of the invalid parameter.
        parameter: String,
        /// Description of why the parameter is invalid.
        reason: String,
    },
}

impl FinsError {
    /// Creates a new `DeviceError` from main and sub codes.
    ///
    /// # Example
    ///
    /// ```
    /// use fins_udp::FinsError;
    ///
    /// let err = FinsError::device_error(0x11, 0x03);
    /// assert_eq!(err.device_codes(), Some((0x11, 0x03)));
    /// ```
    pub fn device_error(main_code: u8, sub_code: u8) -> Self {
        Self::DeviceError {
            main_code,
            sub_code,
        }
    }

    /// Creates a new `MalformedFrame` error.
    pub fn malformed(length: usize) -> Self {
        Self::MalformedFrame { length }
    }

    /// Creates a new `ResponseTimeout` error.
    pub fn timeout(timeout: Duration) -> Self {
        Self::ResponseTimeout { timeout }
    }

    /// Creates a new `TransportSend` error describing a short write.
    pub fn short_write(written: usize, expected: usize) -> Self {
        Self::TransportSend(io::Error::new(
            io::ErrorKind::WriteZero,
            format!("short write: {} of {} bytes", written, expected),
        ))
    }

    /// Creates a new `InvalidParameter` error.
    ///
    /// # Example
    ///
    /// ```
    /// use fins_udp::FinsError;
    ///
    /// let err = FinsError::invalid_parameter("count", "must be greater than 0");
    /// ```
    pub fn invalid_parameter(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    /// Returns whether this error is a response timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ResponseTimeout { .. })
    }

    /// Returns the `(main, sub)` status pair of a device error.
    pub fn device_codes(&self) -> Option<(u8, u8)> {
        match self {
            Self::DeviceError {
                main_code,
                sub_code,
            } => Some((*main_code, *sub_code)),
            _ => None,
        }
    }
}

/// Describes the category of a FINS main response code.
///
/// Codes are passed through uninterpreted by the exchange itself; this is a
/// lookup for diagnostics only. The sub code is accepted so callers can pass
/// the pair as received, but only the main code selects the text.
///
/// # Example
///
/// ```
/// use fins_udp::device_error_description;
///
/// assert_eq!(device_error_description(0x11, 0x03), "parameter error");
/// ```
pub fn device_error_description(main_code: u8, _sub_code: u8) -> &'static str {
    match main_code {
        0x00 => "normal completion",
        0x01 => "local node error",
        0x02 => "destination node error",
        0x03 => "communications controller error",
        0x04 => "service not supported",
        0x05 => "routing table error",
        0x10 => "command format error",
        0x11 => "parameter error",
        0x20 => "read not possible",
        0x21 => "write not possible",
        0x22 => "not executable in current mode",
        0x23 => "no such device",
        0x24 => "cannot start/stop",
        0x25 => "unit error",
        0x26 => "command error",
        0x30 => "access right error",
        0x40 => "abort",
        _ => "unknown error",
    }
}

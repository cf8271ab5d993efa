//! Error types for buzzer-link.

use std::fmt;
use std::io;

use thiserror::Error;

/// Malformed or unexpected payload.
///
/// Never fatal: decode failures leave the cached state untouched and command
/// validation failures mean nothing was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Status frame does not carry exactly one byte per button.
    #[error("Wrong status frame length: expected {expected} bytes, got {actual}")]
    WrongLength { expected: usize, actual: usize },

    /// State code (low nibble) is not Disabled/Enabled/Answered.
    #[error("Invalid button state code: {0}")]
    InvalidState(u8),

    /// Button index outside the device's fixed button range.
    #[error("Invalid button index: {0}")]
    InvalidButtonIndex(u8),
}

/// Terminal transport failure observed by the reader thread.
///
/// `std::io::Error` is not `Clone`, so the reader keeps its kind and message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkFailure {
    /// Kind of the underlying I/O error.
    pub kind: io::ErrorKind,
    /// Rendered error message.
    pub message: String,
}

impl From<&io::Error> for LinkFailure {
    fn from(err: &io::Error) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for LinkFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?})", self.message, self.kind)
    }
}

/// Main error type for all controller operations.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// I/O error on the byte stream (command write, thread spawn).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serial port could not be enumerated, opened or cloned.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// Payload or command argument rejected.
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// No port was configured and none could be discovered.
    #[error("No serial port available")]
    NoPortAvailable,

    /// The reader thread stopped on a transport failure.
    #[error("Connection lost: {0}")]
    LinkLost(LinkFailure),
}

/// Result type alias using ControllerError.
pub type Result<T> = std::result::Result<T, ControllerError>;

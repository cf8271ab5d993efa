//! Frame struct with typed accessors.
//!
//! A frame is the payload found between a start and a stop delimiter.
//! Uses `bytes::Bytes` so frames move through the hand-off channel without
//! copying.
//!
//! # Example
//!
//! ```
//! use buzzer_link::protocol::Frame;
//!
//! let frame = Frame::from_slice(&[0xC2, 0x01, 0x01, 0x01]);
//! assert!(frame.is_status());
//! assert_eq!(frame.payload(), &[0xC2, 0x01, 0x01, 0x01]);
//! ```

use bytes::Bytes;

use super::wire_format::{decode_status, ButtonStatus, BUTTON_COUNT, STATUS_FRAME_LEN};
use crate::error::DecodeError;

/// A complete frame, delimiters excluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Payload bytes (zero-copy via `bytes::Bytes`).
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame from a payload.
    pub fn new(payload: Bytes) -> Self {
        Self { payload }
    }

    /// Create a frame from raw bytes (copies data).
    pub fn from_slice(payload: &[u8]) -> Self {
        Self {
            payload: Bytes::copy_from_slice(payload),
        }
    }

    /// Get a reference to the payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Get the payload length.
    #[inline]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Check if the payload is empty (`"S\n"` on the wire).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Check if this frame has the length of a status frame.
    #[inline]
    pub fn is_status(&self) -> bool {
        self.payload.len() == STATUS_FRAME_LEN
    }

    /// Decode this frame as a status frame.
    pub fn decode_status(&self) -> Result<[ButtonStatus; BUTTON_COUNT], DecodeError> {
        decode_status(&self.payload)
    }
}

impl From<Bytes> for Frame {
    fn from(payload: Bytes) -> Self {
        Self::new(payload)
    }
}

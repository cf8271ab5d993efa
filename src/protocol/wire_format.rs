//! Wire format encoding and decoding.
//!
//! Inbound status frames are delimited on the wire:
//! ```text
//! ┌──────┬──────────┬──────────┬──────────┬──────────┬──────┐
//! │ 'S'  │ button 0 │ button 1 │ button 2 │ button 3 │ '\n' │
//! │ 0x53 │ 1 byte   │ 1 byte   │ 1 byte   │ 1 byte   │ 0x0A │
//! └──────┴──────────┴──────────┴──────────┴──────────┴──────┘
//! ```
//!
//! Each button byte is a bitfield:
//! ```text
//!   bit 7     bit 6        bits 5-4   bits 3-0
//! ┌─────────┬────────────┬──────────┬────────────┐
//! │connected│has_answered│ reserved │ state code │
//! └─────────┴────────────┴──────────┴────────────┘
//! ```
//!
//! There is no checksum and no escaping.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

/// Start-of-frame delimiter (`'S'`).
pub const START_DELIMITER: u8 = b'S';

/// End-of-frame delimiter (`'\n'`).
pub const STOP_DELIMITER: u8 = b'\n';

/// Number of physical buttons on the controller.
pub const BUTTON_COUNT: usize = 4;

/// Payload length of a status frame (one byte per button).
pub const STATUS_FRAME_LEN: usize = BUTTON_COUNT;

/// Bit masks for a single button byte.
pub mod bits {
    /// Button is connected to the base unit.
    pub const CONNECTED: u8 = 0b1000_0000;
    /// Button has answered in the current round.
    pub const HAS_ANSWERED: u8 = 0b0100_0000;
    /// Reserved bits, ignored on decode and zero on encode.
    pub const RESERVED_MASK: u8 = 0b0011_0000;
    /// State code nibble.
    pub const STATE_MASK: u8 = 0b0000_1111;

    /// Check if a specific bit is set.
    #[inline]
    pub fn has_bit(byte: u8, bit: u8) -> bool {
        byte & bit != 0
    }
}

/// Mode of a single button as reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ButtonState {
    Disabled = 1,
    Enabled = 2,
    Answered = 3,
}

impl ButtonState {
    /// Wire code of this state.
    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for ButtonState {
    type Error = DecodeError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(ButtonState::Disabled),
            2 => Ok(ButtonState::Enabled),
            3 => Ok(ButtonState::Answered),
            other => Err(DecodeError::InvalidState(other)),
        }
    }
}

impl fmt::Display for ButtonState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ButtonState::Disabled => "Disabled",
            ButtonState::Enabled => "Enabled",
            ButtonState::Answered => "Answered",
        };
        f.write_str(name)
    }
}

/// Decoded state of one button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ButtonStatus {
    pub connected: bool,
    pub has_answered: bool,
    pub state: ButtonState,
}

impl ButtonStatus {
    /// Create a new button status.
    pub fn new(connected: bool, has_answered: bool, state: ButtonState) -> Self {
        Self {
            connected,
            has_answered,
            state,
        }
    }

    /// Decode a single button byte.
    ///
    /// # Example
    ///
    /// ```
    /// use buzzer_link::protocol::{ButtonState, ButtonStatus};
    ///
    /// let status = ButtonStatus::from_byte(0xC2).unwrap();
    /// assert!(status.connected);
    /// assert!(status.has_answered);
    /// assert_eq!(status.state, ButtonState::Enabled);
    /// ```
    pub fn from_byte(byte: u8) -> Result<Self, DecodeError> {
        Ok(Self {
            connected: bits::has_bit(byte, bits::CONNECTED),
            has_answered: bits::has_bit(byte, bits::HAS_ANSWERED),
            state: ButtonState::try_from(byte & bits::STATE_MASK)?,
        })
    }

    /// Encode into the device's button byte (reserved bits zero).
    pub fn to_byte(&self) -> u8 {
        let mut byte = self.state.code();
        if self.connected {
            byte |= bits::CONNECTED;
        }
        if self.has_answered {
            byte |= bits::HAS_ANSWERED;
        }
        byte
    }
}

impl fmt::Display for ButtonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "State:{}, Answered:{}, connected:{}",
            self.state, self.has_answered, self.connected
        )
    }
}

/// Decode a status frame payload into one status per button.
///
/// Byte `i` describes button `i`. The whole frame is rejected if any byte
/// carries an invalid state code.
pub fn decode_status(frame: &[u8]) -> Result<[ButtonStatus; BUTTON_COUNT], DecodeError> {
    let bytes: &[u8; STATUS_FRAME_LEN] =
        frame.try_into().map_err(|_| DecodeError::WrongLength {
            expected: STATUS_FRAME_LEN,
            actual: frame.len(),
        })?;

    Ok([
        ButtonStatus::from_byte(bytes[0])?,
        ButtonStatus::from_byte(bytes[1])?,
        ButtonStatus::from_byte(bytes[2])?,
        ButtonStatus::from_byte(bytes[3])?,
    ])
}

/// Encode per-button statuses into a status frame payload (no delimiters).
pub fn encode_status(buttons: &[ButtonStatus; BUTTON_COUNT]) -> [u8; STATUS_FRAME_LEN] {
    (*buttons).map(|b| b.to_byte())
}

/// Wrap a payload in start/stop delimiters, as the device sends it.
pub fn delimit(payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(payload.len() + 2);
    buf.push(START_DELIMITER);
    buf.extend_from_slice(payload);
    buf.push(STOP_DELIMITER);
    buf
}

//! Outbound command frames.
//!
//! Commands are written raw, without delimiters:
//! ```text
//! enable          [0x01]
//! reset           [0x02]
//! disable         [0x03]
//! set answered    [0x04, button_index, status]
//! ```

use bytes::Bytes;

use super::wire_format::BUTTON_COUNT;
use crate::error::DecodeError;

/// Command opcodes.
pub mod opcode {
    /// Enable all buttons.
    pub const ENABLE: u8 = 0x01;
    /// Reset all buttons.
    pub const RESET: u8 = 0x02;
    /// Disable all buttons.
    pub const DISABLE: u8 = 0x03;
    /// Set the answered status of one button.
    pub const SET_ANSWERED_STATUS: u8 = 0x04;
}

/// A command for the controller.
///
/// `SetAnsweredStatus` can only be built through
/// [`Command::set_answered_status`], which validates the button index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Enable,
    Reset,
    Disable,
    SetAnsweredStatus { button: u8, status: u8 },
}

impl Command {
    /// Enable all buttons.
    pub fn enable() -> Self {
        Command::Enable
    }

    /// Reset all buttons.
    pub fn reset() -> Self {
        Command::Reset
    }

    /// Disable all buttons.
    pub fn disable() -> Self {
        Command::Disable
    }

    /// Set the answered status of one button.
    ///
    /// The device does not validate the index itself, so an out-of-range
    /// index is rejected here before anything is written.
    ///
    /// # Example
    ///
    /// ```
    /// use buzzer_link::protocol::Command;
    ///
    /// let cmd = Command::set_answered_status(2, 1).unwrap();
    /// assert_eq!(&cmd.encode()[..], &[0x04, 0x02, 0x01]);
    ///
    /// assert!(Command::set_answered_status(4, 1).is_err());
    /// ```
    pub fn set_answered_status(button: u8, status: u8) -> Result<Self, DecodeError> {
        if usize::from(button) >= BUTTON_COUNT {
            return Err(DecodeError::InvalidButtonIndex(button));
        }
        Ok(Command::SetAnsweredStatus { button, status })
    }

    /// Opcode of this command.
    #[inline]
    pub fn opcode(&self) -> u8 {
        match self {
            Command::Enable => opcode::ENABLE,
            Command::Reset => opcode::RESET,
            Command::Disable => opcode::DISABLE,
            Command::SetAnsweredStatus { .. } => opcode::SET_ANSWERED_STATUS,
        }
    }

    /// Encode into the exact bytes written to the link.
    pub fn encode(&self) -> Bytes {
        match *self {
            Command::Enable => Bytes::from_static(&[opcode::ENABLE]),
            Command::Reset => Bytes::from_static(&[opcode::RESET]),
            Command::Disable => Bytes::from_static(&[opcode::DISABLE]),
            Command::SetAnsweredStatus { button, status } => {
                Bytes::copy_from_slice(&[opcode::SET_ANSWERED_STATUS, button, status])
            }
        }
    }
}

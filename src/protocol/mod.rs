//! Protocol module - wire format, framing, and command encoding.
//!
//! This module implements the controller's serial protocol:
//! - Delimited status frames and their per-button bitfields
//! - Frame extractor for reassembling frames from arbitrary chunks
//! - Raw command frames sent to the device

mod command;
mod frame;
mod frame_extractor;
mod wire_format;

pub use command::{opcode, Command};
pub use frame::Frame;
pub use frame_extractor::{FrameExtractor, Frames};
pub use wire_format::{
    bits, decode_status, delimit, encode_status, ButtonState, ButtonStatus, BUTTON_COUNT,
    START_DELIMITER, STATUS_FRAME_LEN, STOP_DELIMITER,
};

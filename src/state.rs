//! Cached button state, synchronised from the hand-off channel.
//!
//! `ControllerState` owns the consuming end of the channel and is only ever
//! mutated by [`ControllerState::refresh`] on the owner's thread. The only
//! state shared with the reader is the channel and its overflow slot.

use std::time::Instant;

use crate::error::DecodeError;
use crate::handoff::HandOffReceiver;
use crate::protocol::{ButtonState, ButtonStatus, BUTTON_COUNT};

/// Placeholder reported before the device has sent anything.
const INITIAL_BUTTON: ButtonStatus = ButtonStatus {
    connected: true,
    has_answered: true,
    state: ButtonState::Enabled,
};

/// Latest-known state of all buttons.
#[derive(Debug)]
pub struct ControllerState {
    buttons: [ButtonStatus; BUTTON_COUNT],
    frames: HandOffReceiver,
    last_update: Option<Instant>,
}

impl ControllerState {
    /// Create a state fed by `frames`.
    pub fn new(frames: HandOffReceiver) -> Self {
        Self {
            buttons: [INITIAL_BUTTON; BUTTON_COUNT],
            frames,
            last_update: None,
        }
    }

    /// Apply the most recent pending frame, if any.
    ///
    /// Drains the channel, including a frame parked on overflow, without
    /// blocking and decodes only the newest; older undelivered frames are
    /// discarded. Returns `Ok(true)` when the
    /// cached state changed. On a decode failure the previous state is kept.
    pub fn refresh(&mut self) -> Result<bool, DecodeError> {
        let Some(frame) = self.frames.drain_latest() else {
            return Ok(false);
        };

        let buttons = frame.decode_status().map_err(|e| {
            tracing::warn!("Discarding undecodable status frame {:02X?}: {}", frame.payload(), e);
            e
        })?;

        self.last_update = Some(Instant::now());
        if buttons == self.buttons {
            return Ok(false);
        }

        self.buttons = buttons;
        Ok(true)
    }

    /// Copy of the cached state.
    #[inline]
    pub fn snapshot(&self) -> [ButtonStatus; BUTTON_COUNT] {
        self.buttons
    }

    /// Cached state of one button.
    pub fn button(&self, index: usize) -> Option<ButtonStatus> {
        self.buttons.get(index).copied()
    }

    /// When a status frame was last applied successfully.
    ///
    /// `None` means the snapshot is still the initial placeholder.
    pub fn last_update(&self) -> Option<Instant> {
        self.last_update
    }
}

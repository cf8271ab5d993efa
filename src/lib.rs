//! # buzzer-link
//!
//! Rust client for a four-button answer controller attached over a serial
//! link.
//!
//! ## Architecture
//!
//! - **Inbound**: a background reader thread reassembles `'S' … '\n'`
//!   delimited status frames and hands 4-byte frames to a bounded channel
//! - **State**: the caller drains that channel on demand, keeping only the
//!   freshest frame, and decodes it into per-button status
//! - **Outbound**: fixed-format command bytes written on the caller's thread
//!
//! ## Example
//!
//! ```ignore
//! use buzzer_link::ControllerClient;
//!
//! fn main() -> Result<(), buzzer_link::ControllerError> {
//!     let mut client = ControllerClient::builder().open()?;
//!
//!     client.send_reset()?;
//!     client.send_enable()?;
//!
//!     loop {
//!         client.check_link()?;
//!         if client.refresh_state()? {
//!             println!("{:?}", client.snapshot());
//!         }
//!         std::thread::sleep(std::time::Duration::from_millis(50));
//!     }
//! }
//! ```

pub mod error;
pub mod handoff;
pub mod protocol;
pub mod reader;
pub mod state;
pub mod transport;

mod client;

pub use client::{ControllerBuilder, ControllerClient};
pub use error::{ControllerError, DecodeError, LinkFailure, Result};
pub use protocol::{ButtonState, ButtonStatus, Command, BUTTON_COUNT};
pub use reader::{LinkStatus, ReaderConfig};
pub use state::ControllerState;
pub use transport::SerialSettings;

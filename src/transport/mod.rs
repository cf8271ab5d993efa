//! Transport module - serial port discovery and byte-stream setup.
//!
//! The core only needs a `Read` half and a `Write` half; this module supplies
//! them from a physical port via the `serialport` crate.

mod serial;

pub use serial::{
    available_ports, default_port, open, SerialLink, SerialSettings, DEFAULT_BAUD_RATE,
    DEFAULT_READ_TIMEOUT,
};

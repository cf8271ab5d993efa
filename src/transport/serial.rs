//! Serial port byte-stream provider.
//!
//! Opens the port with the controller's line settings and splits it into
//! independent read and write halves, so the reader thread and the caller
//! never contend for one handle.
//!
//! # Example
//!
//! ```ignore
//! use buzzer_link::transport::{open, SerialSettings};
//!
//! let link = open(&SerialSettings::default())?;
//! let (reader, writer) = link.into_split()?;
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serialport::SerialPort;

use crate::error::{ControllerError, Result};

/// Baud rate the controller firmware runs at.
pub const DEFAULT_BAUD_RATE: u32 = 57_600;

/// Default read timeout; bounds how long a stop request can go unnoticed.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Serial line configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSettings {
    /// Port name (e.g. `/dev/ttyUSB0`, `COM3`). `None` picks the first
    /// enumerated port.
    pub port: Option<String>,
    /// Line speed.
    pub baud_rate: u32,
    /// Maximum time a read blocks when no bytes are available.
    pub read_timeout: Duration,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

/// List the names of the serial ports present on this machine.
pub fn available_ports() -> Result<Vec<String>> {
    let ports = serialport::available_ports()?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}

/// Pick the first available serial port.
pub fn default_port() -> Result<String> {
    available_ports()?
        .into_iter()
        .next()
        .ok_or(ControllerError::NoPortAvailable)
}

/// An open serial link.
pub struct SerialLink {
    port: Box<dyn SerialPort>,
    port_name: String,
}

impl SerialLink {
    /// Get the name of the opened port.
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Split into a read half and a write half.
    ///
    /// Both halves refer to the same OS handle; serial links read and write
    /// independently.
    pub fn into_split(self) -> Result<(Box<dyn SerialPort>, Box<dyn SerialPort>)> {
        let reader = self.port.try_clone()?;
        Ok((reader, self.port))
    }
}

impl std::fmt::Debug for SerialLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialLink")
            .field("port_name", &self.port_name)
            .finish_non_exhaustive()
    }
}

/// Open and configure a serial port.
pub fn open(settings: &SerialSettings) -> Result<SerialLink> {
    let port_name = match &settings.port {
        Some(name) => name.clone(),
        None => default_port()?,
    };

    let port = serialport::new(port_name.as_str(), settings.baud_rate)
        .timeout(settings.read_timeout)
        .open()?;

    tracing::info!(
        "Opened serial port {} at {} baud",
        port_name,
        settings.baud_rate
    );

    Ok(SerialLink { port, port_name })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = SerialSettings::default();
        assert_eq!(settings.port, None);
        assert_eq!(settings.baud_rate, 57_600);
        assert_eq!(settings.read_timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_settings_partial_deserialize() {
        let settings: SerialSettings =
            serde_json::from_str(r#"{ "port": "/dev/ttyACM0" }"#).unwrap();

        assert_eq!(settings.port.as_deref(), Some("/dev/ttyACM0"));
        assert_eq!(settings.baud_rate, DEFAULT_BAUD_RATE);
        assert_eq!(settings.read_timeout, DEFAULT_READ_TIMEOUT);
    }

    #[test]
    fn test_settings_json_round_trip() {
        let settings = SerialSettings {
            port: Some("COM3".to_string()),
            baud_rate: 115_200,
            read_timeout: Duration::from_millis(250),
        };

        let json = serde_json::to_string(&settings).unwrap();
        let back: SerialSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, settings);
    }

    #[test]
    fn test_open_missing_port_fails() {
        let settings = SerialSettings {
            port: Some("/definitely/not/a/serial/port".to_string()),
            ..Default::default()
        };

        let result = open(&settings);
        assert!(matches!(result, Err(ControllerError::Serial(_))));
    }
}

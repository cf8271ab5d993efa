//! Client builder and controller facade.
//!
//! The [`ControllerBuilder`] collects serial and reader settings. The
//! [`ControllerClient`] manages the lifecycle:
//! 1. Open the serial port (or accept caller-supplied halves)
//! 2. Spawn the reader thread over the read half
//! 3. Write commands on the caller's thread
//! 4. Apply the freshest status frame on [`ControllerClient::refresh_state`]
//!
//! # Example
//!
//! ```ignore
//! use buzzer_link::ControllerClient;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = ControllerClient::builder()
//!         .port("/dev/ttyUSB0")
//!         .open()?;
//!
//!     client.send_enable()?;
//!
//!     if client.refresh_state()? {
//!         for (i, button) in client.snapshot().iter().enumerate() {
//!             println!("button{} {}", i, button);
//!         }
//!     }
//!
//!     client.shutdown();
//!     Ok(())
//! }
//! ```

use std::io::{Read, Write};
use std::time::{Duration, Instant};

use tokio::sync::watch;

use crate::error::{ControllerError, Result};
use crate::protocol::{ButtonStatus, Command, BUTTON_COUNT};
use crate::reader::{spawn_reader, LinkStatus, ReaderConfig, ReaderHandle};
use crate::state::ControllerState;
use crate::transport::{self, SerialSettings};

/// Builder for configuring and connecting a controller client.
#[derive(Debug, Clone, Default)]
pub struct ControllerBuilder {
    serial: SerialSettings,
    reader: ReaderConfig,
}

impl ControllerBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the serial port name.
    ///
    /// Default: first enumerated port
    pub fn port(mut self, port: impl Into<String>) -> Self {
        self.serial.port = Some(port.into());
        self
    }

    /// Set the baud rate.
    ///
    /// Default: 57600
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.serial.baud_rate = baud_rate;
        self
    }

    /// Set the read timeout, which also bounds shutdown latency.
    ///
    /// Default: 1 second
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.serial.read_timeout = timeout;
        self
    }

    /// Set the hand-off channel capacity.
    ///
    /// Default: 32
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.reader.channel_capacity = capacity;
        self
    }

    /// Set the number of bytes requested per read.
    ///
    /// Default: 256
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.reader.read_buffer_size = size;
        self
    }

    /// Replace all serial settings.
    pub fn serial_settings(mut self, settings: SerialSettings) -> Self {
        self.serial = settings;
        self
    }

    /// Replace all reader settings.
    pub fn reader_config(mut self, config: ReaderConfig) -> Self {
        self.reader = config;
        self
    }

    /// Open the serial port and start the reader.
    pub fn open(self) -> Result<ControllerClient> {
        let link = transport::open(&self.serial)?;
        let port_name = link.port_name().to_string();
        let (reader, writer) = link.into_split()?;

        let mut client = ControllerClient::start(reader, writer, &self.reader)?;
        client.port_name = Some(port_name);
        Ok(client)
    }

    /// Start over caller-supplied stream halves instead of a serial port.
    ///
    /// `reader` must return promptly when no data is available (timeout
    /// errors or `Ok(0)`), or shutdown will wait on it. `Ok(0)` is read as
    /// "nothing yet", never as end of stream: a source that is exhausted
    /// keeps being polled every [`IDLE_BACKOFF`](crate::reader::IDLE_BACKOFF)
    /// until the client shuts down.
    pub fn connect<R, W>(self, reader: R, writer: W) -> Result<ControllerClient>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        ControllerClient::start(reader, writer, &self.reader)
    }
}

/// A connected controller.
///
/// Commands are written on the caller's thread; inbound status frames are
/// read by a background thread and applied by [`refresh_state`](Self::refresh_state).
pub struct ControllerClient {
    /// Outbound half of the link.
    writer: Box<dyn Write + Send>,
    /// Cached button state fed by the reader.
    state: ControllerState,
    /// Reader thread handle.
    reader: ReaderHandle,
    /// Serial port name, when opened through the builder.
    port_name: Option<String>,
}

impl ControllerClient {
    /// Create a new client builder.
    pub fn builder() -> ControllerBuilder {
        ControllerBuilder::new()
    }

    /// Open a client with the given serial settings and default reader config.
    pub fn open(settings: SerialSettings) -> Result<Self> {
        ControllerBuilder::new().serial_settings(settings).open()
    }

    fn start<R, W>(reader: R, writer: W, config: &ReaderConfig) -> Result<Self>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        let (reader, frames) = spawn_reader(reader, config)?;

        Ok(Self {
            writer: Box::new(writer),
            state: ControllerState::new(frames),
            reader,
            port_name: None,
        })
    }

    /// Enable all buttons.
    pub fn send_enable(&mut self) -> Result<()> {
        self.send(Command::enable())
    }

    /// Reset all buttons.
    pub fn send_reset(&mut self) -> Result<()> {
        self.send(Command::reset())
    }

    /// Disable all buttons.
    pub fn send_disable(&mut self) -> Result<()> {
        self.send(Command::disable())
    }

    /// Set the answered status of one button.
    ///
    /// Fails with [`DecodeError::InvalidButtonIndex`](crate::DecodeError::InvalidButtonIndex)
    /// before writing anything if `button` is out of range.
    pub fn send_set_answered(&mut self, button: u8, status: u8) -> Result<()> {
        let command = Command::set_answered_status(button, status)?;
        self.send(command)
    }

    /// Write a command to the device.
    pub fn send(&mut self, command: Command) -> Result<()> {
        let bytes = command.encode();
        self.writer.write_all(&bytes)?;
        self.writer.flush()?;
        tracing::debug!("Sent {:?} {:02X?}", command, &bytes[..]);
        Ok(())
    }

    /// Apply the freshest status frame received since the last call.
    ///
    /// Never blocks. Returns `Ok(true)` when the cached state changed and
    /// `Ok(false)` when nothing new arrived. A bad frame is reported as
    /// [`ControllerError::Decode`] and leaves the cached state as it was.
    pub fn refresh_state(&mut self) -> Result<bool> {
        Ok(self.state.refresh()?)
    }

    /// Copy of the cached button state.
    ///
    /// Stays readable after the link is lost.
    pub fn snapshot(&self) -> [ButtonStatus; BUTTON_COUNT] {
        self.state.snapshot()
    }

    /// Cached state of one button.
    pub fn button(&self, index: usize) -> Option<ButtonStatus> {
        self.state.button(index)
    }

    /// When the device last reported a valid status.
    pub fn last_update(&self) -> Option<Instant> {
        self.state.last_update()
    }

    /// Get the reader status.
    pub fn link_status(&self) -> LinkStatus {
        self.reader.status()
    }

    /// Subscribe to reader status changes.
    pub fn subscribe_status(&self) -> watch::Receiver<LinkStatus> {
        self.reader.subscribe()
    }

    /// Fail with [`ControllerError::LinkLost`] if the reader hit a transport error.
    pub fn check_link(&self) -> Result<()> {
        match self.reader.status() {
            LinkStatus::Lost(failure) => Err(ControllerError::LinkLost(failure)),
            _ => Ok(()),
        }
    }

    /// Get the number of status frames dropped because refresh fell behind.
    pub fn dropped_frames(&self) -> u64 {
        self.reader.dropped_frames()
    }

    /// Get the serial port name, if opened from a port.
    pub fn port_name(&self) -> Option<&str> {
        self.port_name.as_deref()
    }

    /// Stop the reader and wait for it to exit.
    pub fn shutdown(mut self) {
        self.reader.stop();
    }
}

impl Drop for ControllerClient {
    fn drop(&mut self) {
        self.reader.stop();
    }
}

impl std::fmt::Debug for ControllerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerClient")
            .field("port_name", &self.port_name)
            .field("state", &self.state)
            .field("reader", &self.reader)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    use crate::protocol::{delimit, ButtonState};
    use crate::DecodeError;

    /// Writer that records everything into a shared buffer.
    #[derive(Clone, Default)]
    struct SharedWriter(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Writer whose every write fails.
    struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Reader that never has data.
    struct IdleReader;

    impl Read for IdleReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            std::thread::sleep(Duration::from_millis(2));
            Err(io::Error::new(io::ErrorKind::TimedOut, "timed out"))
        }
    }

    /// Reader that yields one chunk, then idles.
    struct OnceReader(Option<Vec<u8>>);

    impl Read for OnceReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.take() {
                Some(data) => {
                    buf[..data.len()].copy_from_slice(&data);
                    Ok(data.len())
                }
                None => IdleReader.read(buf),
            }
        }
    }

    fn idle_client() -> (ControllerClient, SharedWriter) {
        let writer = SharedWriter::default();
        let client = ControllerClient::builder()
            .connect(IdleReader, writer.clone())
            .unwrap();
        (client, writer)
    }

    #[test]
    fn test_builder_configuration() {
        let builder = ControllerClient::builder()
            .port("/dev/ttyUSB1")
            .baud_rate(115_200)
            .read_timeout(Duration::from_millis(100))
            .channel_capacity(8)
            .read_buffer_size(64);

        assert_eq!(builder.serial.port.as_deref(), Some("/dev/ttyUSB1"));
        assert_eq!(builder.serial.baud_rate, 115_200);
        assert_eq!(builder.serial.read_timeout, Duration::from_millis(100));
        assert_eq!(builder.reader.channel_capacity, 8);
        assert_eq!(builder.reader.read_buffer_size, 64);
    }

    #[test]
    fn test_builder_default() {
        let builder = ControllerBuilder::default();
        assert_eq!(builder.serial, SerialSettings::default());
        assert_eq!(builder.reader, ReaderConfig::default());
    }

    #[test]
    fn test_commands_written_verbatim() {
        let (mut client, writer) = idle_client();

        client.send_enable().unwrap();
        client.send_reset().unwrap();
        client.send_disable().unwrap();
        client.send_set_answered(2, 1).unwrap();

        assert_eq!(
            *writer.0.lock().unwrap(),
            vec![0x01, 0x02, 0x03, 0x04, 0x02, 0x01]
        );
        assert_eq!(client.port_name(), None);
    }

    #[test]
    fn test_invalid_button_writes_nothing() {
        let (mut client, writer) = idle_client();

        let err = client.send_set_answered(4, 1).unwrap_err();

        assert!(matches!(
            err,
            ControllerError::Decode(DecodeError::InvalidButtonIndex(4))
        ));
        assert!(writer.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_write_failure_propagates() {
        let mut client = ControllerClient::builder()
            .connect(IdleReader, BrokenWriter)
            .unwrap();

        let err = client.send_enable().unwrap_err();

        assert!(matches!(err, ControllerError::Io(ref e) if e.kind() == io::ErrorKind::BrokenPipe));
        // Reader unaffected
        assert!(client.link_status().is_running());
    }

    #[test]
    fn test_refresh_with_nothing_received() {
        let (mut client, _writer) = idle_client();

        assert!(!client.refresh_state().unwrap());
        assert!(client.last_update().is_none());
        assert!(client.check_link().is_ok());
    }

    #[test]
    fn test_refresh_picks_up_reader_frame() {
        let reader = OnceReader(Some(delimit(&[0x83, 0x01, 0x01, 0x01])));
        let mut client = ControllerClient::builder()
            .connect(reader, SharedWriter::default())
            .unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while !client.refresh_state().unwrap() {
            assert!(Instant::now() < deadline, "frame never arrived");
            std::thread::sleep(Duration::from_millis(1));
        }

        assert_eq!(
            client.button(0),
            Some(ButtonStatus::new(true, false, ButtonState::Answered))
        );
        assert_eq!(client.dropped_frames(), 0);
    }

    #[test]
    fn test_shutdown_stops_reader() {
        let (client, _writer) = idle_client();
        let status = client.subscribe_status();

        client.shutdown();

        assert_eq!(*status.borrow(), LinkStatus::Stopped);
    }
}

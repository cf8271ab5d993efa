//! Dedicated reader thread for the inbound half of the link.
//!
//! The reader is the only code that reads from the byte stream. It runs on
//! its own OS thread because serial reads block; each read is bounded by the
//! port's timeout so a stop request is noticed within one timeout period.
//!
//! # Architecture
//!
//! ```text
//! byte stream ─► read() ─► FrameExtractor ─► 4-byte frames ─► HandOffSender
//!                                   │
//!                                   └─► other lengths dropped
//! ```
//!
//! Loop exit is published on a `tokio::sync::watch` channel:
//! - stop requested or consumer gone: [`LinkStatus::Stopped`]
//! - transport read failure or a panic in the stream: [`LinkStatus::Lost`],
//!   no retry

use std::io::{self, Read};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::{LinkFailure, Result};
use crate::handoff::{ChannelClosed, HandOffReceiver, HandOffSender, DEFAULT_CHANNEL_CAPACITY};
use crate::protocol::FrameExtractor;

/// Default size of the per-read scratch buffer.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 256;

/// Pause after a read that returned no bytes.
///
/// Streams without a read timeout report "no data" as `Ok(0)` straight away.
pub const IDLE_BACKOFF: Duration = Duration::from_millis(10);

/// Name given to the reader thread.
const THREAD_NAME: &str = "buzzer-link-reader";

/// Configuration for the reader thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Hand-off channel capacity (frames).
    pub channel_capacity: usize,
    /// Bytes requested per read call.
    pub read_buffer_size: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }
}

/// Lifecycle of the reader thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkStatus {
    /// Reading.
    Running,
    /// Exited cooperatively (stop request or consumer dropped).
    Stopped,
    /// Exited on a transport failure.
    Lost(LinkFailure),
}

impl LinkStatus {
    /// Check if the reader is still running.
    #[inline]
    pub fn is_running(&self) -> bool {
        matches!(self, LinkStatus::Running)
    }

    /// Get the terminal failure, if the link was lost.
    pub fn failure(&self) -> Option<&LinkFailure> {
        match self {
            LinkStatus::Lost(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Handle to a running reader thread.
///
/// Dropping the handle requests a stop but does not wait for the thread.
#[derive(Debug)]
pub struct ReaderHandle {
    stop: Arc<AtomicBool>,
    status: watch::Receiver<LinkStatus>,
    dropped: Arc<AtomicU64>,
    thread: Option<JoinHandle<()>>,
}

impl ReaderHandle {
    /// Get the current reader status.
    pub fn status(&self) -> LinkStatus {
        self.status.borrow().clone()
    }

    /// Subscribe to status changes.
    pub fn subscribe(&self) -> watch::Receiver<LinkStatus> {
        self.status.clone()
    }

    /// Get the number of frames dropped because the consumer fell behind.
    pub fn dropped_frames(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Ask the reader to exit after its current read returns.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /// Request a stop and wait for the thread to exit.
    ///
    /// Waits at most one read timeout (plus processing of the last chunk).
    pub fn stop(&mut self) {
        self.request_stop();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("Reader thread panicked");
            }
        }
    }
}

impl Drop for ReaderHandle {
    fn drop(&mut self) {
        self.request_stop();
    }
}

/// Spawn the reader thread over `stream`.
///
/// Returns the handle and the consuming end of the hand-off channel.
pub fn spawn_reader<R>(stream: R, config: &ReaderConfig) -> Result<(ReaderHandle, HandOffReceiver)>
where
    R: Read + Send + 'static,
{
    let (handoff, frames_rx) = crate::handoff::channel(config.channel_capacity.max(1));
    let (status_tx, status_rx) = watch::channel(LinkStatus::Running);
    let stop = Arc::new(AtomicBool::new(false));
    let dropped = handoff.dropped_counter();

    let reader = LinkReader {
        stream,
        extractor: FrameExtractor::new(),
        handoff,
        stop: stop.clone(),
        read_buffer_size: config.read_buffer_size.max(1),
    };

    let thread = thread::Builder::new()
        .name(THREAD_NAME.to_string())
        .spawn(move || {
            let status = match panic::catch_unwind(AssertUnwindSafe(|| reader.run())) {
                Ok(status) => status,
                Err(_) => {
                    tracing::error!("Reader thread panicked");
                    LinkStatus::Lost(LinkFailure {
                        kind: io::ErrorKind::Other,
                        message: "reader thread panicked".to_string(),
                    })
                }
            };
            status_tx.send_replace(status);
        })?;

    Ok((
        ReaderHandle {
            stop,
            status: status_rx,
            dropped,
            thread: Some(thread),
        },
        frames_rx,
    ))
}

/// State owned by the reader thread.
struct LinkReader<R> {
    stream: R,
    extractor: FrameExtractor,
    handoff: HandOffSender,
    stop: Arc<AtomicBool>,
    read_buffer_size: usize,
}

impl<R: Read> LinkReader<R> {
    /// Main read loop. Returns the terminal status.
    fn run(mut self) -> LinkStatus {
        tracing::info!("Reader started");

        let mut buf = vec![0u8; self.read_buffer_size];

        let status = loop {
            if self.stop.load(Ordering::Acquire) {
                break LinkStatus::Stopped;
            }

            // Give a parked frame another chance even when the line is idle
            if self.handoff.flush().is_err() {
                break LinkStatus::Stopped;
            }

            let n = match self.stream.read(&mut buf) {
                // Nothing arrived before the timeout
                Ok(0) => {
                    thread::sleep(IDLE_BACKOFF);
                    continue;
                }
                Ok(n) => n,
                Err(e) if is_idle(&e) => continue,
                Err(e) => {
                    tracing::error!("Serial read failed: {}", e);
                    break LinkStatus::Lost(LinkFailure::from(&e));
                }
            };

            if self.dispatch(&buf[..n]).is_err() {
                break LinkStatus::Stopped;
            }
        };

        tracing::info!("Reader exited: {:?}", status);
        status
    }

    /// Extract frames from a chunk and hand status frames to the consumer.
    fn dispatch(&mut self, chunk: &[u8]) -> std::result::Result<(), ChannelClosed> {
        for frame in self.extractor.feed(chunk) {
            if !frame.is_status() {
                tracing::debug!("Dropping {}-byte frame", frame.len());
                continue;
            }
            self.handoff.push(frame)?;
        }
        Ok(())
    }
}

/// Errors that only mean "no data yet".
fn is_idle(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

//! Hand-off channel between the reader thread and the state owner.
//!
//! A bounded `tokio::sync::mpsc` channel carries complete status frames.
//! The reader side never blocks: when the channel is full the newest frame
//! is parked in a single overflow slot and retried on the next push or
//! [`HandOffSender::flush`]. A newer frame replaces a parked one.
//!
//! The slot is shared with [`HandOffReceiver`], which takes the parked frame
//! once the queue is empty. A frame is only ever parked while the queue is
//! full, so it is always newer than everything queued, and the consumer sees
//! it without waiting for the reader to come back from a blocking read.
//!
//! ```text
//! reader thread ─► HandOffSender ─► mpsc (bounded) ─► HandOffReceiver
//!                      │                                   ▲
//!                      └──── overflow slot (latest only) ───┘
//! ```
//!
//! Both halves are used from plain threads; `try_send`/`try_recv` need no
//! async runtime. The slot lock is only held across non-blocking calls.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{TryRecvError, TrySendError};

use crate::protocol::Frame;

/// Default channel capacity (frames).
pub const DEFAULT_CHANNEL_CAPACITY: usize = 32;

type Slot = Arc<Mutex<Option<Frame>>>;

/// The consumer has gone away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelClosed;

/// Create a hand-off channel with the given capacity.
///
/// # Panics
///
/// Panics if `capacity` is zero.
pub fn channel(capacity: usize) -> (HandOffSender, HandOffReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    let parked: Slot = Arc::new(Mutex::new(None));
    (
        HandOffSender::new(tx, parked.clone()),
        HandOffReceiver { rx, parked },
    )
}

/// Non-blocking producer side of the hand-off channel.
#[derive(Debug)]
pub struct HandOffSender {
    tx: mpsc::Sender<Frame>,
    /// Newest frame that did not fit.
    parked: Slot,
    /// Frames discarded because a newer one replaced them in the slot.
    dropped: Arc<AtomicU64>,
}

impl HandOffSender {
    fn new(tx: mpsc::Sender<Frame>, parked: Slot) -> Self {
        Self {
            tx,
            parked,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Queue a frame without blocking.
    ///
    /// A parked frame is retried first so delivery order stays FIFO.
    pub fn push(&mut self, frame: Frame) -> Result<(), ChannelClosed> {
        let mut slot = self.parked.lock();
        self.flush_slot(&mut slot)?;

        if slot.is_some() {
            // Still full
            self.park(&mut slot, frame);
            return Ok(());
        }

        match self.tx.try_send(frame) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(frame)) => {
                self.park(&mut slot, frame);
                Ok(())
            }
            Err(TrySendError::Closed(_)) => Err(ChannelClosed),
        }
    }

    /// Retry delivery of the parked frame, if any.
    pub fn flush(&mut self) -> Result<(), ChannelClosed> {
        let mut slot = self.parked.lock();
        self.flush_slot(&mut slot)
    }

    fn flush_slot(&self, slot: &mut Option<Frame>) -> Result<(), ChannelClosed> {
        let Some(frame) = slot.take() else {
            return if self.tx.is_closed() {
                Err(ChannelClosed)
            } else {
                Ok(())
            };
        };

        match self.tx.try_send(frame) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(frame)) => {
                *slot = Some(frame);
                Ok(())
            }
            Err(TrySendError::Closed(_)) => Err(ChannelClosed),
        }
    }

    fn park(&self, slot: &mut Option<Frame>, frame: Frame) {
        if slot.replace(frame).is_some() {
            let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            tracing::debug!("Hand-off channel full, dropped stale frame ({} total)", total);
        }
    }

    /// Check if a frame is waiting in the overflow slot.
    #[inline]
    pub fn has_parked(&self) -> bool {
        self.parked.lock().is_some()
    }

    /// Get the number of frames dropped so far.
    #[inline]
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Get a clone of the dropped counter Arc (for sharing with the owner).
    pub fn dropped_counter(&self) -> Arc<AtomicU64> {
        self.dropped.clone()
    }
}

/// Consuming side of the hand-off channel.
#[derive(Debug)]
pub struct HandOffReceiver {
    rx: mpsc::Receiver<Frame>,
    parked: Slot,
}

impl HandOffReceiver {
    /// Take the next frame in delivery order without blocking.
    ///
    /// Queued frames come first, then the parked one.
    pub fn try_recv(&mut self) -> Result<Frame, TryRecvError> {
        let mut slot = self.parked.lock();
        match self.rx.try_recv() {
            Ok(frame) => Ok(frame),
            Err(err) => slot.take().ok_or(err),
        }
    }

    /// Take every pending frame and return only the newest.
    pub fn drain_latest(&mut self) -> Option<Frame> {
        let mut slot = self.parked.lock();
        let mut latest = None;
        // Empty and Disconnected both end the drain; the link status
        // reports why a reader went away.
        while let Ok(frame) = self.rx.try_recv() {
            latest = Some(frame);
        }
        slot.take().or(latest)
    }
}

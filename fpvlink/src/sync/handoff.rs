//! Bounded hand-off queue between the RX thread and the station loop.
//!
//! # Overview
//!
//! - [`Producer`] - write end, owned by the RX thread
//! - [`Consumer`] - read end, owned by the station loop
//! - Every blocking call takes a [`Timeout`]; expiry is reported as a value
//!   (`Err(item)` / `None`), never as a failure
//!
//! The consumer applies a [`DrainPolicy`] through [`Consumer::take`]: under
//! backlog the newest item wins and older ones are discarded, unless every
//! item has to be processed (frame-accurate recording).
//!
//! # Example
//!
//! ```
//! use fpvlink::sync::handoff::{self, DrainPolicy, Timeout};
//! use std::time::Duration;
//!
//! let (tx, rx) = handoff::channel::<u32>(8);
//! for i in 0..3 {
//!     tx.push(i).unwrap();
//! }
//!
//! let taken = rx
//!     .take(DrainPolicy::NewestWins, Timeout::from(Duration::from_millis(10)))
//!     .unwrap();
//! assert_eq!(taken.item, 2);
//! assert_eq!(taken.skipped, 2);
//! ```

use std::cell::Cell;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, SendTimeoutError, Sender, TryRecvError};

/// How long a blocking operation may wait.
#[derive(Debug, Clone, Copy)]
pub enum Timeout {
    /// Wait indefinitely.
    Infinite,
    /// Wait for at most the specified duration.
    Duration(Duration),
}

impl From<Duration> for Timeout {
    fn from(d: Duration) -> Self {
        Self::Duration(d)
    }
}

/// How the consumer treats a backlog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrainPolicy {
    /// Keep only the most recently queued item; discard the rest.
    #[default]
    NewestWins,
    /// Return the oldest item and leave the backlog queued.
    EveryItem,
}

impl DrainPolicy {
    /// Maps the "process every frame" switch onto a policy.
    #[must_use]
    pub const fn from_process_every(process_every: bool) -> Self {
        if process_every {
            Self::EveryItem
        } else {
            Self::NewestWins
        }
    }
}

/// Item returned by [`Consumer::take`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Taken<T> {
    pub item: T,
    /// Older items discarded to reach `item`.
    pub skipped: usize,
}

/// Write end of the hand-off.
pub struct Producer<T> {
    tx: Sender<T>,
}

/// Read end of the hand-off.
///
/// `Send` but not `Sync`: one thread reads.
pub struct Consumer<T> {
    rx: Receiver<T>,
    closed: Cell<bool>,
}

/// Creates a bounded hand-off holding at most `capacity` items.
///
/// # Panics
///
/// Panics if `capacity` is zero; a rendezvous channel would make every
/// admission wait for the consumer.
#[must_use]
pub fn channel<T>(capacity: usize) -> (Producer<T>, Consumer<T>) {
    assert!(capacity > 0, "hand-off capacity must be greater than 0");
    let (tx, rx) = crossbeam_channel::bounded(capacity);
    (
        Producer { tx },
        Consumer {
            rx,
            closed: Cell::new(false),
        },
    )
}

impl<T> Producer<T> {
    /// Attempts to enqueue without waiting.
    ///
    /// # Errors
    ///
    /// Returns `Err(item)` if the queue is full or the consumer is gone.
    pub fn push(&self, item: T) -> Result<(), T> {
        self.tx.try_send(item).map_err(|e| e.into_inner())
    }

    /// Enqueues, waiting up to `timeout` for room.
    ///
    /// # Errors
    ///
    /// Returns `Err(item)` on timeout or if the consumer is gone; the caller
    /// decides whether to drop it.
    pub fn push_blocking(&self, item: T, timeout: Timeout) -> Result<(), T> {
        match timeout {
            Timeout::Infinite => self.tx.send(item).map_err(|e| e.into_inner()),
            Timeout::Duration(d) => self.tx.send_timeout(item, d).map_err(|e| match e {
                SendTimeoutError::Timeout(item) | SendTimeoutError::Disconnected(item) => item,
            }),
        }
    }

    /// Number of items currently queued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tx.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }
}

impl<T> Consumer<T> {
    /// Dequeues without waiting.
    #[must_use]
    pub fn pop(&self) -> Option<T> {
        match self.rx.try_recv() {
            Ok(item) => Some(item),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.closed.set(true);
                None
            }
        }
    }

    /// Dequeues, waiting up to `timeout` for an item.
    ///
    /// Returns `None` when nothing arrived in time.
    #[must_use]
    pub fn pop_blocking(&self, timeout: Timeout) -> Option<T> {
        let result = match timeout {
            Timeout::Infinite => self.rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            Timeout::Duration(d) => self.rx.recv_timeout(d),
        };
        match result {
            Ok(item) => Some(item),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                self.closed.set(true);
                None
            }
        }
    }

    /// Dequeues one item per `policy`, waiting up to `timeout` for the first.
    ///
    /// With [`DrainPolicy::NewestWins`] everything queued behind the first
    /// item is drained and only the last one is returned.
    #[must_use]
    pub fn take(&self, policy: DrainPolicy, timeout: Timeout) -> Option<Taken<T>> {
        let mut item = self.pop_blocking(timeout)?;
        let mut skipped = 0;
        if policy == DrainPolicy::NewestWins {
            while let Some(newer) = self.pop() {
                item = newer;
                skipped += 1;
            }
        }
        Some(Taken { item, skipped })
    }

    /// Number of items currently queued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// True once a receive observed that the producer was dropped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }
}

//! First-settle-wins coordination for racing member operations.
//!
//! A [`Settle`] handle is cloned into every racing task. The first task to
//! call [`Settle::settle`] commits the outcome; later calls are no-ops. The
//! aggregate waits on the paired [`Settled`] under a single deadline.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::time::{Instant, sleep_until, timeout_at};

/// Single-assignment result cell shared by racing tasks.
pub(crate) struct Settle<T> {
    slot: Arc<Mutex<Option<oneshot::Sender<T>>>>,
}

impl<T> Clone for Settle<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> Settle<T> {
    pub(crate) fn new() -> (Self, Settled<T>) {
        let (tx, rx) = oneshot::channel();
        let settle = Self {
            slot: Arc::new(Mutex::new(Some(tx))),
        };
        (settle, Settled { rx })
    }

    /// Commit `value` unless another task already did, or the waiter gave up.
    ///
    /// Returns `true` only for the winning call.
    pub(crate) fn settle(&self, value: T) -> bool {
        let sender = self.slot.lock().take();
        match sender {
            Some(tx) => tx.send(value).is_ok(),
            None => false,
        }
    }
}

/// Receiving side of a [`Settle`].
pub(crate) struct Settled<T> {
    rx: oneshot::Receiver<T>,
}

impl<T> Settled<T> {
    /// Wait for the winning value for at most `timeout`.
    ///
    /// Returns `None` when the deadline passes. If every settler is dropped
    /// without settling, the wait still runs out the full deadline so that
    /// callers only ever observe success or timeout.
    pub(crate) async fn wait(self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        match timeout_at(deadline, self.rx).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(_)) => {
                sleep_until(deadline).await;
                None
            }
            Err(_) => None,
        }
    }
}

// src/runner/wake.rs

//! Directional handles for the daemon's wake queue and its outward
//! completed-task feed.
//!
//! A wake signal carries no payload; it only means "look at the store
//! again". Pushing and pulling are split into separate types so that only
//! the daemon can ever receive.

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

use crate::task::Task;

/// Create a bounded wake queue.
///
/// `capacity` must be at least 1.
pub fn wake_channel(capacity: usize) -> (WakeSignaler, WakeSource) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (WakeSignaler { tx }, WakeSource { rx })
}

/// Push side of the wake queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct WakeSignaler {
    tx: mpsc::Sender<()>,
}

impl WakeSignaler {
    /// Push one wake signal, waiting for room if the queue is full.
    ///
    /// Returns `false` if the daemon is gone.
    pub async fn notify(&self) -> bool {
        self.tx.send(()).await.is_ok()
    }

    /// Push one wake signal without waiting.
    ///
    /// A full queue already guarantees a future scan, so it counts as
    /// delivered. Returns `false` only if the daemon is gone.
    pub fn try_notify(&self) -> bool {
        match self.tx.try_send(()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(())) => {
                debug!("wake queue full; signal coalesced");
                true
            }
            Err(mpsc::error::TrySendError::Closed(())) => false,
        }
    }
}

/// Pull side of the wake queue, owned by the daemon.
#[derive(Debug)]
pub struct WakeSource {
    rx: mpsc::Receiver<()>,
}

impl WakeSource {
    /// Wait for the next signal. `None` once every signaler is dropped.
    pub async fn next(&mut self) -> Option<()> {
        self.rx.recv().await
    }

    /// Discard signals that piled up while the daemon was busy. Returns how
    /// many were dropped.
    pub fn drain(&mut self) -> usize {
        let mut dropped = 0;
        while self.rx.try_recv().is_ok() {
            dropped += 1;
        }
        dropped
    }
}

/// Subscription to tasks the daemon finished.
///
/// Backed by a broadcast channel: a slow subscriber loses the oldest items
/// instead of holding the daemon up.
#[derive(Debug)]
pub struct CompletedSource {
    rx: broadcast::Receiver<Task>,
}

impl CompletedSource {
    pub(crate) fn new(rx: broadcast::Receiver<Task>) -> Self {
        Self { rx }
    }

    /// Next completed task, or `None` once the daemon has shut down.
    pub async fn next(&mut self) -> Option<Task> {
        loop {
            match self.rx.recv().await {
                Ok(task) => return Some(task),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "completed-task subscriber lagged; skipping");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

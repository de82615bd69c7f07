// src/exec/execution.rs

//! The event sequence produced by one process launch.

use tokio::sync::mpsc;

use crate::task::Task;

/// One step of a running execution.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionEvent {
    /// The process was spawned; the snapshot is `RUNNING` with `start_time`.
    Started(Task),
    /// The process exited; the snapshot is `FINISHED` with the exit code.
    Finished(Task),
    /// Waiting for the process failed after a successful start.
    WaitFailed(String),
}

/// At most two events: `Started`, then either `Finished` or `WaitFailed`.
///
/// The sequence is consumed once; after the last event `next` returns `None`.
#[derive(Debug)]
pub struct Execution {
    rx: mpsc::Receiver<ExecutionEvent>,
}

impl Execution {
    pub(crate) fn channel() -> (mpsc::Sender<ExecutionEvent>, Self) {
        let (tx, rx) = mpsc::channel(2);
        (tx, Self { rx })
    }

    /// Build an already-complete sequence, e.g. for fake executors.
    pub fn from_events(events: impl IntoIterator<Item = ExecutionEvent>) -> Self {
        let events: Vec<_> = events.into_iter().collect();
        let (tx, rx) = mpsc::channel(events.len().max(1));
        for event in events {
            // Capacity covers every event, so this cannot fail.
            let _ = tx.try_send(event);
        }
        Self { rx }
    }

    pub async fn next(&mut self) -> Option<ExecutionEvent> {
        self.rx.recv().await
    }
}

// src/runner/mod.rs

//! The runner daemon and the plumbing that wakes it.
//!
//! - [`daemon`] owns the single execution slot and drives the executor.
//! - [`wake`] provides the push/pull handles for wake signals and the
//!   completed-task subscription.
//! - [`notifier`] adapts task lifecycle events into wake signals.
//! - [`retry`] decides when a failed cycle is retried.

pub mod daemon;
pub mod notifier;
pub mod retry;
pub mod wake;

pub use daemon::{CycleOutcome, DaemonHandle, DaemonSettings, RunnerDaemon};
pub use notifier::WakeNotifier;
pub use retry::{BoundedBackoff, FixedDelay, RetryPolicy};
pub use wake::{CompletedSource, WakeSignaler, WakeSource, wake_channel};

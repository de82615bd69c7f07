// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runner daemon talks to an `ExecutorBackend` instead of spawning
//! processes itself. This makes it easy to swap in a fake executor in tests
//! while keeping the production implementation in [`super::process`].
//!
//! - `ShellExecutor` is the default implementation used by `taskd`. It runs
//!   the task's commandline under `sh -c` with output redirected to a file.
//! - Tests can provide their own `ExecutorBackend` that, for example, records
//!   which tasks were launched and replays scripted `ExecutionEvent`s.

use crate::errors::Result;
use crate::task::Task;

use super::execution::Execution;
use super::process::launch_process;

/// Trait abstracting how a prepared task is executed.
///
/// Production code uses [`ShellExecutor`]; tests can provide their own
/// implementation that doesn't spawn real processes.
pub trait ExecutorBackend: Send + Sync {
    /// Start executing `task`, which is `NEW` and has an output path.
    ///
    /// Returns `TaskdError::Launch` if nothing could be started. On success
    /// the [`Execution`] yields `Started` followed by exactly one of
    /// `Finished` or `WaitFailed`.
    fn launch(&self, task: &Task) -> Result<Execution>;
}

/// Real executor backend used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellExecutor;

impl ShellExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl ExecutorBackend for ShellExecutor {
    fn launch(&self, task: &Task) -> Result<Execution> {
        launch_process(task)
    }
}

// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running a task's commandline,
//! using `tokio::process::Command`, and reporting progress back to the
//! runner daemon as a short sequence of [`ExecutionEvent`]s.
//!
//! - [`process`] spawns one shell process and waits for it in the background.
//! - [`execution`] defines the `Started` / `Finished` / `WaitFailed` sequence.
//! - [`backend`] provides the `ExecutorBackend` trait and the concrete
//!   `ShellExecutor` that the daemon uses in production, and which tests can
//!   replace with a fake implementation.

pub mod backend;
pub mod execution;
pub mod process;

pub use backend::{ExecutorBackend, ShellExecutor};
pub use execution::{Execution, ExecutionEvent};
pub use process::launch_process;

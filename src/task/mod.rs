// src/task/mod.rs

//! Task data model and lifecycle helpers.
//!
//! - [`model`] defines `Task`, `TaskStatus` and the `NewTask` request.
//! - [`state`] holds the status transitions and the prepare-for-execution
//!   step that lazily assigns an output file.

pub mod model;
pub mod state;

pub use model::{NewTask, Task, TaskId, TaskStatus};
pub use state::prepare_for_execution;

// src/store/mod.rs

//! Persistent task storage.
//!
//! The daemon and the request layer only talk to storage through the narrow
//! [`TaskStore`] contract below. Each call is atomic for a single row; no
//! caller holds locks across calls.
//!
//! - [`sqlite`] is the durable implementation used by the binary.
//! - [`memory`] keeps rows in a map and is handy for tests and embedding.

use std::fmt::Debug;

use crate::errors::Result;
use crate::task::{NewTask, Task, TaskId};
use crate::types::SelectionOrder;

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryTaskStore;
pub use sqlite::SqliteTaskStore;

/// CRUD contract for task rows.
pub trait TaskStore: Send + Sync + Debug {
    /// Insert a new `NEW` row, assigning id and `create_time`.
    fn create(&self, task: NewTask) -> Result<Task>;

    /// Fetch one row; `TaskNotFound` if absent.
    fn read(&self, id: TaskId) -> Result<Task>;

    /// All rows, ordered by id.
    fn read_all(&self) -> Result<Vec<Task>>;

    /// Overwrite every mutable field of an existing row. `id` and
    /// `create_time` are never changed. `TaskNotFound` if the id is absent.
    fn update(&self, task: &Task) -> Result<Task>;

    /// Remove a row; `TaskNotFound` if absent.
    fn delete(&self, id: TaskId) -> Result<()>;

    /// One `NEW` row picked according to `order`; `NoRunnableTask` if none.
    fn find_runnable(&self, order: SelectionOrder) -> Result<Task>;
}

// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

use crate::task::{TaskId, TaskStatus};

#[derive(Error, Debug)]
pub enum TaskdError {
    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("No runnable task")]
    NoRunnableTask,

    #[error("Store error: {0}")]
    Store(String),

    #[error("Launch error: {0}")]
    Launch(String),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Invalid task: {0}")]
    InvalidTask(String),

    #[error("Invalid transition for task {id}: {from} -> {to}")]
    InvalidTransition {
        id: TaskId,
        from: TaskStatus,
        to: TaskStatus,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TaskdError {
    /// True for "nothing there" errors: a missing id or an empty runnable
    /// query. These are not failures from the scheduler's point of view.
    pub fn is_not_found(&self) -> bool {
        matches!(self, TaskdError::TaskNotFound(_) | TaskdError::NoRunnableTask)
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, TaskdError>;

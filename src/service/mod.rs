// src/service/mod.rs

//! Request-layer operations on tasks.
//!
//! `TaskService` is what a network front end (or the CLI) calls: it validates
//! requests, talks to the store, and tells registered listeners what changed.
//! Store errors are logged and returned unchanged.

pub mod listeners;

use std::sync::Arc;

use tracing::{error, info};

use crate::errors::{Result, TaskdError};
use crate::store::TaskStore;
use crate::task::{NewTask, Task, TaskId};

pub use listeners::{ListenerFuture, ListenerId, ListenerRegistry, TaskEvent, TaskListener};

#[derive(Debug, Clone)]
pub struct TaskService {
    store: Arc<dyn TaskStore>,
    listeners: ListenerRegistry,
}

impl TaskService {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self::with_listeners(store, ListenerRegistry::new())
    }

    pub fn with_listeners(store: Arc<dyn TaskStore>, listeners: ListenerRegistry) -> Self {
        Self { store, listeners }
    }

    pub fn listeners(&self) -> &ListenerRegistry {
        &self.listeners
    }

    pub fn register_listener(&self, listener: Arc<dyn TaskListener>) -> ListenerId {
        self.listeners.register(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    pub fn create_task(&self, request: NewTask) -> Result<Task> {
        if request.commandline.trim().is_empty() {
            return Err(TaskdError::InvalidTask("commandline must not be empty".to_string()));
        }

        let task = self.store.create(request).inspect_err(|e| {
            error!(error = %e, "create_task: failed to create task");
        })?;
        info!(task_id = task.id, cmd = %task.commandline, "task created");

        self.listeners.dispatch(TaskEvent::Created(task.clone()));
        Ok(task)
    }

    pub fn read_task(&self, id: TaskId) -> Result<Task> {
        self.store.read(id).inspect_err(|e| {
            error!(task_id = id, error = %e, "read_task: failed to get task");
        })
    }

    /// All tasks in id order, or only the `limit` most recent ones.
    pub fn list_tasks(&self, limit: Option<usize>) -> Result<Vec<Task>> {
        let mut tasks = self.store.read_all().inspect_err(|e| {
            error!(error = %e, "list_tasks: failed to get tasks");
        })?;
        if let Some(limit) = limit {
            let skip = tasks.len().saturating_sub(limit);
            tasks.drain(..skip);
        }
        Ok(tasks)
    }

    /// Delete a task at any status and return its last state.
    pub fn delete_task(&self, id: TaskId) -> Result<Task> {
        let task = self.store.read(id).inspect_err(|e| {
            error!(task_id = id, error = %e, "delete_task: failed to get task");
        })?;
        self.store.delete(id).inspect_err(|e| {
            error!(task_id = id, error = %e, "delete_task: failed to delete task");
        })?;
        info!(task_id = id, "task deleted");

        self.listeners.dispatch(TaskEvent::Deleted(task.clone()));
        Ok(task)
    }

    /// Forward a task the daemon finished to listeners.
    pub fn notify_executed(&self, task: Task) {
        self.listeners.dispatch(TaskEvent::Executed(task));
    }
}

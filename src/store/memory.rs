// src/store/memory.rs

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use crate::errors::{Result, TaskdError};
use crate::store::TaskStore;
use crate::task::{NewTask, Task, TaskId};
use crate::types::SelectionOrder;

#[derive(Debug, Default)]
struct Rows {
    next_id: TaskId,
    tasks: BTreeMap<TaskId, Task>,
}

/// Map-backed store with the same semantics as [`super::SqliteTaskStore`].
#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    rows: Mutex<Rows>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Rows>> {
        self.rows
            .lock()
            .map_err(|_| TaskdError::Store("in-memory store lock poisoned".to_string()))
    }
}

impl TaskStore for InMemoryTaskStore {
    fn create(&self, task: NewTask) -> Result<Task> {
        let mut rows = self.lock()?;
        rows.next_id += 1;
        let id = rows.next_id;
        let task = task.into_task(id, Utc::now());
        rows.tasks.insert(id, task.clone());
        Ok(task)
    }

    fn read(&self, id: TaskId) -> Result<Task> {
        self.lock()?
            .tasks
            .get(&id)
            .cloned()
            .ok_or(TaskdError::TaskNotFound(id))
    }

    fn read_all(&self) -> Result<Vec<Task>> {
        Ok(self.lock()?.tasks.values().cloned().collect())
    }

    fn update(&self, task: &Task) -> Result<Task> {
        let mut rows = self.lock()?;
        let row = rows
            .tasks
            .get_mut(&task.id)
            .ok_or(TaskdError::TaskNotFound(task.id))?;

        let create_time = row.create_time;
        *row = task.clone();
        row.create_time = create_time;
        Ok(row.clone())
    }

    fn delete(&self, id: TaskId) -> Result<()> {
        self.lock()?
            .tasks
            .remove(&id)
            .map(|_| ())
            .ok_or(TaskdError::TaskNotFound(id))
    }

    fn find_runnable(&self, order: SelectionOrder) -> Result<Task> {
        let rows = self.lock()?;
        let runnable = rows.tasks.values().filter(|t| t.is_runnable());
        let key = |t: &&Task| (t.create_time, t.id);

        let picked = match order {
            SelectionOrder::NewestFirst => runnable.max_by_key(key),
            SelectionOrder::OldestFirst => runnable.min_by_key(key),
        };
        picked.cloned().ok_or(TaskdError::NoRunnableTask)
    }
}

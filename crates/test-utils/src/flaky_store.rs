use std::sync::atomic::{AtomicUsize, Ordering};

use taskd::errors::{Result, TaskdError};
use taskd::store::{InMemoryTaskStore, TaskStore};
use taskd::task::{NewTask, Task, TaskId};
use taskd::types::SelectionOrder;

/// In-memory store whose `find_runnable` can be made to fail.
#[derive(Debug, Default)]
pub struct FlakyStore {
    inner: InMemoryTaskStore,
    failures_left: AtomicUsize,
    find_calls: AtomicUsize,
    updates: AtomicUsize,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` runnable queries with a store error.
    pub fn fail_find_runnable(&self, n: usize) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    /// Fail every runnable query from now on.
    pub fn fail_find_runnable_forever(&self) {
        self.fail_find_runnable(usize::MAX);
    }

    pub fn find_runnable_calls(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

impl TaskStore for FlakyStore {
    fn create(&self, task: NewTask) -> Result<Task> {
        self.inner.create(task)
    }

    fn read(&self, id: TaskId) -> Result<Task> {
        self.inner.read(id)
    }

    fn read_all(&self) -> Result<Vec<Task>> {
        self.inner.read_all()
    }

    fn update(&self, task: &Task) -> Result<Task> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.inner.update(task)
    }

    fn delete(&self, id: TaskId) -> Result<()> {
        self.inner.delete(id)
    }

    fn find_runnable(&self, order: SelectionOrder) -> Result<Task> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                match n {
                    0 => None,
                    usize::MAX => Some(usize::MAX),
                    n => Some(n - 1),
                }
            })
            .is_ok();
        if failing {
            return Err(TaskdError::Store("simulated store outage".to_string()));
        }
        self.inner.find_runnable(order)
    }
}

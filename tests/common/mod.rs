#![allow(dead_code)]

use std::time::Duration;

use taskd::store::TaskStore;
use taskd::task::{Task, TaskStatus};

pub use taskd_test_utils::{init_tracing, with_timeout};

/// Poll the store until `done` holds for the full task list, returning that
/// list. Every snapshot seen along the way is passed to `inspect`.
pub async fn wait_for_tasks<F, I>(store: &dyn TaskStore, mut done: F, mut inspect: I) -> Vec<Task>
where
    F: FnMut(&[Task]) -> bool,
    I: FnMut(&[Task]),
{
    with_timeout(async {
        loop {
            let tasks = store.read_all().expect("read_all");
            inspect(&tasks);
            if done(&tasks) {
                return tasks;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
}

pub fn all_finished(tasks: &[Task]) -> bool {
    !tasks.is_empty() && tasks.iter().all(|t| t.status == TaskStatus::Finished)
}

pub fn running_count(tasks: &[Task]) -> usize {
    tasks.iter().filter(|t| t.status == TaskStatus::Running).count()
}

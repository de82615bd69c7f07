use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use taskd::errors::{Result, TaskdError};
use taskd::exec::{Execution, ExecutionEvent, ExecutorBackend};
use taskd::task::Task;

/// What a scripted launch does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    /// Start, then finish with this exit code.
    Exit(i32),
    /// Fail to launch.
    LaunchError,
    /// Start, then fail while waiting.
    WaitError,
}

/// A fake executor that:
/// - records which tasks were launched
/// - replays the next queued [`Script`] (or `Exit(0)` once the queue is empty)
///   without spawning anything.
#[derive(Clone, Default)]
pub struct ScriptedExecutor {
    scripts: Arc<Mutex<VecDeque<Script>>>,
    launched: Arc<Mutex<Vec<Task>>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scripts(scripts: impl IntoIterator<Item = Script>) -> Self {
        let executor = Self::new();
        executor.scripts.lock().unwrap().extend(scripts);
        executor
    }

    /// Tasks passed to `launch`, in order.
    pub fn launched(&self) -> Vec<Task> {
        self.launched.lock().unwrap().clone()
    }
}

impl ExecutorBackend for ScriptedExecutor {
    fn launch(&self, task: &Task) -> Result<Execution> {
        self.launched.lock().unwrap().push(task.clone());
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Script::Exit(0));

        if script == Script::LaunchError {
            return Err(TaskdError::Launch("scripted launch failure".to_string()));
        }

        let mut running = task.clone();
        running.mark_running(Utc::now())?;

        let last = match script {
            Script::Exit(code) => {
                let mut done = running.clone();
                done.mark_finished(Utc::now(), code)?;
                ExecutionEvent::Finished(done)
            }
            _ => ExecutionEvent::WaitFailed("scripted wait failure".to_string()),
        };

        Ok(Execution::from_events([ExecutionEvent::Started(running), last]))
    }
}

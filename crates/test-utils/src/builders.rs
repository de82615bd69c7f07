#![allow(dead_code)]

use std::path::{Path, PathBuf};

use chrono::Utc;
use taskd::task::{NewTask, Task, TaskId};

/// Builder for task creation requests and ready-made `Task` values.
pub struct TaskBuilder {
    commandline: String,
    working_directory: PathBuf,
    output: Option<PathBuf>,
}

impl TaskBuilder {
    pub fn new(commandline: &str) -> Self {
        Self {
            commandline: commandline.to_string(),
            working_directory: std::env::temp_dir(),
            output: None,
        }
    }

    pub fn working_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.working_directory = dir.as_ref().to_path_buf();
        self
    }

    pub fn output(mut self, path: impl AsRef<Path>) -> Self {
        self.output = Some(path.as_ref().to_path_buf());
        self
    }

    /// The creation request, as the request layer would submit it.
    pub fn build(self) -> NewTask {
        NewTask::new(self.commandline, self.working_directory)
    }

    /// A `NEW` task row with the given id, bypassing any store.
    pub fn build_task(self, id: TaskId) -> Task {
        let output = self.output.clone();
        let mut task = self.build().into_task(id, Utc::now());
        task.output = output;
        task
    }
}

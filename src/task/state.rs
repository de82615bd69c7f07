// src/task/state.rs

//! Task lifecycle transitions.
//!
//! All status changes go through these helpers so that an out-of-order
//! transition surfaces as an error instead of a silently corrupted row.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::errors::{Result, TaskdError};
use crate::task::model::{Task, TaskStatus};

const OUTPUT_PREFIX: &str = "task_output_";
const OUTPUT_SUFFIX: &str = ".log";

impl Task {
    /// `NEW -> RUNNING`. Requires an output path.
    pub fn mark_running(&mut self, at: DateTime<Utc>) -> Result<()> {
        self.ensure_status(TaskStatus::New, TaskStatus::Running)?;
        if self.output.is_none() {
            return Err(TaskdError::InvalidTask(format!(
                "task {} has no output path",
                self.id
            )));
        }
        self.status = TaskStatus::Running;
        self.start_time = Some(at);
        Ok(())
    }

    /// `RUNNING -> FINISHED` with the process exit code.
    pub fn mark_finished(&mut self, at: DateTime<Utc>, return_code: i32) -> Result<()> {
        self.ensure_status(TaskStatus::Running, TaskStatus::Finished)?;
        self.status = TaskStatus::Finished;
        self.finish_time = Some(at);
        self.return_code = Some(return_code);
        self.execution_time = self
            .start_time
            .map(|start| (at - start).to_std().unwrap_or_default());
        Ok(())
    }

    fn ensure_status(&self, expected: TaskStatus, to: TaskStatus) -> Result<()> {
        if self.status != expected {
            return Err(TaskdError::InvalidTransition {
                id: self.id,
                from: self.status,
                to,
            });
        }
        Ok(())
    }
}

/// Return a copy of `task` ready to hand to an executor.
///
/// If the task has no output path yet, a fresh uniquely named file is created
/// under `output_dir` and assigned. An existing output path is kept as is.
/// The returned task is the pre-execution snapshot used for reverts.
pub fn prepare_for_execution(task: &Task, output_dir: &Path) -> Result<Task> {
    let mut prepared = task.clone();
    if prepared.output.is_some() {
        return Ok(prepared);
    }

    fs::create_dir_all(output_dir).map_err(|e| {
        TaskdError::Launch(format!(
            "creating output directory {}: {e}",
            output_dir.display()
        ))
    })?;

    let file = tempfile::Builder::new()
        .prefix(OUTPUT_PREFIX)
        .suffix(OUTPUT_SUFFIX)
        .tempfile_in(output_dir)
        .map_err(|e| {
            TaskdError::Launch(format!(
                "creating output file in {}: {e}",
                output_dir.display()
            ))
        })?;
    let (_file, path) = file
        .keep()
        .map_err(|e| TaskdError::Launch(format!("keeping output file: {e}")))?;

    debug!(task_id = task.id, output = %path.display(), "assigned output file");
    prepared.output = Some(path);
    Ok(prepared)
}

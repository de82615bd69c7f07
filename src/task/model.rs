// src/task/model.rs

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Store-assigned task identity.
pub type TaskId = i64;

/// Lifecycle state of a task.
///
/// `NEW -> RUNNING -> FINISHED`. A failed execution attempt writes the task
/// back as `NEW`; there is no failed/cancelled state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    New,
    Running,
    Finished,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::New => "NEW",
            TaskStatus::Running => "RUNNING",
            TaskStatus::Finished => "FINISHED",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "NEW" => Ok(TaskStatus::New),
            "RUNNING" => Ok(TaskStatus::Running),
            "FINISHED" => Ok(TaskStatus::Finished),
            other => Err(format!("unknown task status: {other}")),
        }
    }
}

/// A shell command plus its persisted execution record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub commandline: String,
    pub working_directory: PathBuf,
    /// File capturing merged stdout/stderr. Assigned once, by the daemon.
    pub output: Option<PathBuf>,
    pub status: TaskStatus,
    /// Only meaningful once `status == Finished`.
    pub return_code: Option<i32>,
    pub create_time: Option<DateTime<Utc>>,
    pub start_time: Option<DateTime<Utc>>,
    pub finish_time: Option<DateTime<Utc>>,
    pub execution_time: Option<Duration>,
}

impl Task {
    pub fn is_runnable(&self) -> bool {
        self.status == TaskStatus::New
    }

    pub fn is_finished(&self) -> bool {
        self.status == TaskStatus::Finished
    }

    /// Pretty JSON rendering used by the CLI and debug logs.
    pub fn to_json(&self) -> crate::errors::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// A creation request. The store fills in id, status and `create_time`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub commandline: String,
    pub working_directory: PathBuf,
}

impl NewTask {
    pub fn new(commandline: impl Into<String>, working_directory: impl Into<PathBuf>) -> Self {
        Self {
            commandline: commandline.into(),
            working_directory: working_directory.into(),
        }
    }

    /// Build the initial `NEW` row for this request.
    pub fn into_task(self, id: TaskId, create_time: DateTime<Utc>) -> Task {
        Task {
            id,
            commandline: self.commandline,
            working_directory: self.working_directory,
            output: None,
            status: TaskStatus::New,
            return_code: None,
            create_time: Some(create_time),
            start_time: None,
            finish_time: None,
            execution_time: None,
        }
    }
}

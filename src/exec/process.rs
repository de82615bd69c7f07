// src/exec/process.rs

//! Launching a single task process.

use std::fs::OpenOptions;
use std::process::Stdio;

use chrono::Utc;
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::errors::{Result, TaskdError};
use crate::exec::execution::{Execution, ExecutionEvent};
use crate::task::Task;

/// Spawn `task.commandline` under a shell with stdout and stderr both going
/// to the task's output file (created or truncated).
///
/// Fails synchronously with `TaskdError::Launch` if the output file cannot
/// be opened or the process cannot be spawned; in that case no events are
/// produced. Otherwise the returned [`Execution`] already holds `Started`
/// and a background task delivers the exit event.
///
/// The child is never killed from here: once started, it runs to completion.
pub fn launch_process(task: &Task) -> Result<Execution> {
    if task.commandline.trim().is_empty() {
        return Err(TaskdError::Launch(format!(
            "task {} has an empty commandline",
            task.id
        )));
    }

    // Validates status and output presence before anything is spawned.
    let mut running = task.clone();
    running
        .mark_running(Utc::now())
        .map_err(|e| TaskdError::Launch(e.to_string()))?;

    let output_path = running
        .output
        .clone()
        .ok_or_else(|| TaskdError::Launch(format!("task {} has no output path", task.id)))?;

    let stdout = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&output_path)
        .map_err(|e| {
            TaskdError::Launch(format!(
                "opening output file {}: {e}",
                output_path.display()
            ))
        })?;
    let stderr = stdout
        .try_clone()
        .map_err(|e| TaskdError::Launch(format!("duplicating output handle: {e}")))?;

    let mut cmd = shell_command(&task.commandline);
    cmd.current_dir(&task.working_directory)
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr));

    let child = cmd.spawn().map_err(|e| {
        TaskdError::Launch(format!(
            "spawning task {} in {}: {e}",
            task.id,
            task.working_directory.display()
        ))
    })?;
    // The child holds its own descriptors; release ours right away.
    drop(cmd);

    running.start_time = Some(Utc::now());
    info!(
        task_id = task.id,
        pid = child.id(),
        cmd = %task.commandline,
        output = %output_path.display(),
        "task process started"
    );

    let (tx, execution) = Execution::channel();
    // Fresh channel with capacity 2: the first send always succeeds.
    let _ = tx.try_send(ExecutionEvent::Started(running.clone()));
    tokio::spawn(wait_for_exit(child, running, tx));

    Ok(execution)
}

async fn wait_for_exit(mut child: Child, mut task: Task, tx: mpsc::Sender<ExecutionEvent>) {
    let task_id = task.id;
    let event = match child.wait().await {
        Ok(status) => {
            let code = status.code().unwrap_or(-1);
            match task.mark_finished(Utc::now(), code) {
                Ok(()) => {
                    info!(
                        task_id,
                        exit_code = code,
                        success = status.success(),
                        "task process exited"
                    );
                    ExecutionEvent::Finished(task)
                }
                Err(e) => ExecutionEvent::WaitFailed(e.to_string()),
            }
        }
        Err(e) => {
            warn!(task_id, error = %e, "waiting for task process failed");
            ExecutionEvent::WaitFailed(e.to_string())
        }
    };

    if tx.send(event).await.is_err() {
        debug!(task_id, "execution dropped before exit was observed");
    }
}

fn shell_command(commandline: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(commandline);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(commandline);
        c
    }
}

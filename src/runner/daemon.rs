// src/runner/daemon.rs

use std::fmt;
use std::future::pending;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::errors::{Result, TaskdError};
use crate::exec::{ExecutionEvent, ExecutorBackend};
use crate::runner::retry::{FixedDelay, RetryPolicy};
use crate::runner::wake::{CompletedSource, WakeSignaler, WakeSource, wake_channel};
use crate::store::TaskStore;
use crate::task::{Task, TaskId, prepare_for_execution};
use crate::types::SelectionOrder;

pub const DEFAULT_WAKE_CAPACITY: usize = 16;
const COMPLETED_CAPACITY: usize = 64;

/// Knobs for the runner daemon.
#[derive(Debug, Clone)]
pub struct DaemonSettings {
    /// Directory where output files are created.
    pub output_dir: PathBuf,
    pub selection_order: SelectionOrder,
    pub retry_policy: Arc<dyn RetryPolicy>,
    pub wake_capacity: usize,
    /// Periodic self-wake, for rows written by other processes that share
    /// the store. `None` means only explicit signals wake the daemon.
    pub poll_interval: Option<Duration>,
}

impl DaemonSettings {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            selection_order: SelectionOrder::default(),
            retry_policy: Arc::new(FixedDelay::default()),
            wake_capacity: DEFAULT_WAKE_CAPACITY,
            poll_interval: None,
        }
    }

    pub fn with_selection_order(mut self, order: SelectionOrder) -> Self {
        self.selection_order = order;
        self
    }

    pub fn with_retry_policy(mut self, policy: Arc<dyn RetryPolicy>) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn with_poll_interval(mut self, interval: Option<Duration>) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// What one pass over the store ended with.
#[derive(Debug)]
pub enum CycleOutcome {
    /// Nothing was runnable.
    Idle,
    /// The runnable query failed.
    StoreFailed(TaskdError),
    /// The task could not be prepared or spawned; it is still `NEW`.
    LaunchFailed { task_id: TaskId, error: TaskdError },
    /// The process started but its exit was never observed; the
    /// pre-execution snapshot was written back. `error` says why.
    Reverted { task: Task, error: TaskdError },
    /// The process exited and the `FINISHED` row was written.
    Completed(Task),
}

impl CycleOutcome {
    pub fn needs_retry(&self) -> bool {
        matches!(
            self,
            CycleOutcome::StoreFailed(_)
                | CycleOutcome::LaunchFailed { .. }
                | CycleOutcome::Reverted { .. }
        )
    }
}

/// Owner of the single execution slot.
///
/// The daemon is the only writer of task status. It sleeps until a wake
/// signal arrives, then repeatedly pulls one runnable task from the store and
/// runs it to completion until nothing runnable is left. Failures are logged
/// and turned into a delayed re-signal according to the retry policy.
pub struct RunnerDaemon<E: ExecutorBackend> {
    store: Arc<dyn TaskStore>,
    executor: E,
    settings: DaemonSettings,
    wake_tx: WakeSignaler,
    wake_rx: WakeSource,
    completed_tx: broadcast::Sender<Task>,
    consecutive_failures: u32,
}

impl<E: ExecutorBackend> fmt::Debug for RunnerDaemon<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunnerDaemon")
            .field("store", &self.store)
            .field("settings", &self.settings)
            .field("consecutive_failures", &self.consecutive_failures)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend + 'static> RunnerDaemon<E> {
    pub fn new(store: Arc<dyn TaskStore>, executor: E, settings: DaemonSettings) -> Self {
        let (wake_tx, wake_rx) = wake_channel(settings.wake_capacity);
        let (completed_tx, _) = broadcast::channel(COMPLETED_CAPACITY);
        info!(
            output_dir = %settings.output_dir.display(),
            selection_order = %settings.selection_order,
            "runner daemon created"
        );
        Self {
            store,
            executor,
            settings,
            wake_tx,
            wake_rx,
            completed_tx,
            consecutive_failures: 0,
        }
    }

    /// Handle for pushing wake signals.
    pub fn signaler(&self) -> WakeSignaler {
        self.wake_tx.clone()
    }

    /// Subscribe to tasks completed from now on.
    pub fn subscribe_completed(&self) -> CompletedSource {
        CompletedSource::new(self.completed_tx.subscribe())
    }

    /// Spawn the service loop. Consumes the daemon, so it can only be
    /// started once.
    pub fn start(self) -> DaemonHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        if let Some(interval) = self.settings.poll_interval {
            spawn_poller(self.signaler(), interval, shutdown_rx.clone());
        }
        let join = tokio::spawn(self.run(shutdown_rx));
        DaemonHandle {
            shutdown: shutdown_tx,
            join,
        }
    }

    async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("runner daemon started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                biased;
                _ = stop_requested(&mut shutdown) => break,
                signal = self.wake_rx.next() => {
                    if signal.is_none() {
                        info!("wake channel closed");
                        break;
                    }
                }
            }

            let coalesced = self.wake_rx.drain();
            if coalesced > 0 {
                debug!(coalesced, "coalesced pending wake signals");
            }

            // Keep the slot busy until the store has nothing left to run.
            loop {
                let outcome = self.run_cycle().await;
                if !matches!(outcome, CycleOutcome::Completed(_)) || *shutdown.borrow() {
                    break;
                }
            }
        }

        info!("runner daemon stopped");
    }

    /// One pass: pick a runnable task, execute it, persist the transitions,
    /// then publish the result or schedule a retry.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let outcome = self.execute_next().await;

        match &outcome {
            CycleOutcome::Idle => {
                self.consecutive_failures = 0;
            }
            CycleOutcome::Completed(task) => {
                self.consecutive_failures = 0;
                // No subscribers is fine.
                let _ = self.completed_tx.send(task.clone());
            }
            CycleOutcome::StoreFailed(_) => self.schedule_retry("store query failed"),
            CycleOutcome::LaunchFailed { .. } => self.schedule_retry("launch failed"),
            CycleOutcome::Reverted { .. } => self.schedule_retry("execution failed"),
        }

        outcome
    }

    async fn execute_next(&self) -> CycleOutcome {
        let task = match self.store.find_runnable(self.settings.selection_order) {
            Ok(task) => task,
            Err(e) if e.is_not_found() => {
                debug!("no runnable task");
                return CycleOutcome::Idle;
            }
            Err(e) => {
                warn!(error = %e, "failed to get runnable task");
                return CycleOutcome::StoreFailed(e);
            }
        };
        debug!(task_id = task.id, cmd = %task.commandline, "picked runnable task");

        let prepared = match prepare_for_execution(&task, &self.settings.output_dir) {
            Ok(prepared) => prepared,
            Err(error) => {
                warn!(task_id = task.id, error = %error, "failed to prepare task");
                return CycleOutcome::LaunchFailed {
                    task_id: task.id,
                    error,
                };
            }
        };

        let mut execution = match self.executor.launch(&prepared) {
            Ok(execution) => execution,
            Err(error) => {
                warn!(task_id = task.id, error = %error, "failed to launch task");
                // Keep the freshly assigned output so retries reuse it.
                if prepared.output != task.output {
                    self.persist(&prepared);
                }
                return CycleOutcome::LaunchFailed {
                    task_id: task.id,
                    error,
                };
            }
        };

        match execution.next().await {
            Some(ExecutionEvent::Started(running)) => {
                debug!(task_id = running.id, status = %running.status, "updating task");
                self.persist(&running);
            }
            Some(ExecutionEvent::Finished(_)) => {
                return self.revert(prepared, "finished before start was reported");
            }
            Some(ExecutionEvent::WaitFailed(reason)) => return self.revert(prepared, &reason),
            None => return self.revert(prepared, "execution ended without events"),
        }

        match execution.next().await {
            Some(ExecutionEvent::Finished(done)) => {
                debug!(
                    task_id = done.id,
                    status = %done.status,
                    return_code = ?done.return_code,
                    "updating task"
                );
                self.persist(&done);
                CycleOutcome::Completed(done)
            }
            Some(ExecutionEvent::WaitFailed(reason)) => self.revert(prepared, &reason),
            Some(ExecutionEvent::Started(_)) => self.revert(prepared, "started reported twice"),
            None => self.revert(prepared, "execution ended without exit status"),
        }
    }

    fn revert(&self, prepared: Task, reason: &str) -> CycleOutcome {
        warn!(task_id = prepared.id, reason, "task execution failed; reverting to NEW");
        self.persist(&prepared);
        CycleOutcome::Reverted {
            error: TaskdError::Execution(format!("task {}: {reason}", prepared.id)),
            task: prepared,
        }
    }

    fn persist(&self, task: &Task) {
        if let Err(e) = self.store.update(task) {
            warn!(
                task_id = task.id,
                status = %task.status,
                error = %e,
                "failed to persist task"
            );
        }
    }

    fn schedule_retry(&mut self, reason: &'static str) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        let attempt = self.consecutive_failures;

        let Some(delay) = self.settings.retry_policy.delay_for(attempt) else {
            error!(attempt, reason, "retry budget exhausted; waiting for the next wake signal");
            return;
        };

        info!(attempt, reason, delay_ms = delay.as_millis() as u64, "scheduling retry");
        let signaler = self.wake_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if !signaler.notify().await {
                debug!("daemon gone before retry fired");
            }
        });
    }
}

/// Push a wake signal every `interval` until the daemon is stopped or gone.
/// A full wake queue already guarantees a scan, so ticks never wait.
fn spawn_poller(signaler: WakeSignaler, interval: Duration, mut shutdown: watch::Receiver<bool>) {
    debug!(interval_ms = interval.as_millis() as u64, "store poller started");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = stop_requested(&mut shutdown) => break,
                _ = ticker.tick() => {
                    if !signaler.try_notify() {
                        break;
                    }
                }
            }
        }
        debug!("store poller stopped");
    });
}

/// Resolves once `stop()` was called. Dropping the handle without stopping
/// detaches the daemon instead of stopping it.
async fn stop_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            pending::<()>().await;
        }
    }
}

/// Control handle for a started daemon.
#[derive(Debug)]
pub struct DaemonHandle {
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl DaemonHandle {
    /// Ask the loop to exit once the current task (if any) is done.
    /// Calling it more than once has no further effect.
    pub fn stop(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the loop to exit.
    pub async fn join(self) -> Result<()> {
        self.join
            .await
            .map_err(|e| TaskdError::Other(anyhow::anyhow!("runner daemon task failed: {e}")))
    }

    /// `stop()` followed by `join()`.
    pub async fn shutdown(self) -> Result<()> {
        self.stop();
        self.join().await
    }
}

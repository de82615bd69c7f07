// tests/daemon_retry.rs

//! Failure handling of the runner daemon, driven with a fake executor and a
//! store that can be told to fail. Timing tests run on Tokio's paused clock.

mod common;
use crate::common::init_tracing;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::tempdir;
use tokio::time::sleep;

use taskd::errors::TaskdError;
use taskd::exec::ShellExecutor;
use taskd::runner::{BoundedBackoff, CycleOutcome, DaemonSettings, RunnerDaemon};
use taskd::store::TaskStore;
use taskd::task::{NewTask, TaskStatus};
use taskd_test_utils::fake_executor::{Script, ScriptedExecutor};
use taskd_test_utils::flaky_store::FlakyStore;

fn settings(dir: &Path) -> DaemonSettings {
    DaemonSettings::new(dir.join("output"))
}

#[tokio::test(start_paused = true)]
async fn store_failure_schedules_one_retry_five_seconds_later() {
    init_tracing();
    let dir = tempdir().unwrap();
    let store = Arc::new(FlakyStore::new());
    store.fail_find_runnable_forever();

    let daemon = RunnerDaemon::new(store.clone(), ScriptedExecutor::new(), settings(dir.path()));
    let signaler = daemon.signaler();
    let handle = daemon.start();
    signaler.notify().await;

    sleep(Duration::from_millis(100)).await;
    assert_eq!(store.find_runnable_calls(), 1);

    // No tight loop: nothing happens before the delay elapses.
    sleep(Duration::from_millis(4800)).await;
    assert_eq!(store.find_runnable_calls(), 1);

    sleep(Duration::from_millis(200)).await;
    assert_eq!(store.find_runnable_calls(), 2);

    // Unbounded: it keeps going at the same pace.
    sleep(Duration::from_secs(5)).await;
    assert_eq!(store.find_runnable_calls(), 3);

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn retry_runs_the_task_once_the_store_recovers() {
    init_tracing();
    let dir = tempdir().unwrap();
    let store = Arc::new(FlakyStore::new());
    let task = store.create(NewTask::new("echo hi", dir.path())).unwrap();
    store.fail_find_runnable(1);

    let executor = ScriptedExecutor::new();
    let daemon = RunnerDaemon::new(store.clone(), executor.clone(), settings(dir.path()));
    let mut completed = daemon.subscribe_completed();
    let signaler = daemon.signaler();
    let handle = daemon.start();
    signaler.notify().await;

    sleep(Duration::from_secs(1)).await;
    assert!(executor.launched().is_empty());

    let done = tokio::time::timeout(Duration::from_secs(10), completed.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(done.id, task.id);
    assert_eq!(store.read(task.id).unwrap().status, TaskStatus::Finished);

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn no_runnable_task_is_not_retried() {
    init_tracing();
    let dir = tempdir().unwrap();
    let store = Arc::new(FlakyStore::new());

    let daemon = RunnerDaemon::new(store.clone(), ScriptedExecutor::new(), settings(dir.path()));
    let signaler = daemon.signaler();
    let handle = daemon.start();
    signaler.notify().await;

    sleep(Duration::from_secs(30)).await;
    assert_eq!(store.find_runnable_calls(), 1);

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn launch_failure_in_missing_directory_is_retried() {
    init_tracing();
    let dir = tempdir().unwrap();
    let store = Arc::new(FlakyStore::new());
    let task = store
        .create(NewTask::new("echo never", dir.path().join("missing")))
        .unwrap();

    let daemon = RunnerDaemon::new(store.clone(), ShellExecutor::new(), settings(dir.path()));
    let signaler = daemon.signaler();
    let handle = daemon.start();
    signaler.notify().await;

    sleep(Duration::from_millis(100)).await;
    assert_eq!(store.find_runnable_calls(), 1);
    let row = store.read(task.id).unwrap();
    assert_eq!(row.status, TaskStatus::New);
    let output = row.output.clone().expect("output kept for the retry");

    sleep(Duration::from_secs(5)).await;
    assert_eq!(store.find_runnable_calls(), 2);
    let row = store.read(task.id).unwrap();
    assert_eq!(row.status, TaskStatus::New);
    assert_eq!(row.output, Some(output), "output path never changes");

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn wait_failure_reverts_to_the_pre_execution_snapshot() {
    init_tracing();
    let dir = tempdir().unwrap();
    let store = Arc::new(FlakyStore::new());
    let task = store.create(NewTask::new("echo hi", dir.path())).unwrap();

    let executor = ScriptedExecutor::with_scripts([Script::WaitError]);
    let mut daemon = RunnerDaemon::new(store.clone(), executor.clone(), settings(dir.path()));

    let reverted = match daemon.run_cycle().await {
        CycleOutcome::Reverted { task, error } => {
            match &error {
                TaskdError::Execution(msg) => {
                    assert!(msg.contains("scripted wait failure"), "{msg}")
                }
                other => panic!("expected an execution error, got {other:?}"),
            }
            task
        }
        other => panic!("expected Reverted, got {other:?}"),
    };
    // RUNNING was persisted, then the revert.
    assert_eq!(store.update_calls(), 2);

    let row = store.read(task.id).unwrap();
    assert_eq!(row.status, TaskStatus::New);
    assert!(row.start_time.is_none());
    assert!(row.return_code.is_none());
    assert_eq!(row.output, reverted.output);
    assert!(row.output.is_some());

    // The next attempt reuses the same output file and completes.
    match daemon.run_cycle().await {
        CycleOutcome::Completed(done) => {
            assert_eq!(done.id, task.id);
            assert_eq!(done.output, reverted.output);
        }
        other => panic!("expected Completed, got {other:?}"),
    }
    let launched = executor.launched();
    assert_eq!(launched.len(), 2);
    assert_eq!(launched[0].output, launched[1].output);
}

#[tokio::test]
async fn scripted_launch_failure_leaves_task_new() {
    init_tracing();
    let dir = tempdir().unwrap();
    let store = Arc::new(FlakyStore::new());
    let task = store.create(NewTask::new("echo hi", dir.path())).unwrap();

    let executor = ScriptedExecutor::with_scripts([Script::LaunchError, Script::Exit(4)]);
    let mut daemon = RunnerDaemon::new(store.clone(), executor, settings(dir.path()));

    assert!(matches!(
        daemon.run_cycle().await,
        CycleOutcome::LaunchFailed { .. }
    ));
    assert_eq!(store.read(task.id).unwrap().status, TaskStatus::New);

    match daemon.run_cycle().await {
        CycleOutcome::Completed(done) => assert_eq!(done.return_code, Some(4)),
        other => panic!("expected Completed, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn bounded_backoff_doubles_and_gives_up() {
    init_tracing();
    let dir = tempdir().unwrap();
    let store = Arc::new(FlakyStore::new());
    store.fail_find_runnable_forever();

    let policy = Arc::new(BoundedBackoff::new(Duration::from_secs(1), 2));
    let daemon = RunnerDaemon::new(
        store.clone(),
        ScriptedExecutor::new(),
        settings(dir.path()).with_retry_policy(policy),
    );
    let signaler = daemon.signaler();
    let handle = daemon.start();
    signaler.notify().await;

    sleep(Duration::from_millis(100)).await;
    assert_eq!(store.find_runnable_calls(), 1);

    // First retry after 1s, second after a further 2s.
    sleep(Duration::from_secs(1)).await;
    assert_eq!(store.find_runnable_calls(), 2);
    sleep(Duration::from_secs(2)).await;
    assert_eq!(store.find_runnable_calls(), 3);

    // Budget exhausted.
    sleep(Duration::from_secs(60)).await;
    assert_eq!(store.find_runnable_calls(), 3);

    // An outside wake still triggers a scan.
    signaler.notify().await;
    sleep(Duration::from_millis(100)).await;
    assert_eq!(store.find_runnable_calls(), 4);

    handle.shutdown().await.unwrap();
}

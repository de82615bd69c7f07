//! Shared helpers for taskd's integration tests.

pub mod builders;
pub mod fake_executor;
pub mod flaky_store;

use std::fs;
use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use taskd::task::Task;
use tracing_subscriber::EnvFilter;

/// Upper bound for anything a test awaits on the real clock.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(10);

static TRACING: Once = Once::new();

/// Install a per-test tracing subscriber once per test binary.
///
/// Filter comes from `TASKD_LOG`, then `RUST_LOG`, then `warn`. Output goes
/// through the test writer, so it only shows for failing tests (or with
/// `--nocapture`).
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = ["TASKD_LOG", "RUST_LOG"]
            .into_iter()
            .find_map(|var| EnvFilter::try_from_env(var).ok())
            .unwrap_or_else(|| EnvFilter::new("warn"));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Await `f`, failing the test after [`TEST_TIMEOUT`].
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(TEST_TIMEOUT, f).await {
        Ok(value) => value,
        Err(_) => panic!("test timed out after {TEST_TIMEOUT:?}"),
    }
}

/// Contents of a task's output file; panics if it has none.
pub fn read_output(task: &Task) -> String {
    let path = task
        .output
        .as_ref()
        .unwrap_or_else(|| panic!("task {} has no output file", task.id));
    fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("reading {}: {e}", path.display()))
}

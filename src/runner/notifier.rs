// src/runner/notifier.rs

use tracing::{debug, trace};

use crate::runner::wake::WakeSignaler;
use crate::service::{ListenerFuture, TaskListener};
use crate::task::Task;

/// Turns every task lifecycle event into one wake signal for the daemon.
///
/// The payload is ignored; the daemon always asks the store what is runnable.
/// Sending waits if the wake queue is full.
#[derive(Debug, Clone)]
pub struct WakeNotifier {
    signaler: WakeSignaler,
}

impl WakeNotifier {
    pub fn new(signaler: WakeSignaler) -> Self {
        Self { signaler }
    }

    async fn wake(&self, hook: &'static str) {
        trace!(hook, "waking runner daemon");
        if !self.signaler.notify().await {
            debug!(hook, "runner daemon is gone; wake signal dropped");
        }
    }
}

impl TaskListener for WakeNotifier {
    fn on_task_created<'a>(&'a self, _task: &'a Task) -> ListenerFuture<'a> {
        Box::pin(self.wake("created"))
    }

    fn on_task_updated<'a>(&'a self, _task: &'a Task) -> ListenerFuture<'a> {
        Box::pin(self.wake("updated"))
    }

    fn on_task_deleted<'a>(&'a self, _task: &'a Task) -> ListenerFuture<'a> {
        Box::pin(self.wake("deleted"))
    }

    fn on_task_executed<'a>(&'a self, _task: &'a Task) -> ListenerFuture<'a> {
        Box::pin(self.wake("executed"))
    }
}

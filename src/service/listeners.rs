// src/service/listeners.rs

//! Task lifecycle listeners and their registry.
//!
//! Listeners are keyed by the [`ListenerId`] handed out at registration.
//! Events are queued and delivered by a dedicated fan-out task, one event at
//! a time, to every listener registered when the event is delivered. A slow
//! listener delays later events but never the code that dispatched them.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::task::Task;

pub type ListenerFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Hooks called after task rows change. All default to no-ops.
pub trait TaskListener: Send + Sync {
    fn on_task_created<'a>(&'a self, _task: &'a Task) -> ListenerFuture<'a> {
        Box::pin(async {})
    }

    fn on_task_updated<'a>(&'a self, _task: &'a Task) -> ListenerFuture<'a> {
        Box::pin(async {})
    }

    fn on_task_deleted<'a>(&'a self, _task: &'a Task) -> ListenerFuture<'a> {
        Box::pin(async {})
    }

    fn on_task_executed<'a>(&'a self, _task: &'a Task) -> ListenerFuture<'a> {
        Box::pin(async {})
    }
}

/// A change to deliver to listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskEvent {
    Created(Task),
    Updated(Task),
    Deleted(Task),
    Executed(Task),
}

impl TaskEvent {
    pub fn task(&self) -> &Task {
        match self {
            TaskEvent::Created(t)
            | TaskEvent::Updated(t)
            | TaskEvent::Deleted(t)
            | TaskEvent::Executed(t) => t,
        }
    }

    async fn deliver(&self, listener: &dyn TaskListener) {
        match self {
            TaskEvent::Created(t) => listener.on_task_created(t).await,
            TaskEvent::Updated(t) => listener.on_task_updated(t).await,
            TaskEvent::Deleted(t) => listener.on_task_deleted(t).await,
            TaskEvent::Executed(t) => listener.on_task_executed(t).await,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
struct Listeners {
    next_id: u64,
    by_id: BTreeMap<ListenerId, Arc<dyn TaskListener>>,
}

/// Subscriber map plus the queue feeding the fan-out task.
#[derive(Clone)]
pub struct ListenerRegistry {
    listeners: Arc<Mutex<Listeners>>,
    events: mpsc::UnboundedSender<TaskEvent>,
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.len())
            .finish()
    }
}

impl ListenerRegistry {
    /// Create an empty registry and spawn its fan-out task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new() -> Self {
        let listeners = Arc::new(Mutex::new(Listeners::default()));
        let (events, rx) = mpsc::unbounded_channel();
        tokio::spawn(fan_out(Arc::clone(&listeners), rx));
        Self { listeners, events }
    }

    pub fn register(&self, listener: Arc<dyn TaskListener>) -> ListenerId {
        let mut guard = lock(&self.listeners);
        guard.next_id += 1;
        let id = ListenerId(guard.next_id);
        guard.by_id.insert(id, listener);
        debug!(listener = id.0, "listener registered");
        id
    }

    /// Returns `false` if `id` was not registered.
    pub fn remove(&self, id: ListenerId) -> bool {
        let removed = lock(&self.listeners).by_id.remove(&id).is_some();
        if removed {
            debug!(listener = id.0, "listener removed");
        }
        removed
    }

    pub fn len(&self) -> usize {
        lock(&self.listeners).by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Queue an event for delivery. Never blocks.
    pub fn dispatch(&self, event: TaskEvent) {
        if self.events.send(event).is_err() {
            debug!("listener fan-out task is gone; event dropped");
        }
    }
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn lock(listeners: &Mutex<Listeners>) -> MutexGuard<'_, Listeners> {
    listeners.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn fan_out(listeners: Arc<Mutex<Listeners>>, mut rx: mpsc::UnboundedReceiver<TaskEvent>) {
    while let Some(event) = rx.recv().await {
        let targets: Vec<Arc<dyn TaskListener>> = lock(&listeners).by_id.values().cloned().collect();
        trace!(task_id = event.task().id, listeners = targets.len(), "delivering task event");
        for listener in targets {
            event.deliver(listener.as_ref()).await;
        }
    }
    debug!("listener fan-out finished (all registries dropped)");
}

// src/config/model.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::runner::retry::{BoundedBackoff, FixedDelay, RetryPolicy};
use crate::runner::{DaemonSettings, daemon::DEFAULT_WAKE_CAPACITY};
use crate::types::SelectionOrder;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [store]
/// path = "~/tmp/tasks.db"
///
/// [daemon]
/// output_dir = "~/tmp/output"
/// selection_order = "newest_first"
/// retry_delay_secs = 5
/// ```
///
/// All sections and keys are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub store: StoreSection,

    #[serde(default)]
    pub daemon: DaemonSection,
}

/// `[store]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreSection {
    /// SQLite database file. Default: `$HOME/tmp/tasks.db`.
    pub path: Option<String>,
}

/// `[daemon]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct DaemonSection {
    /// Where output files go. Default: `$HOME/tmp/output`.
    pub output_dir: Option<String>,

    #[serde(default)]
    pub selection_order: SelectionOrder,

    /// Delay before a failed cycle is retried (base delay with `max_retries`).
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// Unset means retry forever with a fixed delay. When set, the delay
    /// doubles per attempt and retrying stops after this many attempts.
    #[serde(default)]
    pub max_retries: Option<u32>,

    #[serde(default = "default_wake_capacity")]
    pub wake_capacity: usize,

    /// Scan the store once right after startup.
    #[serde(default = "default_true")]
    pub wake_on_start: bool,

    /// Periodic store scan, so tasks submitted by other processes (e.g.
    /// `taskd submit`) get picked up. 0 disables it.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

fn default_retry_delay_secs() -> u64 {
    5
}

fn default_poll_interval_secs() -> u64 {
    1
}

fn default_wake_capacity() -> usize {
    DEFAULT_WAKE_CAPACITY
}

fn default_true() -> bool {
    true
}

impl Default for DaemonSection {
    fn default() -> Self {
        Self {
            output_dir: None,
            selection_order: SelectionOrder::default(),
            retry_delay_secs: default_retry_delay_secs(),
            max_retries: None,
            wake_capacity: default_wake_capacity(),
            wake_on_start: default_true(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

/// Validated configuration.
///
/// Only constructible through `TryFrom<RawConfigFile>` (see `validate.rs`),
/// so paths are resolved and numeric settings are in range.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub store_path: PathBuf,
    pub daemon: DaemonConfig,
}

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub output_dir: PathBuf,
    pub selection_order: SelectionOrder,
    pub retry_delay: Duration,
    pub max_retries: Option<u32>,
    pub wake_capacity: usize,
    pub wake_on_start: bool,
    pub poll_interval: Option<Duration>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        let base = default_base_dir();
        let store_path = raw
            .store
            .path
            .as_deref()
            .map(expand_home)
            .unwrap_or_else(|| base.join("tasks.db"));
        let output_dir = raw
            .daemon
            .output_dir
            .as_deref()
            .map(expand_home)
            .unwrap_or_else(|| base.join("output"));

        Self {
            store_path,
            daemon: DaemonConfig {
                output_dir,
                selection_order: raw.daemon.selection_order,
                retry_delay: Duration::from_secs(raw.daemon.retry_delay_secs),
                max_retries: raw.daemon.max_retries,
                wake_capacity: raw.daemon.wake_capacity,
                wake_on_start: raw.daemon.wake_on_start,
                poll_interval: (raw.daemon.poll_interval_secs > 0)
                    .then(|| Duration::from_secs(raw.daemon.poll_interval_secs)),
            },
        }
    }

    /// Apply command-line overrides.
    pub fn with_overrides(mut self, db: Option<&Path>, output_dir: Option<&Path>) -> Self {
        if let Some(db) = db {
            self.store_path = db.to_path_buf();
        }
        if let Some(dir) = output_dir {
            self.daemon.output_dir = dir.to_path_buf();
        }
        self
    }
}

impl DaemonConfig {
    pub fn retry_policy(&self) -> Arc<dyn RetryPolicy> {
        match self.max_retries {
            Some(max) => Arc::new(BoundedBackoff::new(self.retry_delay, max)),
            None => Arc::new(FixedDelay::new(self.retry_delay)),
        }
    }

    pub fn settings(&self) -> DaemonSettings {
        let mut settings = DaemonSettings::new(self.output_dir.clone())
            .with_selection_order(self.selection_order)
            .with_retry_policy(self.retry_policy())
            .with_poll_interval(self.poll_interval);
        settings.wake_capacity = self.wake_capacity;
        settings
    }
}

/// `$HOME/tmp`, or `./tmp` when `HOME` is unset.
pub fn default_base_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tmp")
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), std::env::var_os("HOME")) {
        (Some(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => PathBuf::from(path),
    }
}

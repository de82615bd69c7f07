// tests/config_loading.rs

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::tempdir;

use taskd::config::{ConfigFile, RawConfigFile, load_and_validate, load_or_default};
use taskd::errors::TaskdError;
use taskd::types::SelectionOrder;

fn write_config(dir: &Path, contents: &str) -> PathBuf {
    let path = dir.join("Taskd.toml");
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn empty_file_gives_defaults() {
    let dir = tempdir().unwrap();
    let cfg = load_and_validate(write_config(dir.path(), "")).unwrap();

    assert!(cfg.store_path.ends_with("tmp/tasks.db"));
    assert!(cfg.daemon.output_dir.ends_with("tmp/output"));
    assert_eq!(cfg.daemon.selection_order, SelectionOrder::NewestFirst);
    assert_eq!(cfg.daemon.retry_delay, Duration::from_secs(5));
    assert_eq!(cfg.daemon.max_retries, None);
    assert_eq!(cfg.daemon.wake_capacity, 16);
    assert!(cfg.daemon.wake_on_start);
    assert_eq!(cfg.daemon.poll_interval, Some(Duration::from_secs(1)));
    assert_eq!(cfg.daemon.settings().poll_interval, Some(Duration::from_secs(1)));

    let policy = cfg.daemon.retry_policy();
    assert_eq!(policy.delay_for(1), Some(Duration::from_secs(5)));
    assert_eq!(policy.delay_for(1000), Some(Duration::from_secs(5)));
}

#[test]
fn full_file_is_applied() {
    let dir = tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"
[store]
path = "/var/lib/taskd/tasks.db"

[daemon]
output_dir = "/var/lib/taskd/output"
selection_order = "oldest_first"
retry_delay_secs = 2
max_retries = 3
wake_capacity = 4
wake_on_start = false
poll_interval_secs = 30
"#,
    );
    let cfg = load_and_validate(path).unwrap();

    assert_eq!(cfg.store_path, PathBuf::from("/var/lib/taskd/tasks.db"));
    assert_eq!(cfg.daemon.output_dir, PathBuf::from("/var/lib/taskd/output"));
    assert_eq!(cfg.daemon.selection_order, SelectionOrder::OldestFirst);
    assert!(!cfg.daemon.wake_on_start);
    assert_eq!(cfg.daemon.poll_interval, Some(Duration::from_secs(30)));

    let settings = cfg.daemon.settings();
    assert_eq!(settings.wake_capacity, 4);
    assert_eq!(settings.poll_interval, Some(Duration::from_secs(30)));
    assert_eq!(settings.selection_order, SelectionOrder::OldestFirst);

    // Bounded: 2s, 4s, 8s, then give up.
    let policy = settings.retry_policy;
    assert_eq!(policy.delay_for(1), Some(Duration::from_secs(2)));
    assert_eq!(policy.delay_for(3), Some(Duration::from_secs(8)));
    assert_eq!(policy.delay_for(4), None);
}

#[test]
fn zero_values_are_rejected() {
    for body in [
        "[daemon]\nretry_delay_secs = 0\n",
        "[daemon]\nwake_capacity = 0\n",
        "[store]\npath = \"  \"\n",
        "[daemon]\noutput_dir = \"\"\n",
    ] {
        let dir = tempdir().unwrap();
        let err = load_and_validate(write_config(dir.path(), body)).unwrap_err();
        assert!(matches!(err, TaskdError::ConfigError(_)), "{body}: {err:?}");
    }
}

#[test]
fn unknown_selection_order_is_a_parse_error() {
    let dir = tempdir().unwrap();
    let path = write_config(dir.path(), "[daemon]\nselection_order = \"random\"\n");
    assert!(matches!(
        load_and_validate(path),
        Err(TaskdError::TomlError(_))
    ));
}

#[test]
fn explicit_missing_file_is_an_error() {
    let dir = tempdir().unwrap();
    let err = load_or_default(Some(&dir.path().join("absent.toml"))).unwrap_err();
    assert!(matches!(err, TaskdError::IoError(_)), "{err:?}");
}

#[test]
fn overrides_replace_paths() {
    let cfg = ConfigFile::try_from(RawConfigFile::default())
        .unwrap()
        .with_overrides(Some(Path::new("/tmp/other.db")), Some(Path::new("/tmp/out")));
    assert_eq!(cfg.store_path, PathBuf::from("/tmp/other.db"));
    assert_eq!(cfg.daemon.output_dir, PathBuf::from("/tmp/out"));

    let untouched = ConfigFile::try_from(RawConfigFile::default())
        .unwrap()
        .with_overrides(None, None);
    assert!(untouched.store_path.ends_with("tasks.db"));
}

#[test]
fn home_prefix_is_expanded() {
    let Some(home) = std::env::var_os("HOME") else {
        return;
    };
    let dir = tempdir().unwrap();
    let path = write_config(dir.path(), "[store]\npath = \"~/queues/tasks.db\"\n");
    let cfg = load_and_validate(path).unwrap();
    assert_eq!(cfg.store_path, PathBuf::from(home).join("queues/tasks.db"));
}

#[test]
fn selection_order_parses_aliases() {
    assert_eq!("lifo".parse::<SelectionOrder>().unwrap(), SelectionOrder::NewestFirst);
    assert_eq!("fifo".parse::<SelectionOrder>().unwrap(), SelectionOrder::OldestFirst);
    assert_eq!("newest_first".parse::<SelectionOrder>().unwrap(), SelectionOrder::NewestFirst);
    assert!("sideways".parse::<SelectionOrder>().is_err());
}

#[test]
fn zero_poll_interval_disables_polling() {
    let dir = tempdir().unwrap();
    let path = write_config(dir.path(), "[daemon]\npoll_interval_secs = 0\n");
    let cfg = load_and_validate(path).unwrap();
    assert_eq!(cfg.daemon.poll_interval, None);
    assert_eq!(cfg.daemon.settings().poll_interval, None);
}

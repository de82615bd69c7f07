// tests/sqlite_store.rs

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use tempfile::tempdir;

use taskd::errors::TaskdError;
use taskd::store::{InMemoryTaskStore, SqliteTaskStore, TaskStore};
use taskd::task::{NewTask, TaskStatus};
use taskd::types::SelectionOrder;

fn stores() -> Vec<(&'static str, Box<dyn TaskStore>)> {
    vec![
        ("sqlite", Box::new(SqliteTaskStore::open_in_memory().unwrap())),
        ("memory", Box::new(InMemoryTaskStore::new())),
    ]
}

#[test]
fn crud_smoke_test() {
    for (name, store) in stores() {
        assert!(store.read_all().unwrap().is_empty(), "{name}");

        let task = store.create(NewTask::new("ls", "/home/someone")).unwrap();
        assert_eq!(task.id, 1, "{name}");
        assert_eq!(task.status, TaskStatus::New, "{name}");
        assert!(task.create_time.is_some(), "{name}");
        assert_eq!(task.output, None, "{name}");

        let mut fetched = store.read(task.id).unwrap();
        assert_eq!(fetched.commandline, "ls", "{name}");
        assert_eq!(fetched.working_directory, PathBuf::from("/home/someone"), "{name}");

        fetched.output = Some(PathBuf::from("/tmp/task_output_1.log"));
        fetched.mark_running(Utc::now()).unwrap();
        fetched.mark_finished(Utc::now(), 1).unwrap();
        let updated = store.update(&fetched).unwrap();
        assert_eq!(updated.status, TaskStatus::Finished, "{name}");
        assert_eq!(updated.return_code, Some(1), "{name}");
        assert_eq!(updated.output, fetched.output, "{name}");
        assert_eq!(updated.create_time, task.create_time, "{name}");

        store.delete(task.id).unwrap();
        assert!(store.read_all().unwrap().is_empty(), "{name}");
        assert!(
            matches!(store.read(task.id), Err(TaskdError::TaskNotFound(1))),
            "{name}"
        );
    }
}

#[test]
fn update_and_delete_of_missing_rows_are_not_found() {
    for (name, store) in stores() {
        let kept = store.create(NewTask::new("echo keep", "/")).unwrap();
        let gone = store.create(NewTask::new("echo gone", "/")).unwrap();

        store.delete(gone.id).unwrap();
        let second = store.delete(gone.id).unwrap_err();
        assert!(second.is_not_found(), "{name}: {second:?}");
        assert!(store.update(&gone).unwrap_err().is_not_found(), "{name}");

        // The unrelated row is untouched.
        assert_eq!(store.read(kept.id).unwrap(), kept, "{name}");
    }
}

#[test]
fn update_never_rewrites_create_time() {
    for (name, store) in stores() {
        let task = store.create(NewTask::new("true", "/")).unwrap();
        let mut changed = task.clone();
        changed.create_time = Some(Utc::now() + chrono::Duration::days(1));
        changed.output = Some(PathBuf::from("/tmp/x.log"));

        let updated = store.update(&changed).unwrap();
        assert_eq!(updated.create_time, task.create_time, "{name}");
        assert_eq!(store.read(task.id).unwrap().create_time, task.create_time, "{name}");
    }
}

#[test]
fn find_runnable_honours_selection_order() {
    for (name, store) in stores() {
        assert!(matches!(
            store.find_runnable(SelectionOrder::NewestFirst),
            Err(TaskdError::NoRunnableTask)
        ));

        let a = store.create(NewTask::new("echo A", "/")).unwrap();
        std::thread::sleep(Duration::from_millis(2));
        let b = store.create(NewTask::new("echo B", "/")).unwrap();

        let newest = store.find_runnable(SelectionOrder::NewestFirst).unwrap();
        assert_eq!(newest.id, b.id, "{name}");
        let oldest = store.find_runnable(SelectionOrder::OldestFirst).unwrap();
        assert_eq!(oldest.id, a.id, "{name}");

        // Non-NEW rows are never picked.
        let mut running = b.clone();
        running.output = Some(PathBuf::from("/tmp/b.log"));
        running.mark_running(Utc::now()).unwrap();
        store.update(&running).unwrap();
        assert_eq!(
            store.find_runnable(SelectionOrder::NewestFirst).unwrap().id,
            a.id,
            "{name}"
        );
    }
}

#[test]
fn sqlite_rows_survive_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("tasks.db");

    let id = {
        let store = SqliteTaskStore::open(&path).unwrap();
        assert_eq!(store.path(), path.as_path());
        let mut task = store.create(NewTask::new("sleep 1", "/tmp")).unwrap();
        task.output = Some(PathBuf::from("/tmp/out.log"));
        task.mark_running(Utc::now()).unwrap();
        task.mark_finished(Utc::now() + chrono::Duration::milliseconds(250), 0)
            .unwrap();
        store.update(&task).unwrap();
        task.id
    };

    let store = SqliteTaskStore::open(&path).unwrap();
    let task = store.read(id).unwrap();
    assert_eq!(task.status, TaskStatus::Finished);
    assert_eq!(task.return_code, Some(0));
    assert!(task.start_time.is_some() && task.finish_time.is_some());
    assert!(task.execution_time.unwrap() >= Duration::from_millis(249));
}

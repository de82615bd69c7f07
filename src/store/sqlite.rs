// src/store/sqlite.rs

//! SQLite-backed task store.
//!
//! `rusqlite::Connection` is not `Sync`, so it lives behind a `Mutex`; every
//! trait call takes the lock for exactly one statement (or one statement plus
//! a read-back of the same row).

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, warn};

use crate::errors::{Result, TaskdError};
use crate::store::TaskStore;
use crate::task::{NewTask, Task, TaskId, TaskStatus};
use crate::types::SelectionOrder;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS tasks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    status TEXT NOT NULL,
    commandline TEXT NOT NULL,
    working_directory TEXT NOT NULL,
    output TEXT,
    return_code INTEGER,
    create_time TEXT NOT NULL,
    start_time TEXT,
    finish_time TEXT,
    execution_time_ms INTEGER
);
CREATE INDEX IF NOT EXISTS idx_tasks_status_create_time ON tasks (status, create_time);
";

const COLUMNS: &str = "id, status, commandline, working_directory, output, return_code, \
     create_time, start_time, finish_time, execution_time_ms";

const SQL_INSERT_TASK: &str = "INSERT INTO tasks (status, commandline, working_directory, create_time)
     VALUES (?1, ?2, ?3, ?4)";

const SQL_UPDATE_TASK: &str = "UPDATE tasks SET
     status = ?1,
     commandline = ?2,
     working_directory = ?3,
     output = ?4,
     return_code = ?5,
     start_time = ?6,
     finish_time = ?7,
     execution_time_ms = ?8
     WHERE id = ?9";

const SQL_DELETE_TASK: &str = "DELETE FROM tasks WHERE id = ?1";

/// Store backed by a single SQLite database file.
#[derive(Debug)]
pub struct SqliteTaskStore {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl SqliteTaskStore {
    /// Open (or create) the database at `path`, creating parent directories
    /// and the schema as needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(&path).map_err(store_err)?;
        Self::init(conn, path)
    }

    /// Private in-memory database, mainly for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(store_err)?;
        Self::init(conn, PathBuf::from(":memory:"))
    }

    fn init(conn: Connection, path: PathBuf) -> Result<Self> {
        conn.execute_batch(SCHEMA).map_err(store_err)?;
        debug!(path = %path.display(), "task database ready");
        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| {
            warn!(path = %self.path.display(), "sqlite connection mutex poisoned");
            TaskdError::Store("sqlite connection mutex poisoned".to_string())
        })
    }
}

impl TaskStore for SqliteTaskStore {
    fn create(&self, task: NewTask) -> Result<Task> {
        let conn = self.lock()?;
        let now = Utc::now();
        conn.execute(
            SQL_INSERT_TASK,
            params![
                TaskStatus::New.as_str(),
                task.commandline,
                path_to_text(&task.working_directory),
                time_to_text(now),
            ],
        )
        .map_err(store_err)?;
        let id = conn.last_insert_rowid();
        query_one(&conn, id)
    }

    fn read(&self, id: TaskId) -> Result<Task> {
        let conn = self.lock()?;
        query_one(&conn, id)
    }

    fn read_all(&self) -> Result<Vec<Task>> {
        let conn = self.lock()?;
        let sql = format!("SELECT {COLUMNS} FROM tasks ORDER BY id");
        let mut stmt = conn.prepare(&sql).map_err(store_err)?;
        let rows = stmt
            .query_map([], TaskRow::from_row)
            .map_err(store_err)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(store_err)?;
        rows.into_iter().map(TaskRow::into_task).collect()
    }

    fn update(&self, task: &Task) -> Result<Task> {
        let conn = self.lock()?;
        let affected = conn
            .execute(
                SQL_UPDATE_TASK,
                params![
                    task.status.as_str(),
                    task.commandline,
                    path_to_text(&task.working_directory),
                    task.output.as_deref().map(path_to_text),
                    task.return_code,
                    task.start_time.map(time_to_text),
                    task.finish_time.map(time_to_text),
                    task.execution_time.map(|d| d.as_millis() as i64),
                    task.id,
                ],
            )
            .map_err(store_err)?;
        if affected == 0 {
            return Err(TaskdError::TaskNotFound(task.id));
        }
        query_one(&conn, task.id)
    }

    fn delete(&self, id: TaskId) -> Result<()> {
        let conn = self.lock()?;
        let affected = conn
            .execute(SQL_DELETE_TASK, params![id])
            .map_err(store_err)?;
        if affected == 0 {
            return Err(TaskdError::TaskNotFound(id));
        }
        Ok(())
    }

    fn find_runnable(&self, order: SelectionOrder) -> Result<Task> {
        let direction = match order {
            SelectionOrder::NewestFirst => "DESC",
            SelectionOrder::OldestFirst => "ASC",
        };
        let sql = format!(
            "SELECT {COLUMNS} FROM tasks WHERE status = ?1
             ORDER BY create_time {direction}, id {direction} LIMIT 1"
        );

        let conn = self.lock()?;
        let row = conn
            .query_row(&sql, params![TaskStatus::New.as_str()], TaskRow::from_row)
            .optional()
            .map_err(store_err)?;
        match row {
            Some(row) => row.into_task(),
            None => Err(TaskdError::NoRunnableTask),
        }
    }
}

fn query_one(conn: &Connection, id: TaskId) -> Result<Task> {
    let sql = format!("SELECT {COLUMNS} FROM tasks WHERE id = ?1");
    let row = conn
        .query_row(&sql, params![id], TaskRow::from_row)
        .optional()
        .map_err(store_err)?;
    match row {
        Some(row) => row.into_task(),
        None => Err(TaskdError::TaskNotFound(id)),
    }
}

/// Raw column values, converted into a `Task` outside of rusqlite's
/// error type.
struct TaskRow {
    id: TaskId,
    status: String,
    commandline: String,
    working_directory: String,
    output: Option<String>,
    return_code: Option<i32>,
    create_time: String,
    start_time: Option<String>,
    finish_time: Option<String>,
    execution_time_ms: Option<i64>,
}

impl TaskRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            status: row.get(1)?,
            commandline: row.get(2)?,
            working_directory: row.get(3)?,
            output: row.get(4)?,
            return_code: row.get(5)?,
            create_time: row.get(6)?,
            start_time: row.get(7)?,
            finish_time: row.get(8)?,
            execution_time_ms: row.get(9)?,
        })
    }

    fn into_task(self) -> Result<Task> {
        let status = self
            .status
            .parse::<TaskStatus>()
            .map_err(|e| TaskdError::Store(format!("row {}: {e}", self.id)))?;

        Ok(Task {
            id: self.id,
            commandline: self.commandline,
            working_directory: PathBuf::from(self.working_directory),
            output: self.output.filter(|s| !s.is_empty()).map(PathBuf::from),
            status,
            return_code: self.return_code,
            create_time: Some(text_to_time(&self.create_time)?),
            start_time: self.start_time.as_deref().map(text_to_time).transpose()?,
            finish_time: self.finish_time.as_deref().map(text_to_time).transpose()?,
            execution_time: self
                .execution_time_ms
                .map(|ms| Duration::from_millis(ms.max(0) as u64)),
        })
    }
}

fn store_err(e: rusqlite::Error) -> TaskdError {
    TaskdError::Store(e.to_string())
}

fn path_to_text(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

// Fixed width so that text ordering matches time ordering.
fn time_to_text(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn text_to_time(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| TaskdError::Store(format!("invalid timestamp {s:?}: {e}")))
}

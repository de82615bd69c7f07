// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod runner;
pub mod service;
pub mod store;
pub mod task;
pub mod types;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::cli::{CliArgs, Command, ShowArgs};
use crate::config::ConfigFile;
use crate::exec::ShellExecutor;
use crate::runner::{RunnerDaemon, WakeNotifier};
use crate::service::TaskService;
use crate::store::{SqliteTaskStore, TaskStore};
use crate::task::NewTask;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the SQLite task store
/// - the request-layer service and its listeners
/// - the runner daemon (for `serve`)
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let output_override = match &args.command {
        Command::Serve(serve) => serve.output_dir.clone(),
        _ => None,
    };
    let cfg = config::load_or_default(args.config.as_deref())
        .context("loading configuration")?
        .with_overrides(args.db.as_deref(), output_override.as_deref());
    debug!(?cfg, "configuration loaded");

    let store: Arc<dyn TaskStore> = Arc::new(
        SqliteTaskStore::open(&cfg.store_path)
            .with_context(|| format!("opening task database {:?}", cfg.store_path))?,
    );
    let service = TaskService::new(Arc::clone(&store));

    match args.command {
        Command::Serve(_) => serve(cfg, store, service).await,
        Command::Submit(submit) => {
            let cwd = std::env::current_dir().context("reading current directory")?;
            let working_dir = match submit.working_dir {
                Some(dir) => cwd.join(dir),
                None => cwd,
            };
            let task = service.create_task(NewTask::new(submit.commandline.join(" "), working_dir))?;
            println!("Created task with ID: {}", task.id);
            Ok(())
        }
        Command::List(list) => {
            let tasks = service.list_tasks(Some(list.count))?;
            println!("{}", serde_json::to_string_pretty(&tasks)?);
            Ok(())
        }
        Command::Show(show) => print_task(&service, &show),
        Command::Delete(delete) => {
            let task = service.delete_task(delete.id)?;
            println!("Deleted task with ID: {}", task.id);
            Ok(())
        }
    }
}

/// Run the daemon until Ctrl-C, then let the current task finish.
async fn serve(cfg: ConfigFile, store: Arc<dyn TaskStore>, service: TaskService) -> Result<()> {
    let daemon = RunnerDaemon::new(store, ShellExecutor::new(), cfg.daemon.settings());
    let signaler = daemon.signaler();
    let mut completed = daemon.subscribe_completed();

    service.register_listener(Arc::new(WakeNotifier::new(signaler.clone())));
    let handle = daemon.start();

    // Completed tasks: log them and pass them on as "executed" events.
    {
        let service = service.clone();
        tokio::spawn(async move {
            while let Some(task) = completed.next().await {
                info!(
                    task_id = task.id,
                    return_code = ?task.return_code,
                    execution_ms = task.execution_time.map(|d| d.as_millis() as u64),
                    "task finished"
                );
                service.notify_executed(task);
            }
        });
    }

    if cfg.daemon.wake_on_start {
        signaler.notify().await;
    }

    info!(
        db = %cfg.store_path.display(),
        output_dir = %cfg.daemon.output_dir.display(),
        poll_interval_ms = cfg.daemon.poll_interval.map(|d| d.as_millis() as u64),
        "taskd serving; press Ctrl-C to stop"
    );
    tokio::signal::ctrl_c()
        .await
        .context("listening for Ctrl-C")?;

    info!("shutdown requested; waiting for the current task to finish");
    handle.shutdown().await?;
    info!("taskd stopped");
    Ok(())
}

fn print_task(service: &TaskService, args: &ShowArgs) -> Result<()> {
    let task = service.read_task(args.id)?;

    if args.output {
        let output = task
            .output
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        println!("{output}");
    } else if args.status {
        println!("{}", task.status);
    } else if args.exit_code {
        match task.return_code {
            Some(code) => println!("{code}"),
            None => println!(),
        }
    } else {
        println!("{}", task.to_json()?);
    }
    Ok(())
}

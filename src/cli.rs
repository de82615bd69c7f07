// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::task::TaskId;

/// Command-line arguments for `taskd`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "taskd",
    version,
    about = "Queue shell commands and run them one at a time.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Taskd.toml` in the current directory if it exists.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Task database file; overrides `[store].path`.
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TASKD_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run the daemon until Ctrl-C.
    Serve(ServeArgs),
    /// Add a task to the queue.
    Submit(SubmitArgs),
    /// Print recent tasks as JSON.
    List(ListArgs),
    /// Print one task.
    Show(ShowArgs),
    /// Remove a task.
    Delete(DeleteArgs),
}

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    /// Output directory; overrides `[daemon].output_dir`.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct SubmitArgs {
    /// Working directory for the command. Default: current directory.
    #[arg(short = 'w', long, value_name = "DIR")]
    pub working_dir: Option<PathBuf>,

    /// The command line; joined with spaces and run under `sh -c`.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub commandline: Vec<String>,
}

#[derive(Debug, Clone, Args)]
pub struct ListArgs {
    /// Number of tasks to list.
    #[arg(short = 'n', default_value_t = 10)]
    pub count: usize,
}

#[derive(Debug, Clone, Args)]
pub struct ShowArgs {
    pub id: TaskId,

    /// Only print the output path.
    #[arg(short = 'o', long, conflicts_with_all = ["status", "exit_code"])]
    pub output: bool,

    /// Only print the status.
    #[arg(short = 's', long, conflicts_with = "exit_code")]
    pub status: bool,

    /// Only print the exit code.
    #[arg(short = 'e', long)]
    pub exit_code: bool,
}

#[derive(Debug, Clone, Args)]
pub struct DeleteArgs {
    pub id: TaskId,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

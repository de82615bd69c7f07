// src/logging.rs

//! Logging setup for `taskd` using `tracing` + `tracing-subscriber`.
//!
//! Where the filter comes from, first match wins:
//! 1. `--log-level` on the command line, applied to every target.
//! 2. `TASKD_LOG`, taken as a full `EnvFilter` directive string
//!    (e.g. `"debug"` or `"info,taskd::runner=trace"`).
//! 3. `info`.
//!
//! Output goes to stderr; `list` and `show` print JSON on stdout.

use anyhow::Result;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use crate::cli::LogLevel;

pub const LOG_ENV_VAR: &str = "TASKD_LOG";

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(build_filter(cli_level))
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("initialising logging: {e}"))?;

    Ok(())
}

fn build_filter(cli_level: Option<LogLevel>) -> EnvFilter {
    if let Some(level) = cli_level {
        return EnvFilter::default().add_directive(level_filter(level).into());
    }

    match std::env::var(LOG_ENV_VAR) {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::try_new(&directives)
            .unwrap_or_else(|e| {
                eprintln!("ignoring invalid {LOG_ENV_VAR}={directives:?}: {e}");
                EnvFilter::new("info")
            }),
        _ => EnvFilter::new("info"),
    }
}

fn level_filter(level: LogLevel) -> LevelFilter {
    match level {
        LogLevel::Error => LevelFilter::ERROR,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Trace => LevelFilter::TRACE,
    }
}

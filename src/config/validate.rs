// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, TaskdError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::TaskdError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_paths(cfg)?;
    validate_daemon_config(cfg)?;
    Ok(())
}

fn validate_paths(cfg: &RawConfigFile) -> Result<()> {
    if matches!(cfg.store.path.as_deref(), Some(p) if p.trim().is_empty()) {
        return Err(TaskdError::ConfigError(
            "[store].path must not be empty".to_string(),
        ));
    }
    if matches!(cfg.daemon.output_dir.as_deref(), Some(p) if p.trim().is_empty()) {
        return Err(TaskdError::ConfigError(
            "[daemon].output_dir must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_daemon_config(cfg: &RawConfigFile) -> Result<()> {
    // selection_order is strongly typed and validated during
    // deserialization, so we don't need to check it here.

    if cfg.daemon.retry_delay_secs == 0 {
        return Err(TaskdError::ConfigError(
            "[daemon].retry_delay_secs must be >= 1 (got 0)".to_string(),
        ));
    }

    if cfg.daemon.wake_capacity == 0 {
        return Err(TaskdError::ConfigError(
            "[daemon].wake_capacity must be >= 1 (got 0)".to_string(),
        ));
    }

    Ok(())
}

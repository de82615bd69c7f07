// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Which runnable task the daemon picks when several are `NEW`.
///
/// - `NewestFirst`: most recently created first (LIFO). This is the
///   historical behaviour and stays the default.
/// - `OldestFirst`: creation order (FIFO).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

impl FromStr for SelectionOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "newest_first" | "lifo" => Ok(SelectionOrder::NewestFirst),
            "oldest_first" | "fifo" => Ok(SelectionOrder::OldestFirst),
            other => Err(format!(
                "invalid selection_order: {other} (expected \"newest_first\" or \"oldest_first\")"
            )),
        }
    }
}

impl fmt::Display for SelectionOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionOrder::NewestFirst => f.write_str("newest_first"),
            SelectionOrder::OldestFirst => f.write_str("oldest_first"),
        }
    }
}

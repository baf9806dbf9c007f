//! History engine configuration.
//!
//! [`HistoryConfig::from_env`] reads:
//! - `CONCEPTMAP_HISTORY_MAX_SIZE`: bound of each stack (default: 100)
//! - `CONCEPTMAP_HISTORY_GROUPING_WINDOW_MS`: legacy grouping window (default: 1000)
//! - `CONCEPTMAP_HISTORY_DISPATCH`: `concurrent` or `sequential` (default: concurrent)

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_SIZE: usize = 100;
pub const DEFAULT_GROUPING_WINDOW_MS: u64 = 1_000;

/// How the per-command collaborator calls of one operation are issued.
///
/// In both modes calls are *started* in the engine's dispatch order (newest
/// first for undo, oldest first for redo). `Concurrent` awaits them together,
/// so completions may interleave; `Sequential` awaits each before starting
/// the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    #[default]
    Concurrent,
    Sequential,
}

impl FromStr for DispatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "concurrent" => Ok(DispatchMode::Concurrent),
            "sequential" => Ok(DispatchMode::Sequential),
            other => Err(format!("unknown dispatch mode '{}'", other)),
        }
    }
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchMode::Concurrent => write!(f, "concurrent"),
            DispatchMode::Sequential => write!(f, "sequential"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum number of commands kept in the mutation history and, separately,
    /// in the redo stack. Oldest commands are dropped first.
    pub max_size: usize,
    /// Window within which legacy deletions join the previous operation.
    pub grouping_window_ms: u64,
    pub dispatch: DispatchMode,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        HistoryConfig {
            max_size: DEFAULT_MAX_SIZE,
            grouping_window_ms: DEFAULT_GROUPING_WINDOW_MS,
            dispatch: DispatchMode::Concurrent,
        }
    }
}

impl HistoryConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup. Missing keys fall back to
    /// defaults; unparsable values are logged and ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = HistoryConfig::default();

        if let Some(raw) = lookup("CONCEPTMAP_HISTORY_MAX_SIZE") {
            match raw.trim().parse::<usize>() {
                Ok(0) => {
                    tracing::warn!("CONCEPTMAP_HISTORY_MAX_SIZE must be at least 1, using 1");
                    config.max_size = 1;
                }
                Ok(size) => config.max_size = size,
                Err(err) => tracing::warn!(%raw, %err, "ignoring CONCEPTMAP_HISTORY_MAX_SIZE"),
            }
        }

        if let Some(raw) = lookup("CONCEPTMAP_HISTORY_GROUPING_WINDOW_MS") {
            match raw.trim().parse::<u64>() {
                Ok(window) => config.grouping_window_ms = window,
                Err(err) => {
                    tracing::warn!(%raw, %err, "ignoring CONCEPTMAP_HISTORY_GROUPING_WINDOW_MS")
                }
            }
        }

        if let Some(raw) = lookup("CONCEPTMAP_HISTORY_DISPATCH") {
            match raw.parse::<DispatchMode>() {
                Ok(mode) => config.dispatch = mode,
                Err(err) => tracing::warn!(%raw, %err, "ignoring CONCEPTMAP_HISTORY_DISPATCH"),
            }
        }

        config
    }
}

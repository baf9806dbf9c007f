//! Batch dispatch of per-command futures.

use futures_util::future::{join_all, BoxFuture};

use crate::config::DispatchMode;
use crate::error::HistoryError;

/// Outcome of one operation's batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchReport {
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// Runs `tasks` in the given order and collects their results.
///
/// Futures are lazy, so a task starts on its first poll. `join_all` polls
/// them in vector order, which makes the start order identical in both modes.
pub(crate) async fn run_batch<'a>(
    mode: DispatchMode,
    tasks: Vec<BoxFuture<'a, Result<(), HistoryError>>>,
) -> Vec<Result<(), HistoryError>> {
    match mode {
        DispatchMode::Concurrent => join_all(tasks).await,
        DispatchMode::Sequential => {
            let mut results = Vec::with_capacity(tasks.len());
            for task in tasks {
                results.push(task.await);
            }
            results
        }
    }
}

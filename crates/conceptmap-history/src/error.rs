//! History error types.
//!
//! [`HistoryError`] is returned by emission wrappers and by the per-command
//! reversal/replay steps. The engines catch it at command granularity and
//! log it; it never aborts sibling commands of the same operation.

use conceptmap_storage::StorageError;
use thiserror::Error;

use crate::command::CommandType;

#[derive(Debug, Error)]
pub enum HistoryError {
    /// A command lacks the id or snapshot needed to reverse or replay it.
    #[error("cannot {action} {command}: {reason}")]
    MissingReversalData {
        command: CommandType,
        action: &'static str,
        reason: &'static str,
    },

    /// The storage collaborator rejected the call.
    #[error(transparent)]
    Collaborator(#[from] StorageError),
}

impl HistoryError {
    pub(crate) fn missing(
        command: CommandType,
        action: &'static str,
        reason: &'static str,
    ) -> Self {
        HistoryError::MissingReversalData {
            command,
            action,
            reason,
        }
    }
}

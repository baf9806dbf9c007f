//! The history engine: undo and redo of whole operations.
//!
//! [`HistoryEngine`] owns the shared [`CommandStore`](crate::CommandStore),
//! the [`CommandEmitter`] callers mutate through, and the storage
//! collaborator. Undo and redo take turns through an async gate, so a second
//! call waits for the first to finish instead of observing half-moved stacks.
//!
//! Undo moves the head operation to the redo stack before reversing it, and
//! reports success whenever there was something to undo, even if individual
//! reversals failed. Redo reports success if at least one command replayed.
//! When the mutation history is empty, undo falls back to the legacy deletion
//! log, which has no redo and aborts on the first failed restore.

use std::sync::Arc;

use conceptmap_storage::MapStore;

use crate::clock::{Clock, SystemClock};
use crate::command::{Command, CommandType, OperationId};
use crate::config::HistoryConfig;
use crate::emit::CommandEmitter;
use crate::legacy::DeletedEntity;
use crate::replay::{replay_operation, RedoGuard};
use crate::reversal::{restore_deletions, reverse_operation};
use crate::store::{CommandStore, SharedCommandStore};

/// A short description of the operation undo or redo would act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationSummary {
    pub operation_id: OperationId,
    pub command_count: usize,
    /// Type of the newest command in the operation.
    pub head: CommandType,
}

impl OperationSummary {
    fn of(operation: &[Command]) -> Option<Self> {
        let head = operation.first()?;
        Some(OperationSummary {
            operation_id: head.operation_id,
            command_count: operation.len(),
            head: head.command_type(),
        })
    }

    /// Menu-style label, e.g. `"edit concept"` or `"delete concept and 2 more"`.
    pub fn label(&self) -> String {
        match self.command_count {
            0 | 1 => self.head.description().to_string(),
            n => format!("{} and {} more", self.head.description(), n - 1),
        }
    }
}

pub struct HistoryEngine {
    store: Arc<dyn MapStore>,
    history: SharedCommandStore,
    emitter: CommandEmitter,
    config: HistoryConfig,
    clock: Arc<dyn Clock>,
    /// Serializes undo and redo.
    gate: tokio::sync::Mutex<()>,
}

impl HistoryEngine {
    pub fn new(store: Arc<dyn MapStore>, config: HistoryConfig) -> Self {
        Self::with_clock(store, config, Arc::new(SystemClock::new()))
    }

    pub fn with_clock(
        store: Arc<dyn MapStore>,
        config: HistoryConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let history = SharedCommandStore::new(CommandStore::new(&config));
        let emitter = CommandEmitter::new(store.clone(), history.clone(), clock.clone());
        HistoryEngine {
            store,
            history,
            emitter,
            config,
            clock,
            gate: tokio::sync::Mutex::new(()),
        }
    }

    /// The recording mutation API.
    pub fn emitter(&self) -> &CommandEmitter {
        &self.emitter
    }

    pub fn history(&self) -> &SharedCommandStore {
        &self.history
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Opens an operation; every command recorded until
    /// [`end_operation`](Self::end_operation) joins it.
    pub fn start_operation(&self) -> OperationId {
        self.history.lock().start_operation()
    }

    pub fn end_operation(&self) {
        self.history.lock().end_operation();
    }

    /// True if undo has something to act on, including legacy deletions.
    pub fn can_undo(&self) -> bool {
        let history = self.history.lock();
        history.can_undo() || !history.legacy_deletions().is_empty()
    }

    pub fn can_redo(&self) -> bool {
        self.history.lock().can_redo()
    }

    pub fn peek_undo(&self) -> Option<OperationSummary> {
        OperationSummary::of(&self.history.lock().most_recent_mutation_operation())
    }

    pub fn peek_redo(&self) -> Option<OperationSummary> {
        OperationSummary::of(&self.history.lock().most_recent_redo_operation())
    }

    /// Records a deletion in the legacy log and returns the operation it
    /// joined.
    pub fn record_legacy_deletion(&self, entity: DeletedEntity) -> OperationId {
        let now = self.clock.now();
        self.history.lock().record_deletion(entity, now)
    }

    pub fn clear_history(&self) {
        self.history.lock().clear_history();
        tracing::info!("history cleared");
    }

    /// Undoes the most recent operation.
    ///
    /// Returns `true` if an operation was undone. Individual reversal failures
    /// are logged and do not change the result; the operation is on the redo
    /// stack either way.
    pub async fn undo(&self) -> bool {
        let _turn = self.gate.lock().await;

        let operation = {
            let mut history = self.history.lock();
            let operation = history.remove_most_recent_mutation_operation();
            if !operation.is_empty() {
                history.push_to_redo_stack(operation.clone());
            }
            operation
        };

        let Some(summary) = OperationSummary::of(&operation) else {
            return self.undo_legacy_deletions().await;
        };

        let report = reverse_operation(self.store.as_ref(), self.config.dispatch, &operation).await;
        tracing::info!(
            operation_id = %summary.operation_id,
            label = %summary.label(),
            succeeded = report.succeeded,
            failed = report.failed,
            "undo"
        );
        true
    }

    async fn undo_legacy_deletions(&self) -> bool {
        let deletions = self.history.lock().most_recent_deletion_operation();
        let Some(operation_id) = deletions.first().map(|deletion| deletion.operation_id) else {
            tracing::debug!("nothing to undo");
            return false;
        };

        match restore_deletions(self.store.as_ref(), &deletions).await {
            Ok(()) => {
                self.history.lock().remove_deletion_operation(operation_id);
                tracing::info!(%operation_id, restored = deletions.len(), "undo legacy deletions");
                true
            }
            Err(err) => {
                tracing::warn!(%operation_id, error = %err, "failed to restore legacy deletions");
                false
            }
        }
    }

    /// Redoes the most recently undone operation.
    ///
    /// The operation is replayed oldest first with recording suppressed and
    /// then put back into history unchanged. Returns `true` if at least one
    /// command replayed.
    pub async fn redo(&self) -> bool {
        let _turn = self.gate.lock().await;

        let operation = self.history.lock().remove_most_recent_redo_operation();
        let Some(summary) = OperationSummary::of(&operation) else {
            tracing::debug!("nothing to redo");
            return false;
        };

        let report = {
            let _redoing = RedoGuard::engage(&self.history);
            replay_operation(&self.emitter, self.config.dispatch, &operation).await
        };
        self.history.lock().reinsert_into_history(operation);

        tracing::info!(
            operation_id = %summary.operation_id,
            label = %summary.label(),
            succeeded = report.succeeded,
            failed = report.failed,
            "redo"
        );
        report.succeeded > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Timestamp;
    use crate::command::CommandKind;
    use conceptmap_core::ConceptId;

    fn delete(operation_id: OperationId) -> Command {
        Command::new(
            CommandKind::DeleteConcept {
                concept_id: ConceptId::new(),
            },
            operation_id,
            Timestamp(0),
        )
    }

    #[test]
    fn summary_of_empty_operation_is_none() {
        assert_eq!(OperationSummary::of(&[]), None);
    }

    #[test]
    fn summary_label_counts_the_rest() {
        let op = OperationId::new();
        let single = OperationSummary::of(&[delete(op)]).unwrap();
        assert_eq!(single.label(), "delete concept");

        let triple = OperationSummary::of(&[delete(op), delete(op), delete(op)]).unwrap();
        assert_eq!(triple.command_count, 3);
        assert_eq!(triple.operation_id, op);
        assert_eq!(triple.label(), "delete concept and 2 more");
    }
}

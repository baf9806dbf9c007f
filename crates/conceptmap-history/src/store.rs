//! The command store: mutation history, redo stack, grouping state and the
//! replay re-entrancy flag.
//!
//! [`CommandStore`] is pure in-memory state with a synchronous API; every
//! method is total (popping an empty stack returns an empty operation).
//! Both stacks are newest-first and bounded by `max_size`. A command lives in
//! exactly one stack at a time: undo and redo *move* operations between them.
//!
//! [`SharedCommandStore`] is the handle the emitter and the engines share.
//! Callers lock it for short synchronous sections only, never across an
//! `.await`.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::clock::Timestamp;
use crate::command::{Command, CommandId, CommandKind, OperationId};
use crate::config::HistoryConfig;
use crate::grouping::ExplicitGrouping;
use crate::legacy::{DeletedEntity, LegacyDeletion, LegacyDeletionLog};

#[derive(Debug, Clone)]
pub struct CommandStore {
    mutation_history: VecDeque<Command>,
    redo_stack: VecDeque<Command>,
    grouping: ExplicitGrouping,
    legacy: LegacyDeletionLog,
    is_redoing: bool,
    max_size: usize,
}

/// All commands sharing the head command's operation, in stack order.
fn head_operation(stack: &VecDeque<Command>) -> Vec<Command> {
    match stack.front() {
        None => Vec::new(),
        Some(head) => stack
            .iter()
            .filter(|command| command.operation_id == head.operation_id)
            .cloned()
            .collect(),
    }
}

fn remove_head_operation(stack: &mut VecDeque<Command>) -> Vec<Command> {
    let Some(operation_id) = stack.front().map(|command| command.operation_id) else {
        return Vec::new();
    };
    let (removed, kept): (VecDeque<_>, VecDeque<_>) = stack
        .drain(..)
        .partition(|command| command.operation_id == operation_id);
    *stack = kept;
    removed.into()
}

/// Puts `commands` (newest first) on top of `stack`, keeping their order.
fn prepend(stack: &mut VecDeque<Command>, commands: Vec<Command>, max_size: usize) {
    for command in commands.into_iter().rev() {
        stack.push_front(command);
    }
    stack.truncate(max_size);
}

impl CommandStore {
    pub fn new(config: &HistoryConfig) -> Self {
        let max_size = config.max_size.max(1);
        CommandStore {
            mutation_history: VecDeque::with_capacity(max_size),
            redo_stack: VecDeque::new(),
            grouping: ExplicitGrouping::new(),
            legacy: LegacyDeletionLog::new(max_size, config.grouping_window_ms),
            is_redoing: false,
            max_size,
        }
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    // -------------------------------------------------------------------
    // Operation grouping
    // -------------------------------------------------------------------

    /// Opens an operation; commands recorded until `end_operation` share it.
    pub fn start_operation(&mut self) -> OperationId {
        self.grouping.start()
    }

    pub fn end_operation(&mut self) {
        if let Some(operation_id) = self.grouping.end() {
            tracing::debug!(%operation_id, "operation ended");
        }
    }

    pub fn current_operation(&self) -> Option<OperationId> {
        self.grouping.current()
    }

    // -------------------------------------------------------------------
    // Mutation history
    // -------------------------------------------------------------------

    /// Records a new command at the head of the history and invalidates redo.
    ///
    /// `operation_id` wins if given; otherwise the open operation is used, or
    /// a fresh one. Does not consult the re-entrancy flag: suppressing records
    /// during replay is the emitter's job.
    pub fn record_mutation(
        &mut self,
        kind: CommandKind,
        operation_id: Option<OperationId>,
        timestamp: Timestamp,
    ) -> CommandId {
        let operation_id = self.grouping.resolve(operation_id);
        let command = Command::new(kind, operation_id, timestamp);
        let command_id = command.id;
        tracing::debug!(
            %command_id,
            %operation_id,
            command_type = %command.command_type(),
            "recorded mutation"
        );

        self.mutation_history.push_front(command);
        self.mutation_history.truncate(self.max_size);
        if !self.redo_stack.is_empty() {
            tracing::debug!(dropped = self.redo_stack.len(), "redo stack invalidated");
            self.redo_stack.clear();
        }
        command_id
    }

    pub fn most_recent_mutation_operation(&self) -> Vec<Command> {
        head_operation(&self.mutation_history)
    }

    /// Removes and returns the most recent operation from the history.
    pub fn remove_most_recent_mutation_operation(&mut self) -> Vec<Command> {
        remove_head_operation(&mut self.mutation_history)
    }

    /// Puts an operation back on top of the history after a redo, without
    /// touching the redo stack.
    pub fn reinsert_into_history(&mut self, commands: Vec<Command>) {
        prepend(&mut self.mutation_history, commands, self.max_size);
    }

    pub fn mutation_history(&self) -> &VecDeque<Command> {
        &self.mutation_history
    }

    pub fn can_undo(&self) -> bool {
        !self.mutation_history.is_empty()
    }

    // -------------------------------------------------------------------
    // Redo stack
    // -------------------------------------------------------------------

    pub fn most_recent_redo_operation(&self) -> Vec<Command> {
        head_operation(&self.redo_stack)
    }

    pub fn remove_most_recent_redo_operation(&mut self) -> Vec<Command> {
        remove_head_operation(&mut self.redo_stack)
    }

    /// Pushes a whole undone operation (newest first) onto the redo stack.
    pub fn push_to_redo_stack(&mut self, commands: Vec<Command>) {
        prepend(&mut self.redo_stack, commands, self.max_size);
    }

    pub fn redo_stack(&self) -> &VecDeque<Command> {
        &self.redo_stack
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    // -------------------------------------------------------------------
    // Re-entrancy flag
    // -------------------------------------------------------------------

    pub fn set_is_redoing(&mut self, is_redoing: bool) {
        self.is_redoing = is_redoing;
    }

    pub fn is_redoing(&self) -> bool {
        self.is_redoing
    }

    // -------------------------------------------------------------------
    // Legacy deletion log
    // -------------------------------------------------------------------

    pub fn record_deletion(&mut self, entity: DeletedEntity, now: Timestamp) -> OperationId {
        let operation_id = self.legacy.record(entity, now);
        tracing::debug!(%operation_id, kind = entity.kind().as_str(), "recorded legacy deletion");
        operation_id
    }

    pub fn most_recent_deletion_operation(&self) -> Vec<LegacyDeletion> {
        self.legacy.most_recent_operation()
    }

    pub fn remove_most_recent_deletion_operation(&mut self) -> Vec<LegacyDeletion> {
        self.legacy.remove_most_recent_operation()
    }

    /// Removes one legacy operation by id, leaving any newer ones in place.
    pub fn remove_deletion_operation(
        &mut self,
        operation_id: OperationId,
    ) -> Vec<LegacyDeletion> {
        self.legacy.remove_operation(operation_id)
    }

    pub fn legacy_deletions(&self) -> &LegacyDeletionLog {
        &self.legacy
    }

    /// Drops everything: both stacks, the legacy log and any open operation.
    pub fn clear_history(&mut self) {
        self.mutation_history.clear();
        self.redo_stack.clear();
        self.legacy.clear();
        self.grouping.end();
    }
}

impl Default for CommandStore {
    fn default() -> Self {
        Self::new(&HistoryConfig::default())
    }
}

/// Shared handle to a [`CommandStore`].
#[derive(Debug, Clone)]
pub struct SharedCommandStore(Arc<Mutex<CommandStore>>);

impl SharedCommandStore {
    pub fn new(store: CommandStore) -> Self {
        SharedCommandStore(Arc::new(Mutex::new(store)))
    }

    pub fn lock(&self) -> MutexGuard<'_, CommandStore> {
        self.0.lock()
    }
}

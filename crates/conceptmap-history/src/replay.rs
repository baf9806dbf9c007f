//! Replay: re-executing undone commands for redo.
//!
//! Replay goes through the [`CommandEmitter`] rather than the raw store so
//! that redo performs exactly the write the original emission did, with the
//! stored ids and snapshots. The emitter sees the re-entrancy flag set by
//! [`RedoGuard`] and records nothing; the engine reinserts the replayed
//! operation into history once replay has finished.

use futures_util::FutureExt;

use crate::command::{Command, CommandKind};
use crate::config::DispatchMode;
use crate::dispatch::{run_batch, BatchReport};
use crate::emit::CommandEmitter;
use crate::error::HistoryError;
use crate::store::SharedCommandStore;

const ACTION: &str = "redo";

/// Holds the command store's re-entrancy flag for its lifetime.
///
/// The flag is cleared on drop, so it cannot stay set if replay panics or the
/// redo future is dropped mid-way.
pub struct RedoGuard {
    history: SharedCommandStore,
}

impl RedoGuard {
    pub fn engage(history: &SharedCommandStore) -> Self {
        history.lock().set_is_redoing(true);
        RedoGuard {
            history: history.clone(),
        }
    }
}

impl Drop for RedoGuard {
    fn drop(&mut self) {
        self.history.lock().set_is_redoing(false);
    }
}

/// Re-executes a single command as it was originally emitted.
pub async fn replay_command(
    emitter: &CommandEmitter,
    command: &Command,
) -> Result<(), HistoryError> {
    let command_type = command.command_type();
    let missing = |reason: &'static str| HistoryError::missing(command_type, ACTION, reason);

    match &command.kind {
        CommandKind::CreateMap { data, map_id } => {
            let id = map_id.ok_or_else(|| missing("map id was never assigned"))?;
            emitter.create_map_with_id(id, data.clone()).await?;
        }
        CommandKind::UpdateMap {
            map_id,
            updates,
            previous_state,
        } => {
            emitter
                .update_map_with_snapshot(*map_id, updates.clone(), previous_state.clone())
                .await?
        }
        CommandKind::DeleteMap { map_id } => emitter.delete_map(*map_id).await?,

        CommandKind::CreateConcept { data, concept_id } => {
            let id = concept_id.ok_or_else(|| missing("concept id was never assigned"))?;
            emitter.create_concept_with_id(id, data.clone()).await?;
        }
        CommandKind::UpdateConcept {
            concept_id,
            updates,
            previous_state,
        } => {
            emitter
                .update_concept_with_snapshot(*concept_id, updates.clone(), previous_state.clone())
                .await?
        }
        CommandKind::DeleteConcept { concept_id } => emitter.delete_concept(*concept_id).await?,

        CommandKind::CreateRelationship {
            data,
            relationship_id,
        } => {
            let id =
                relationship_id.ok_or_else(|| missing("relationship id was never assigned"))?;
            emitter.create_relationship_with_id(id, data.clone()).await?;
        }
        CommandKind::UpdateRelationship {
            relationship_id,
            updates,
            previous_state,
        } => {
            emitter
                .update_relationship_with_snapshot(
                    *relationship_id,
                    updates.clone(),
                    previous_state.clone(),
                )
                .await?
        }
        CommandKind::DeleteRelationship { relationship_id } => {
            emitter.delete_relationship(*relationship_id).await?
        }
        CommandKind::ReverseRelationship {
            relationship_id,
            previous_state,
        } => {
            emitter
                .reverse_relationship_from(*relationship_id, previous_state.clone())
                .await?;
        }

        CommandKind::CreateComment { data, comment_id } => {
            let id = comment_id.ok_or_else(|| missing("comment id was never assigned"))?;
            emitter.create_comment_with_id(id, data.clone()).await?;
        }
        CommandKind::UpdateComment {
            comment_id,
            updates,
            previous_state,
        } => {
            emitter
                .update_comment_with_snapshot(*comment_id, updates.clone(), previous_state.clone())
                .await?
        }
        CommandKind::DeleteComment { comment_id } => emitter.delete_comment(*comment_id).await?,
        CommandKind::LinkComment {
            comment_id,
            concept_id,
        } => emitter.link_comment(*comment_id, *concept_id).await?,
        CommandKind::UnlinkComment {
            comment_id,
            concept_id,
        } => emitter.unlink_comment(*comment_id, *concept_id).await?,

        CommandKind::CreatePerspective {
            data,
            perspective_id,
        } => {
            let id = perspective_id.ok_or_else(|| missing("perspective id was never assigned"))?;
            emitter.create_perspective_with_id(id, data.clone()).await?;
        }
        CommandKind::UpdatePerspective {
            perspective_id,
            updates,
            previous_state,
        } => {
            emitter
                .update_perspective_with_snapshot(
                    *perspective_id,
                    updates.clone(),
                    previous_state.clone(),
                )
                .await?
        }
        CommandKind::DeletePerspective { perspective_id } => {
            emitter.delete_perspective(*perspective_id).await?
        }
        CommandKind::ToggleConceptInPerspective {
            perspective_id,
            concept_id,
            previous_membership,
            ..
        } => {
            emitter
                .toggle_concept_with_snapshot(
                    *perspective_id,
                    *concept_id,
                    previous_membership.clone(),
                )
                .await?
        }
        CommandKind::ToggleRelationshipInPerspective {
            perspective_id,
            relationship_id,
            previous_membership,
            ..
        } => {
            emitter
                .toggle_relationship_with_snapshot(
                    *perspective_id,
                    *relationship_id,
                    previous_membership.clone(),
                )
                .await?
        }
    }
    Ok(())
}

/// Replays one operation. `operation` is in stack order (newest first); it
/// is dispatched oldest first so that creates run before the edits that
/// depend on them.
pub async fn replay_operation(
    emitter: &CommandEmitter,
    mode: DispatchMode,
    operation: &[Command],
) -> BatchReport {
    let tasks = operation
        .iter()
        .rev()
        .map(|command| replay_command(emitter, command).boxed())
        .collect();
    let results = run_batch(mode, tasks).await;

    let mut report = BatchReport::default();
    for (command, result) in operation.iter().rev().zip(results) {
        match result {
            Ok(()) => report.succeeded += 1,
            Err(err) => {
                report.failed += 1;
                tracing::warn!(
                    command_id = %command.id,
                    operation_id = %command.operation_id,
                    command_type = %command.command_type(),
                    error = %err,
                    "failed to replay command"
                );
            }
        }
    }
    report
}

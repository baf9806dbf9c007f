//! Reversal: computing and executing the inverse of recorded commands.
//!
//! Reversal talks to the storage collaborators directly; nothing it does is
//! recorded. Each command kind has exactly one inverse:
//!
//! | command | inverse |
//! |---|---|
//! | create | delete the created id |
//! | update | re-apply `previous_state` |
//! | delete | undelete |
//! | reverse relationship | set the direction back to `previous_state` |
//! | link / unlink | unlink / link |
//! | toggle membership | restore the whole previous membership |

use futures_util::FutureExt;

use conceptmap_storage::{
    CommentActions, ConceptActions, MapActions, MapStore, PerspectiveActions, RelationshipActions,
    StorageError,
};

use crate::command::{Command, CommandKind};
use crate::config::DispatchMode;
use crate::dispatch::{run_batch, BatchReport};
use crate::error::HistoryError;
use crate::legacy::{DeletedEntity, LegacyDeletion};

const ACTION: &str = "undo";

/// Executes the inverse of a single command.
pub async fn reverse_command(store: &dyn MapStore, command: &Command) -> Result<(), HistoryError> {
    let command_type = command.command_type();
    let missing = |reason: &'static str| HistoryError::missing(command_type, ACTION, reason);

    match &command.kind {
        CommandKind::CreateMap { map_id, .. } => {
            let id = map_id.ok_or_else(|| missing("map id was never assigned"))?;
            store.delete_map(id).await?;
        }
        CommandKind::UpdateMap {
            map_id,
            previous_state,
            ..
        } => {
            let previous = previous_state
                .as_ref()
                .ok_or_else(|| missing("no previous state was captured"))?;
            store.update_map(*map_id, previous).await?;
        }
        CommandKind::DeleteMap { map_id } => store.undelete_map(*map_id).await?,

        CommandKind::CreateConcept { concept_id, .. } => {
            let id = concept_id.ok_or_else(|| missing("concept id was never assigned"))?;
            store.delete_concept(id).await?;
        }
        CommandKind::UpdateConcept {
            concept_id,
            previous_state,
            ..
        } => {
            let previous = previous_state
                .as_ref()
                .ok_or_else(|| missing("no previous state was captured"))?;
            store.update_concept(*concept_id, previous).await?;
        }
        CommandKind::DeleteConcept { concept_id } => store.undelete_concept(*concept_id).await?,

        CommandKind::CreateRelationship {
            relationship_id, ..
        } => {
            let id =
                relationship_id.ok_or_else(|| missing("relationship id was never assigned"))?;
            store.delete_relationship(id).await?;
        }
        CommandKind::UpdateRelationship {
            relationship_id,
            previous_state,
            ..
        } => {
            let previous = previous_state
                .as_ref()
                .ok_or_else(|| missing("no previous state was captured"))?;
            store.update_relationship(*relationship_id, previous).await?;
        }
        CommandKind::DeleteRelationship { relationship_id } => {
            store.undelete_relationship(*relationship_id).await?
        }
        CommandKind::ReverseRelationship {
            relationship_id,
            previous_state,
        } => {
            store
                .reverse_relationship(*relationship_id, previous_state)
                .await?
        }

        CommandKind::CreateComment { comment_id, .. } => {
            let id = comment_id.ok_or_else(|| missing("comment id was never assigned"))?;
            store.delete_comment(id).await?;
        }
        CommandKind::UpdateComment {
            comment_id,
            previous_state,
            ..
        } => {
            let previous = previous_state
                .as_ref()
                .ok_or_else(|| missing("no previous state was captured"))?;
            store.update_comment(*comment_id, previous).await?;
        }
        CommandKind::DeleteComment { comment_id } => store.undelete_comment(*comment_id).await?,
        CommandKind::LinkComment {
            comment_id,
            concept_id,
        } => store.unlink_comment(*comment_id, *concept_id).await?,
        CommandKind::UnlinkComment {
            comment_id,
            concept_id,
        } => store.link_comment(*comment_id, *concept_id).await?,

        CommandKind::CreatePerspective { perspective_id, .. } => {
            let id = perspective_id.ok_or_else(|| missing("perspective id was never assigned"))?;
            store.delete_perspective(id).await?;
        }
        CommandKind::UpdatePerspective {
            perspective_id,
            previous_state,
            ..
        } => {
            let previous = previous_state
                .as_ref()
                .ok_or_else(|| missing("no previous state was captured"))?;
            store.update_perspective(*perspective_id, previous).await?;
        }
        CommandKind::DeletePerspective { perspective_id } => {
            store.undelete_perspective(*perspective_id).await?
        }
        // Toggling back would re-run the cascade against today's relationships;
        // restoring the snapshot puts back exactly what was visible.
        CommandKind::ToggleConceptInPerspective {
            perspective_id,
            previous_membership,
            ..
        }
        | CommandKind::ToggleRelationshipInPerspective {
            perspective_id,
            previous_membership,
            ..
        } => {
            store
                .set_membership(*perspective_id, previous_membership)
                .await?
        }
    }
    Ok(())
}

/// Reverses one operation. `operation` is in stack order (newest first),
/// which is also the dispatch order. Failures are logged and counted.
pub async fn reverse_operation(
    store: &dyn MapStore,
    mode: DispatchMode,
    operation: &[Command],
) -> BatchReport {
    let tasks = operation
        .iter()
        .map(|command| reverse_command(store, command).boxed())
        .collect();
    let results = run_batch(mode, tasks).await;

    let mut report = BatchReport::default();
    for (command, result) in operation.iter().zip(results) {
        match result {
            Ok(()) => report.succeeded += 1,
            Err(err) => {
                report.failed += 1;
                tracing::warn!(
                    command_id = %command.id,
                    operation_id = %command.operation_id,
                    command_type = %command.command_type(),
                    error = %err,
                    "failed to reverse command"
                );
            }
        }
    }
    report
}

/// Restores every entity of a legacy deletion operation, concepts first,
/// then relationships, then comments. Stops at the first failure.
///
/// An entity that is already live counts as restored, so an operation left
/// in the log by an earlier partial failure can be retried.
pub async fn restore_deletions(
    store: &dyn MapStore,
    deletions: &[LegacyDeletion],
) -> Result<(), HistoryError> {
    let mut ordered: Vec<&LegacyDeletion> = deletions.iter().collect();
    ordered.sort_by_key(|deletion| deletion.entity.restore_priority());

    for deletion in ordered {
        let restored = match deletion.entity {
            DeletedEntity::Concept(id) => store.undelete_concept(id).await,
            DeletedEntity::Relationship(id) => store.undelete_relationship(id).await,
            DeletedEntity::Comment(id) => store.undelete_comment(id).await,
        };
        match restored {
            Ok(()) => {}
            Err(StorageError::NotDeleted { .. }) => {
                tracing::debug!(entity = ?deletion.entity, "already restored");
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

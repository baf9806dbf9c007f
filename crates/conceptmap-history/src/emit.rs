//! Command emission: the mutation API callers use instead of the raw store.
//!
//! Each wrapper performs the mutation through the storage collaborator and,
//! only if it succeeded, records the matching [`CommandKind`]. Identifiers
//! for created entities are allocated before the write so the create can be
//! reversed later. Updates snapshot the fields they are about to overwrite.
//!
//! While the engine is replaying (redo), the command store's re-entrancy
//! flag is set and recording is skipped: the replayed operation is put back
//! into history by the engine itself.

use std::sync::Arc;

use conceptmap_core::{
    CommentData, CommentId, CommentUpdate, ConceptData, ConceptId, ConceptUpdate, MapData, MapId,
    MapUpdate, PartialUpdate, PerspectiveData, PerspectiveId, PerspectiveMembership,
    PerspectiveUpdate, RelationshipData, RelationshipDirection, RelationshipId,
    RelationshipUpdate,
};
use conceptmap_storage::{
    CommentActions, ConceptActions, MapActions, MapStore, PerspectiveActions, RelationshipActions,
};

use crate::clock::Clock;
use crate::command::{CommandKind, OperationId};
use crate::error::HistoryError;
use crate::store::SharedCommandStore;

#[derive(Clone)]
pub struct CommandEmitter {
    store: Arc<dyn MapStore>,
    history: SharedCommandStore,
    clock: Arc<dyn Clock>,
    /// Operation forced onto every command recorded through this emitter.
    operation: Option<OperationId>,
}

impl CommandEmitter {
    pub fn new(
        store: Arc<dyn MapStore>,
        history: SharedCommandStore,
        clock: Arc<dyn Clock>,
    ) -> Self {
        CommandEmitter {
            store,
            history,
            clock,
            operation: None,
        }
    }

    /// Returns an emitter whose commands all join `operation_id`, regardless
    /// of any operation opened on the store.
    pub fn in_operation(&self, operation_id: OperationId) -> Self {
        CommandEmitter {
            operation: Some(operation_id),
            ..self.clone()
        }
    }

    /// The operation currently open on the store, or a fresh one.
    pub fn current_or_new_operation(&self) -> OperationId {
        self.history
            .lock()
            .current_operation()
            .unwrap_or_else(OperationId::new)
    }

    fn record(&self, kind: CommandKind) {
        let mut history = self.history.lock();
        if history.is_redoing() {
            tracing::debug!(command_type = %kind.command_type(), "replaying; not recorded");
            return;
        }
        let now = self.clock.now();
        history.record_mutation(kind, self.operation, now);
    }

    // -------------------------------------------------------------------
    // Maps
    // -------------------------------------------------------------------

    pub async fn create_map(&self, data: MapData) -> Result<MapId, HistoryError> {
        self.create_map_with_id(MapId::new(), data).await
    }

    pub async fn create_map_with_id(
        &self,
        id: MapId,
        data: MapData,
    ) -> Result<MapId, HistoryError> {
        let map_id = self.store.create_map(id, &data).await?;
        self.record(CommandKind::CreateMap {
            data,
            map_id: Some(map_id),
        });
        Ok(map_id)
    }

    pub async fn update_map(&self, id: MapId, updates: MapUpdate) -> Result<(), HistoryError> {
        let previous_state = match self.store.map(id).await {
            Ok(map) => Some(updates.snapshot_of(&map)),
            Err(err) => {
                tracing::warn!(map_id = %id, error = %err, "no snapshot before map update");
                None
            }
        };
        self.update_map_with_snapshot(id, updates, previous_state)
            .await
    }

    pub async fn update_map_with_snapshot(
        &self,
        id: MapId,
        updates: MapUpdate,
        previous_state: Option<MapUpdate>,
    ) -> Result<(), HistoryError> {
        self.store.update_map(id, &updates).await?;
        self.record(CommandKind::UpdateMap {
            map_id: id,
            updates,
            previous_state,
        });
        Ok(())
    }

    pub async fn delete_map(&self, id: MapId) -> Result<(), HistoryError> {
        self.store.delete_map(id).await?;
        self.record(CommandKind::DeleteMap { map_id: id });
        Ok(())
    }

    // -------------------------------------------------------------------
    // Concepts
    // -------------------------------------------------------------------

    pub async fn create_concept(&self, data: ConceptData) -> Result<ConceptId, HistoryError> {
        self.create_concept_with_id(ConceptId::new(), data).await
    }

    pub async fn create_concept_with_id(
        &self,
        id: ConceptId,
        data: ConceptData,
    ) -> Result<ConceptId, HistoryError> {
        let concept_id = self.store.create_concept(id, &data).await?;
        self.record(CommandKind::CreateConcept {
            data,
            concept_id: Some(concept_id),
        });
        Ok(concept_id)
    }

    /// Updates a concept, snapshotting the touched fields first. If the
    /// snapshot cannot be read the update is still applied and recorded, but
    /// undoing it will be a no-op.
    pub async fn update_concept(
        &self,
        id: ConceptId,
        updates: ConceptUpdate,
    ) -> Result<(), HistoryError> {
        let previous_state = match self.store.concept(id).await {
            Ok(concept) => Some(updates.snapshot_of(&concept)),
            Err(err) => {
                tracing::warn!(concept_id = %id, error = %err, "no snapshot before concept update");
                None
            }
        };
        self.update_concept_with_snapshot(id, updates, previous_state)
            .await
    }

    /// Updates a concept with a caller-supplied previous state (e.g. the
    /// position a drag started from).
    pub async fn update_concept_with_snapshot(
        &self,
        id: ConceptId,
        updates: ConceptUpdate,
        previous_state: Option<ConceptUpdate>,
    ) -> Result<(), HistoryError> {
        self.store.update_concept(id, &updates).await?;
        self.record(CommandKind::UpdateConcept {
            concept_id: id,
            updates,
            previous_state,
        });
        Ok(())
    }

    pub async fn delete_concept(&self, id: ConceptId) -> Result<(), HistoryError> {
        self.store.delete_concept(id).await?;
        self.record(CommandKind::DeleteConcept { concept_id: id });
        Ok(())
    }

    // -------------------------------------------------------------------
    // Relationships
    // -------------------------------------------------------------------

    pub async fn create_relationship(
        &self,
        data: RelationshipData,
    ) -> Result<RelationshipId, HistoryError> {
        self.create_relationship_with_id(RelationshipId::new(), data)
            .await
    }

    pub async fn create_relationship_with_id(
        &self,
        id: RelationshipId,
        data: RelationshipData,
    ) -> Result<RelationshipId, HistoryError> {
        let relationship_id = self.store.create_relationship(id, &data).await?;
        self.record(CommandKind::CreateRelationship {
            data,
            relationship_id: Some(relationship_id),
        });
        Ok(relationship_id)
    }

    pub async fn update_relationship(
        &self,
        id: RelationshipId,
        updates: RelationshipUpdate,
    ) -> Result<(), HistoryError> {
        let previous_state = match self.store.relationship(id).await {
            Ok(relationship) => Some(updates.snapshot_of(&relationship)),
            Err(err) => {
                tracing::warn!(
                    relationship_id = %id,
                    error = %err,
                    "no snapshot before relationship update"
                );
                None
            }
        };
        self.update_relationship_with_snapshot(id, updates, previous_state)
            .await
    }

    pub async fn update_relationship_with_snapshot(
        &self,
        id: RelationshipId,
        updates: RelationshipUpdate,
        previous_state: Option<RelationshipUpdate>,
    ) -> Result<(), HistoryError> {
        self.store.update_relationship(id, &updates).await?;
        self.record(CommandKind::UpdateRelationship {
            relationship_id: id,
            updates,
            previous_state,
        });
        Ok(())
    }

    pub async fn delete_relationship(&self, id: RelationshipId) -> Result<(), HistoryError> {
        self.store.delete_relationship(id).await?;
        self.record(CommandKind::DeleteRelationship {
            relationship_id: id,
        });
        Ok(())
    }

    /// Flips a relationship's direction and returns the new direction.
    pub async fn reverse_relationship(
        &self,
        id: RelationshipId,
    ) -> Result<RelationshipDirection, HistoryError> {
        let current = self.store.relationship(id).await?.direction();
        self.reverse_relationship_from(id, current).await
    }

    /// Sets the relationship to `previous.reversed()`, recording `previous`.
    pub async fn reverse_relationship_from(
        &self,
        id: RelationshipId,
        previous: RelationshipDirection,
    ) -> Result<RelationshipDirection, HistoryError> {
        let reversed = previous.reversed();
        self.store.reverse_relationship(id, &reversed).await?;
        self.record(CommandKind::ReverseRelationship {
            relationship_id: id,
            previous_state: previous,
        });
        Ok(reversed)
    }

    // -------------------------------------------------------------------
    // Comments
    // -------------------------------------------------------------------

    pub async fn create_comment(&self, data: CommentData) -> Result<CommentId, HistoryError> {
        self.create_comment_with_id(CommentId::new(), data).await
    }

    pub async fn create_comment_with_id(
        &self,
        id: CommentId,
        data: CommentData,
    ) -> Result<CommentId, HistoryError> {
        let comment_id = self.store.create_comment(id, &data).await?;
        self.record(CommandKind::CreateComment {
            data,
            comment_id: Some(comment_id),
        });
        Ok(comment_id)
    }

    pub async fn update_comment(
        &self,
        id: CommentId,
        updates: CommentUpdate,
    ) -> Result<(), HistoryError> {
        let previous_state = match self.store.comment(id).await {
            Ok(comment) => Some(updates.snapshot_of(&comment)),
            Err(err) => {
                tracing::warn!(comment_id = %id, error = %err, "no snapshot before comment update");
                None
            }
        };
        self.update_comment_with_snapshot(id, updates, previous_state)
            .await
    }

    pub async fn update_comment_with_snapshot(
        &self,
        id: CommentId,
        updates: CommentUpdate,
        previous_state: Option<CommentUpdate>,
    ) -> Result<(), HistoryError> {
        self.store.update_comment(id, &updates).await?;
        self.record(CommandKind::UpdateComment {
            comment_id: id,
            updates,
            previous_state,
        });
        Ok(())
    }

    pub async fn delete_comment(&self, id: CommentId) -> Result<(), HistoryError> {
        self.store.delete_comment(id).await?;
        self.record(CommandKind::DeleteComment { comment_id: id });
        Ok(())
    }

    pub async fn link_comment(
        &self,
        comment_id: CommentId,
        concept_id: ConceptId,
    ) -> Result<(), HistoryError> {
        self.store.link_comment(comment_id, concept_id).await?;
        self.record(CommandKind::LinkComment {
            comment_id,
            concept_id,
        });
        Ok(())
    }

    pub async fn unlink_comment(
        &self,
        comment_id: CommentId,
        concept_id: ConceptId,
    ) -> Result<(), HistoryError> {
        self.store.unlink_comment(comment_id, concept_id).await?;
        self.record(CommandKind::UnlinkComment {
            comment_id,
            concept_id,
        });
        Ok(())
    }

    // -------------------------------------------------------------------
    // Perspectives
    // -------------------------------------------------------------------

    pub async fn create_perspective(
        &self,
        data: PerspectiveData,
    ) -> Result<PerspectiveId, HistoryError> {
        self.create_perspective_with_id(PerspectiveId::new(), data)
            .await
    }

    pub async fn create_perspective_with_id(
        &self,
        id: PerspectiveId,
        data: PerspectiveData,
    ) -> Result<PerspectiveId, HistoryError> {
        let perspective_id = self.store.create_perspective(id, &data).await?;
        self.record(CommandKind::CreatePerspective {
            data,
            perspective_id: Some(perspective_id),
        });
        Ok(perspective_id)
    }

    pub async fn update_perspective(
        &self,
        id: PerspectiveId,
        updates: PerspectiveUpdate,
    ) -> Result<(), HistoryError> {
        let previous_state = match self.store.perspective(id).await {
            Ok(perspective) => Some(updates.snapshot_of(&perspective)),
            Err(err) => {
                tracing::warn!(
                    perspective_id = %id,
                    error = %err,
                    "no snapshot before perspective update"
                );
                None
            }
        };
        self.update_perspective_with_snapshot(id, updates, previous_state)
            .await
    }

    pub async fn update_perspective_with_snapshot(
        &self,
        id: PerspectiveId,
        updates: PerspectiveUpdate,
        previous_state: Option<PerspectiveUpdate>,
    ) -> Result<(), HistoryError> {
        self.store.update_perspective(id, &updates).await?;
        self.record(CommandKind::UpdatePerspective {
            perspective_id: id,
            updates,
            previous_state,
        });
        Ok(())
    }

    pub async fn delete_perspective(&self, id: PerspectiveId) -> Result<(), HistoryError> {
        self.store.delete_perspective(id).await?;
        self.record(CommandKind::DeletePerspective { perspective_id: id });
        Ok(())
    }

    /// Shows or hides a concept in a perspective. The membership is read
    /// first; a perspective that cannot be read cannot be toggled reversibly,
    /// so the read error is returned and nothing is written.
    pub async fn toggle_concept_in_perspective(
        &self,
        perspective_id: PerspectiveId,
        concept_id: ConceptId,
    ) -> Result<(), HistoryError> {
        let previous = self.store.perspective(perspective_id).await?.membership();
        self.toggle_concept_with_snapshot(perspective_id, concept_id, previous)
            .await
    }

    pub async fn toggle_concept_with_snapshot(
        &self,
        perspective_id: PerspectiveId,
        concept_id: ConceptId,
        previous_membership: PerspectiveMembership,
    ) -> Result<(), HistoryError> {
        let was_included = previous_membership.contains_concept(concept_id);
        self.store.toggle_concept(perspective_id, concept_id).await?;
        self.record(CommandKind::ToggleConceptInPerspective {
            perspective_id,
            concept_id,
            was_included,
            previous_membership,
        });
        Ok(())
    }

    pub async fn toggle_relationship_in_perspective(
        &self,
        perspective_id: PerspectiveId,
        relationship_id: RelationshipId,
    ) -> Result<(), HistoryError> {
        let previous = self.store.perspective(perspective_id).await?.membership();
        self.toggle_relationship_with_snapshot(perspective_id, relationship_id, previous)
            .await
    }

    pub async fn toggle_relationship_with_snapshot(
        &self,
        perspective_id: PerspectiveId,
        relationship_id: RelationshipId,
        previous_membership: PerspectiveMembership,
    ) -> Result<(), HistoryError> {
        let was_included = previous_membership.contains_relationship(relationship_id);
        self.store
            .toggle_relationship(perspective_id, relationship_id)
            .await?;
        self.record(CommandKind::ToggleRelationshipInPerspective {
            perspective_id,
            relationship_id,
            was_included,
            previous_membership,
        });
        Ok(())
    }
}

//! In-memory implementation of the collaborator traits.
//!
//! [`InMemoryStore`] is a first-class backend for tests, demos, and any
//! session that does not need persistence. All data lives in HashMaps behind
//! a `parking_lot::Mutex`; no lock is ever held across an `.await`, so every
//! async method completes on its first poll.
//!
//! Besides the data, the store keeps a journal of every write it was asked
//! to perform ([`StoreCall`]), in arrival order, and supports fault
//! injection ([`InMemoryStore::fail_when`]) so callers can exercise their
//! partial-failure paths.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use parking_lot::Mutex;

use conceptmap_core::{
    Comment, CommentData, CommentId, CommentUpdate, Concept, ConceptData, ConceptId, ConceptUpdate,
    EntityKind, MapData, MapDocument, MapId, MapUpdate, PartialUpdate, Perspective,
    PerspectiveData, PerspectiveId, PerspectiveMembership, PerspectiveUpdate, Relationship,
    RelationshipData, RelationshipDirection, RelationshipId, RelationshipUpdate,
};

use crate::error::StorageError;
use crate::traits::{
    CommentActions, ConceptActions, MapActions, PerspectiveActions, RelationshipActions,
};

/// One write request received by the store.
///
/// Recorded before the write is attempted, so rejected writes appear too.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    CreateMap(MapId),
    UpdateMap(MapId, MapUpdate),
    DeleteMap(MapId),
    UndeleteMap(MapId),
    CreateConcept(ConceptId),
    UpdateConcept(ConceptId, ConceptUpdate),
    DeleteConcept(ConceptId),
    UndeleteConcept(ConceptId),
    CreateRelationship(RelationshipId),
    UpdateRelationship(RelationshipId, RelationshipUpdate),
    DeleteRelationship(RelationshipId),
    UndeleteRelationship(RelationshipId),
    ReverseRelationship(RelationshipId, RelationshipDirection),
    CreateComment(CommentId),
    UpdateComment(CommentId, CommentUpdate),
    DeleteComment(CommentId),
    UndeleteComment(CommentId),
    LinkComment(CommentId, ConceptId),
    UnlinkComment(CommentId, ConceptId),
    CreatePerspective(PerspectiveId),
    UpdatePerspective(PerspectiveId, PerspectiveUpdate),
    DeletePerspective(PerspectiveId),
    UndeletePerspective(PerspectiveId),
    ToggleConcept(PerspectiveId, ConceptId),
    ToggleRelationship(PerspectiveId, RelationshipId),
    SetMembership(PerspectiveId, PerspectiveMembership),
}

type FaultRule = Box<dyn Fn(&StoreCall) -> bool + Send + Sync>;

/// Records that support soft deletion.
trait SoftDeleted {
    const KIND: EntityKind;

    fn deleted_at(&self) -> Option<u64>;

    fn set_deleted_at(&mut self, at: Option<u64>);
}

macro_rules! soft_deleted {
    ($($ty:ty => $kind:expr),+ $(,)?) => {$(
        impl SoftDeleted for $ty {
            const KIND: EntityKind = $kind;

            fn deleted_at(&self) -> Option<u64> {
                self.deleted_at
            }

            fn set_deleted_at(&mut self, at: Option<u64>) {
                self.deleted_at = at;
            }
        }
    )+};
}

soft_deleted!(
    MapDocument => EntityKind::Map,
    Concept => EntityKind::Concept,
    Relationship => EntityKind::Relationship,
    Comment => EntityKind::Comment,
    Perspective => EntityKind::Perspective,
);

/// Data stored by the in-memory backend.
#[derive(Debug, Default)]
struct StoredMaps {
    maps: HashMap<MapId, MapDocument>,
    concepts: HashMap<ConceptId, Concept>,
    relationships: HashMap<RelationshipId, Relationship>,
    comments: HashMap<CommentId, Comment>,
    perspectives: HashMap<PerspectiveId, Perspective>,
}

/// Returns the live record, or an error if it is missing or soft-deleted.
fn live<'a, K, V>(records: &'a HashMap<K, V>, id: &K) -> Result<&'a V, StorageError>
where
    K: Hash + Eq + fmt::Display,
    V: SoftDeleted,
{
    match records.get(id) {
        None => Err(StorageError::not_found(V::KIND, id)),
        Some(record) if record.deleted_at().is_some() => Err(StorageError::Deleted {
            kind: V::KIND,
            id: id.to_string(),
        }),
        Some(record) => Ok(record),
    }
}

fn live_mut<'a, K, V>(records: &'a mut HashMap<K, V>, id: &K) -> Result<&'a mut V, StorageError>
where
    K: Hash + Eq + fmt::Display,
    V: SoftDeleted,
{
    match records.get_mut(id) {
        None => Err(StorageError::not_found(V::KIND, id)),
        Some(record) if record.deleted_at().is_some() => Err(StorageError::Deleted {
            kind: V::KIND,
            id: id.to_string(),
        }),
        Some(record) => Ok(record),
    }
}

/// Inserts a new record. A soft-deleted record with the same id is replaced,
/// so re-creating a previously deleted entity under its old id succeeds.
fn insert_new<K, V>(records: &mut HashMap<K, V>, id: K, record: V) -> Result<K, StorageError>
where
    K: Hash + Eq + Copy + fmt::Display,
    V: SoftDeleted,
{
    if records.get(&id).is_some_and(|existing| existing.deleted_at().is_none()) {
        return Err(StorageError::AlreadyExists {
            kind: V::KIND,
            id: id.to_string(),
        });
    }
    records.insert(id, record);
    Ok(id)
}

fn soft_delete<K, V>(records: &mut HashMap<K, V>, id: &K) -> Result<(), StorageError>
where
    K: Hash + Eq + fmt::Display,
    V: SoftDeleted,
{
    let record = live_mut(records, id)?;
    record.set_deleted_at(Some(now_millis()));
    Ok(())
}

fn undelete<K, V>(records: &mut HashMap<K, V>, id: &K) -> Result<(), StorageError>
where
    K: Hash + Eq + fmt::Display,
    V: SoftDeleted,
{
    let record = records
        .get_mut(id)
        .ok_or_else(|| StorageError::not_found(V::KIND, id))?;
    if record.deleted_at().is_none() {
        return Err(StorageError::NotDeleted {
            kind: V::KIND,
            id: id.to_string(),
        });
    }
    record.set_deleted_at(None);
    Ok(())
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// In-memory implementation of every collaborator trait.
pub struct InMemoryStore {
    state: Mutex<StoredMaps>,
    journal: Mutex<Vec<StoreCall>>,
    faults: Mutex<Vec<FaultRule>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        InMemoryStore {
            state: Mutex::new(StoredMaps::default()),
            journal: Mutex::new(Vec::new()),
            faults: Mutex::new(Vec::new()),
        }
    }

    /// Returns every write request received so far, oldest first.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.journal.lock().clone()
    }

    /// Forgets the journal (the data is untouched).
    pub fn clear_calls(&self) {
        self.journal.lock().clear();
    }

    /// Rejects every future write for which `rule` returns true.
    pub fn fail_when<F>(&self, rule: F)
    where
        F: Fn(&StoreCall) -> bool + Send + Sync + 'static,
    {
        self.faults.lock().push(Box::new(rule));
    }

    pub fn clear_faults(&self) {
        self.faults.lock().clear();
    }

    // Raw lookups that include soft-deleted records.

    pub fn map_record(&self, id: MapId) -> Option<MapDocument> {
        self.state.lock().maps.get(&id).cloned()
    }

    pub fn concept_record(&self, id: ConceptId) -> Option<Concept> {
        self.state.lock().concepts.get(&id).cloned()
    }

    pub fn relationship_record(&self, id: RelationshipId) -> Option<Relationship> {
        self.state.lock().relationships.get(&id).cloned()
    }

    pub fn comment_record(&self, id: CommentId) -> Option<Comment> {
        self.state.lock().comments.get(&id).cloned()
    }

    pub fn perspective_record(&self, id: PerspectiveId) -> Option<Perspective> {
        self.state.lock().perspectives.get(&id).cloned()
    }

    /// Journals the call and applies fault rules.
    fn begin(&self, call: StoreCall) -> Result<(), StorageError> {
        let rejected = self.faults.lock().iter().any(|rule| rule(&call));
        tracing::trace!(?call, rejected, "store write");
        let reason = if rejected {
            Some(format!("injected failure for {:?}", call))
        } else {
            None
        };
        self.journal.lock().push(call);
        match reason {
            Some(reason) => Err(StorageError::Rejected { reason }),
            None => Ok(()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryStore")
            .field("state", &*self.state.lock())
            .field("journal_len", &self.journal.lock().len())
            .field("fault_rules", &self.faults.lock().len())
            .finish()
    }
}

#[async_trait]
impl MapActions for InMemoryStore {
    async fn create_map(&self, id: MapId, data: &MapData) -> Result<MapId, StorageError> {
        self.begin(StoreCall::CreateMap(id))?;
        let map = MapDocument {
            id,
            name: data.name.clone(),
            description: data.description.clone(),
            deleted_at: None,
        };
        insert_new(&mut self.state.lock().maps, id, map)
    }

    async fn update_map(&self, id: MapId, updates: &MapUpdate) -> Result<(), StorageError> {
        self.begin(StoreCall::UpdateMap(id, updates.clone()))?;
        let mut state = self.state.lock();
        updates.apply_to(live_mut(&mut state.maps, &id)?);
        Ok(())
    }

    async fn delete_map(&self, id: MapId) -> Result<(), StorageError> {
        self.begin(StoreCall::DeleteMap(id))?;
        soft_delete(&mut self.state.lock().maps, &id)
    }

    async fn undelete_map(&self, id: MapId) -> Result<(), StorageError> {
        self.begin(StoreCall::UndeleteMap(id))?;
        undelete(&mut self.state.lock().maps, &id)
    }

    async fn map(&self, id: MapId) -> Result<MapDocument, StorageError> {
        live(&self.state.lock().maps, &id).cloned()
    }
}

#[async_trait]
impl ConceptActions for InMemoryStore {
    async fn create_concept(
        &self,
        id: ConceptId,
        data: &ConceptData,
    ) -> Result<ConceptId, StorageError> {
        self.begin(StoreCall::CreateConcept(id))?;
        insert_new(
            &mut self.state.lock().concepts,
            id,
            Concept::from_data(id, data),
        )
    }

    async fn update_concept(
        &self,
        id: ConceptId,
        updates: &ConceptUpdate,
    ) -> Result<(), StorageError> {
        self.begin(StoreCall::UpdateConcept(id, updates.clone()))?;
        let mut state = self.state.lock();
        updates.apply_to(live_mut(&mut state.concepts, &id)?);
        Ok(())
    }

    async fn delete_concept(&self, id: ConceptId) -> Result<(), StorageError> {
        self.begin(StoreCall::DeleteConcept(id))?;
        soft_delete(&mut self.state.lock().concepts, &id)
    }

    async fn undelete_concept(&self, id: ConceptId) -> Result<(), StorageError> {
        self.begin(StoreCall::UndeleteConcept(id))?;
        undelete(&mut self.state.lock().concepts, &id)
    }

    async fn concept(&self, id: ConceptId) -> Result<Concept, StorageError> {
        live(&self.state.lock().concepts, &id).cloned()
    }
}

#[async_trait]
impl RelationshipActions for InMemoryStore {
    async fn create_relationship(
        &self,
        id: RelationshipId,
        data: &RelationshipData,
    ) -> Result<RelationshipId, StorageError> {
        self.begin(StoreCall::CreateRelationship(id))?;
        let mut state = self.state.lock();
        live(&state.concepts, &data.from)?;
        live(&state.concepts, &data.to)?;
        insert_new(
            &mut state.relationships,
            id,
            Relationship::from_data(id, data),
        )
    }

    async fn update_relationship(
        &self,
        id: RelationshipId,
        updates: &RelationshipUpdate,
    ) -> Result<(), StorageError> {
        self.begin(StoreCall::UpdateRelationship(id, updates.clone()))?;
        let mut state = self.state.lock();
        updates.apply_to(live_mut(&mut state.relationships, &id)?);
        Ok(())
    }

    async fn delete_relationship(&self, id: RelationshipId) -> Result<(), StorageError> {
        self.begin(StoreCall::DeleteRelationship(id))?;
        soft_delete(&mut self.state.lock().relationships, &id)
    }

    async fn undelete_relationship(&self, id: RelationshipId) -> Result<(), StorageError> {
        self.begin(StoreCall::UndeleteRelationship(id))?;
        undelete(&mut self.state.lock().relationships, &id)
    }

    async fn reverse_relationship(
        &self,
        id: RelationshipId,
        direction: &RelationshipDirection,
    ) -> Result<(), StorageError> {
        self.begin(StoreCall::ReverseRelationship(id, direction.clone()))?;
        let mut state = self.state.lock();
        live_mut(&mut state.relationships, &id)?.set_direction(direction);
        Ok(())
    }

    async fn relationship(&self, id: RelationshipId) -> Result<Relationship, StorageError> {
        live(&self.state.lock().relationships, &id).cloned()
    }
}

#[async_trait]
impl CommentActions for InMemoryStore {
    async fn create_comment(
        &self,
        id: CommentId,
        data: &CommentData,
    ) -> Result<CommentId, StorageError> {
        self.begin(StoreCall::CreateComment(id))?;
        insert_new(
            &mut self.state.lock().comments,
            id,
            Comment::from_data(id, data),
        )
    }

    async fn update_comment(
        &self,
        id: CommentId,
        updates: &CommentUpdate,
    ) -> Result<(), StorageError> {
        self.begin(StoreCall::UpdateComment(id, updates.clone()))?;
        let mut state = self.state.lock();
        updates.apply_to(live_mut(&mut state.comments, &id)?);
        Ok(())
    }

    async fn delete_comment(&self, id: CommentId) -> Result<(), StorageError> {
        self.begin(StoreCall::DeleteComment(id))?;
        soft_delete(&mut self.state.lock().comments, &id)
    }

    async fn undelete_comment(&self, id: CommentId) -> Result<(), StorageError> {
        self.begin(StoreCall::UndeleteComment(id))?;
        undelete(&mut self.state.lock().comments, &id)
    }

    async fn link_comment(
        &self,
        comment: CommentId,
        concept: ConceptId,
    ) -> Result<(), StorageError> {
        self.begin(StoreCall::LinkComment(comment, concept))?;
        let mut state = self.state.lock();
        live(&state.concepts, &concept)?;
        live_mut(&mut state.comments, &comment)?
            .linked_concepts
            .insert(concept);
        Ok(())
    }

    async fn unlink_comment(
        &self,
        comment: CommentId,
        concept: ConceptId,
    ) -> Result<(), StorageError> {
        self.begin(StoreCall::UnlinkComment(comment, concept))?;
        let mut state = self.state.lock();
        live_mut(&mut state.comments, &comment)?
            .linked_concepts
            .shift_remove(&concept);
        Ok(())
    }

    async fn comment(&self, id: CommentId) -> Result<Comment, StorageError> {
        live(&self.state.lock().comments, &id).cloned()
    }
}

#[async_trait]
impl PerspectiveActions for InMemoryStore {
    async fn create_perspective(
        &self,
        id: PerspectiveId,
        data: &PerspectiveData,
    ) -> Result<PerspectiveId, StorageError> {
        self.begin(StoreCall::CreatePerspective(id))?;
        insert_new(
            &mut self.state.lock().perspectives,
            id,
            Perspective::from_data(id, data),
        )
    }

    async fn update_perspective(
        &self,
        id: PerspectiveId,
        updates: &PerspectiveUpdate,
    ) -> Result<(), StorageError> {
        self.begin(StoreCall::UpdatePerspective(id, updates.clone()))?;
        let mut state = self.state.lock();
        updates.apply_to(live_mut(&mut state.perspectives, &id)?);
        Ok(())
    }

    async fn delete_perspective(&self, id: PerspectiveId) -> Result<(), StorageError> {
        self.begin(StoreCall::DeletePerspective(id))?;
        soft_delete(&mut self.state.lock().perspectives, &id)
    }

    async fn undelete_perspective(&self, id: PerspectiveId) -> Result<(), StorageError> {
        self.begin(StoreCall::UndeletePerspective(id))?;
        undelete(&mut self.state.lock().perspectives, &id)
    }

    async fn toggle_concept(
        &self,
        perspective: PerspectiveId,
        concept: ConceptId,
    ) -> Result<(), StorageError> {
        self.begin(StoreCall::ToggleConcept(perspective, concept))?;
        let mut guard = self.state.lock();
        let state = &mut *guard;
        live(&state.concepts, &concept)?;
        let view = live_mut(&mut state.perspectives, &perspective)?;

        if view.concept_ids.shift_remove(&concept) {
            // Hiding a concept hides every edge attached to it.
            let relationships = &state.relationships;
            view.relationship_ids.retain(|rel| {
                relationships
                    .get(rel)
                    .map_or(true, |relationship| !relationship.touches(concept))
            });
        } else {
            view.concept_ids.insert(concept);
            let mut revealed: Vec<&Relationship> = state
                .relationships
                .values()
                .filter(|rel| rel.deleted_at.is_none() && rel.map_id == view.map_id)
                .filter(|rel| rel.touches(concept))
                .filter(|rel| {
                    view.concept_ids.contains(&rel.from) && view.concept_ids.contains(&rel.to)
                })
                .collect();
            revealed.sort_by_key(|rel| rel.id);
            for rel in revealed {
                view.relationship_ids.insert(rel.id);
            }
        }
        Ok(())
    }

    async fn toggle_relationship(
        &self,
        perspective: PerspectiveId,
        relationship: RelationshipId,
    ) -> Result<(), StorageError> {
        self.begin(StoreCall::ToggleRelationship(perspective, relationship))?;
        let mut state = self.state.lock();
        let view = live_mut(&mut state.perspectives, &perspective)?;
        if !view.relationship_ids.shift_remove(&relationship) {
            view.relationship_ids.insert(relationship);
        }
        Ok(())
    }

    async fn set_membership(
        &self,
        perspective: PerspectiveId,
        membership: &PerspectiveMembership,
    ) -> Result<(), StorageError> {
        self.begin(StoreCall::SetMembership(perspective, membership.clone()))?;
        let mut state = self.state.lock();
        live_mut(&mut state.perspectives, &perspective)?.set_membership(membership);
        Ok(())
    }

    async fn perspective(&self, id: PerspectiveId) -> Result<Perspective, StorageError> {
        live(&self.state.lock().perspectives, &id).cloned()
    }
}

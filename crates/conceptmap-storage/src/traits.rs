//! Collaborator traits defining the storage contract for concept maps.
//!
//! One trait per entity family. Each family offers the same CRUD shape
//! (`create`, `update`, `delete`, `undelete`, read) plus its family-specific
//! relationship operations. Deletion is soft: a deleted entity can always be
//! brought back with `undelete`, which is what reversing a delete relies on.
//!
//! Creation takes the identifier from the caller. Identifiers are allocated
//! before the write so a create can later be reversed by deleting that id.
//! The returned id is the one the backend actually stored.
//!
//! All backends implement every trait, which makes them usable as a
//! [`MapStore`] trait object.

use async_trait::async_trait;

use conceptmap_core::{
    Comment, CommentData, CommentId, CommentUpdate, Concept, ConceptData, ConceptId, ConceptUpdate,
    MapData, MapDocument, MapId, MapUpdate, Perspective, PerspectiveData, PerspectiveId,
    PerspectiveMembership, PerspectiveUpdate, Relationship, RelationshipData,
    RelationshipDirection, RelationshipId, RelationshipUpdate,
};

use crate::error::StorageError;

#[async_trait]
pub trait MapActions: Send + Sync {
    async fn create_map(&self, id: MapId, data: &MapData) -> Result<MapId, StorageError>;

    async fn update_map(&self, id: MapId, updates: &MapUpdate) -> Result<(), StorageError>;

    async fn delete_map(&self, id: MapId) -> Result<(), StorageError>;

    async fn undelete_map(&self, id: MapId) -> Result<(), StorageError>;

    /// Returns the live map. Deleted maps are reported as [`StorageError::Deleted`].
    async fn map(&self, id: MapId) -> Result<MapDocument, StorageError>;
}

#[async_trait]
pub trait ConceptActions: Send + Sync {
    async fn create_concept(
        &self,
        id: ConceptId,
        data: &ConceptData,
    ) -> Result<ConceptId, StorageError>;

    async fn update_concept(
        &self,
        id: ConceptId,
        updates: &ConceptUpdate,
    ) -> Result<(), StorageError>;

    async fn delete_concept(&self, id: ConceptId) -> Result<(), StorageError>;

    async fn undelete_concept(&self, id: ConceptId) -> Result<(), StorageError>;

    async fn concept(&self, id: ConceptId) -> Result<Concept, StorageError>;
}

#[async_trait]
pub trait RelationshipActions: Send + Sync {
    async fn create_relationship(
        &self,
        id: RelationshipId,
        data: &RelationshipData,
    ) -> Result<RelationshipId, StorageError>;

    async fn update_relationship(
        &self,
        id: RelationshipId,
        updates: &RelationshipUpdate,
    ) -> Result<(), StorageError>;

    async fn delete_relationship(&self, id: RelationshipId) -> Result<(), StorageError>;

    async fn undelete_relationship(&self, id: RelationshipId) -> Result<(), StorageError>;

    /// Sets the relationship's full direction (endpoints and both labels).
    async fn reverse_relationship(
        &self,
        id: RelationshipId,
        direction: &RelationshipDirection,
    ) -> Result<(), StorageError>;

    async fn relationship(&self, id: RelationshipId) -> Result<Relationship, StorageError>;
}

#[async_trait]
pub trait CommentActions: Send + Sync {
    async fn create_comment(
        &self,
        id: CommentId,
        data: &CommentData,
    ) -> Result<CommentId, StorageError>;

    async fn update_comment(
        &self,
        id: CommentId,
        updates: &CommentUpdate,
    ) -> Result<(), StorageError>;

    async fn delete_comment(&self, id: CommentId) -> Result<(), StorageError>;

    async fn undelete_comment(&self, id: CommentId) -> Result<(), StorageError>;

    /// Attaches a comment to a concept.
    async fn link_comment(&self, comment: CommentId, concept: ConceptId)
        -> Result<(), StorageError>;

    /// Detaches a comment from a concept.
    async fn unlink_comment(
        &self,
        comment: CommentId,
        concept: ConceptId,
    ) -> Result<(), StorageError>;

    async fn comment(&self, id: CommentId) -> Result<Comment, StorageError>;
}

#[async_trait]
pub trait PerspectiveActions: Send + Sync {
    async fn create_perspective(
        &self,
        id: PerspectiveId,
        data: &PerspectiveData,
    ) -> Result<PerspectiveId, StorageError>;

    async fn update_perspective(
        &self,
        id: PerspectiveId,
        updates: &PerspectiveUpdate,
    ) -> Result<(), StorageError>;

    async fn delete_perspective(&self, id: PerspectiveId) -> Result<(), StorageError>;

    async fn undelete_perspective(&self, id: PerspectiveId) -> Result<(), StorageError>;

    /// Adds or removes a concept, cascading to the relationships touching it.
    async fn toggle_concept(
        &self,
        perspective: PerspectiveId,
        concept: ConceptId,
    ) -> Result<(), StorageError>;

    /// Adds or removes a single relationship.
    async fn toggle_relationship(
        &self,
        perspective: PerspectiveId,
        relationship: RelationshipId,
    ) -> Result<(), StorageError>;

    /// Replaces the membership verbatim, with no cascading.
    async fn set_membership(
        &self,
        perspective: PerspectiveId,
        membership: &PerspectiveMembership,
    ) -> Result<(), StorageError>;

    async fn perspective(&self, id: PerspectiveId) -> Result<Perspective, StorageError>;
}

/// Every collaborator family behind one object.
///
/// Implemented automatically for any type providing all five families.
pub trait MapStore:
    MapActions + ConceptActions + RelationshipActions + CommentActions + PerspectiveActions
{
}

impl<T> MapStore for T where
    T: MapActions + ConceptActions + RelationshipActions + CommentActions + PerspectiveActions
{
}

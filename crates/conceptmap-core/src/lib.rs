pub mod entity;
pub mod id;
pub mod update;

// Re-export commonly used types
pub use entity::{
    Comment, CommentData, Concept, ConceptData, EntityKind, MapData, MapDocument, Perspective,
    PerspectiveData, PerspectiveMembership, Position, Relationship, RelationshipData,
    RelationshipDirection,
};
pub use id::{CommentId, ConceptId, MapId, PerspectiveId, RelationshipId};
pub use update::{
    CommentUpdate, ConceptUpdate, MapUpdate, PartialUpdate, PerspectiveUpdate, RelationshipUpdate,
};

//! Stable ID newtypes for concept map entities.
//!
//! All IDs are distinct newtype wrappers over a UUID, providing type safety
//! so that a `ConceptId` cannot be accidentally used where a `CommentId` is
//! expected. IDs are generated client-side (`new()`), which lets a caller
//! know the identifier of an entity before the store has created it.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Map (document) identifier. A map contains every other entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MapId(pub Uuid);

/// Concept (structural node) identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConceptId(pub Uuid);

/// Relationship (directed edge between two concepts) identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelationshipId(pub Uuid);

/// Comment (annotation) identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CommentId(pub Uuid);

/// Perspective (named view over a subset of a map) identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PerspectiveId(pub Uuid);

macro_rules! uuid_id {
    ($($name:ident),+ $(,)?) => {$(
        impl $name {
            /// Allocates a fresh random identifier.
            pub fn new() -> Self {
                $name(Uuid::new_v4())
            }

            /// Returns the underlying UUID.
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                $name(uuid)
            }
        }

        // Display just prints the inner UUID.
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    )+};
}

uuid_id!(MapId, ConceptId, RelationshipId, CommentId, PerspectiveId);

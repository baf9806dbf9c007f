//! Storage error types for conceptmap-storage.
//!
//! [`StorageError`] covers the failure modes a collaborator can report back to
//! the history engine: entity-not-found, soft-delete state violations, and
//! rejected writes.

use conceptmap_core::EntityKind;
use thiserror::Error;

/// Errors produced by storage operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// No entity of this kind exists with the given ID.
    #[error("{} not found: {id}", .kind.as_str())]
    NotFound { kind: EntityKind, id: String },

    /// An entity with this ID already exists (create with a reused ID).
    #[error("{} already exists: {id}", .kind.as_str())]
    AlreadyExists { kind: EntityKind, id: String },

    /// The entity exists but is soft-deleted.
    #[error("{} is deleted: {id}", .kind.as_str())]
    Deleted { kind: EntityKind, id: String },

    /// Undelete was requested for an entity that is live.
    #[error("{} is not deleted: {id}", .kind.as_str())]
    NotDeleted { kind: EntityKind, id: String },

    /// The backend refused the write.
    #[error("write rejected: {reason}")]
    Rejected { reason: String },
}

impl StorageError {
    pub fn not_found(kind: EntityKind, id: impl ToString) -> Self {
        StorageError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

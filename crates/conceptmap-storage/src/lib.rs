//! Storage boundary for concept map entities.
//!
//! The history engine never knows how an entity is persisted. It talks to the
//! store exclusively through the async collaborator traits in [`traits`], one
//! per entity family, bundled together as [`MapStore`].
//!
//! # Modules
//!
//! - [`error`]: StorageError enum with all failure modes
//! - [`traits`]: per-family collaborator traits and the `MapStore` bundle
//! - [`memory`]: InMemoryStore implementation with a call journal

pub mod error;
pub mod memory;
pub mod traits;

// Re-export key types for ergonomic use.
pub use error::StorageError;
pub use memory::{InMemoryStore, StoreCall};
pub use traits::{
    CommentActions, ConceptActions, MapActions, MapStore, PerspectiveActions, RelationshipActions,
};

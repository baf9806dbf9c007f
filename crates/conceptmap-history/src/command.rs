//! Reversible edit commands.
//!
//! [`CommandKind`] is the closed set of structural edits the history can
//! reverse and replay. Each variant carries enough data for both directions:
//! creation payloads keep the submitted data and the assigned id, updates
//! keep the applied fields and a snapshot of the fields they overwrote,
//! membership toggles keep the full membership before the toggle.
//!
//! [`Command`] wraps a kind with its identity, creation time, and the
//! operation it belongs to. Commands serialize to internally tagged JSON.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use conceptmap_core::{
    CommentData, CommentId, CommentUpdate, ConceptData, ConceptId, ConceptUpdate, MapData, MapId,
    MapUpdate, PerspectiveData, PerspectiveId, PerspectiveMembership, PerspectiveUpdate,
    RelationshipData, RelationshipDirection, RelationshipId, RelationshipUpdate,
};

use crate::clock::Timestamp;

/// Unique identity of one recorded command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandId(pub Uuid);

/// Groups commands into one undoable unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationId(pub Uuid);

impl CommandId {
    pub fn new() -> Self {
        CommandId(Uuid::new_v4())
    }
}

impl Default for CommandId {
    fn default() -> Self {
        Self::new()
    }
}

impl OperationId {
    pub fn new() -> Self {
        OperationId(Uuid::new_v4())
    }
}

impl Default for OperationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A reversible concept map mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandKind {
    /// A map was created. `map_id` is `None` if no id could be allocated.
    CreateMap {
        data: MapData,
        map_id: Option<MapId>,
    },
    UpdateMap {
        map_id: MapId,
        updates: MapUpdate,
        previous_state: Option<MapUpdate>,
    },
    DeleteMap {
        map_id: MapId,
    },
    CreateConcept {
        data: ConceptData,
        concept_id: Option<ConceptId>,
    },
    /// A concept's fields changed. Without `previous_state` the update can be
    /// replayed but not reversed.
    UpdateConcept {
        concept_id: ConceptId,
        updates: ConceptUpdate,
        previous_state: Option<ConceptUpdate>,
    },
    DeleteConcept {
        concept_id: ConceptId,
    },
    CreateRelationship {
        data: RelationshipData,
        relationship_id: Option<RelationshipId>,
    },
    UpdateRelationship {
        relationship_id: RelationshipId,
        updates: RelationshipUpdate,
        previous_state: Option<RelationshipUpdate>,
    },
    DeleteRelationship {
        relationship_id: RelationshipId,
    },
    /// A relationship's direction was flipped. `previous_state` is the
    /// direction before the flip.
    ReverseRelationship {
        relationship_id: RelationshipId,
        previous_state: RelationshipDirection,
    },
    CreateComment {
        data: CommentData,
        comment_id: Option<CommentId>,
    },
    UpdateComment {
        comment_id: CommentId,
        updates: CommentUpdate,
        previous_state: Option<CommentUpdate>,
    },
    DeleteComment {
        comment_id: CommentId,
    },
    LinkComment {
        comment_id: CommentId,
        concept_id: ConceptId,
    },
    UnlinkComment {
        comment_id: CommentId,
        concept_id: ConceptId,
    },
    CreatePerspective {
        data: PerspectiveData,
        perspective_id: Option<PerspectiveId>,
    },
    UpdatePerspective {
        perspective_id: PerspectiveId,
        updates: PerspectiveUpdate,
        previous_state: Option<PerspectiveUpdate>,
    },
    DeletePerspective {
        perspective_id: PerspectiveId,
    },
    /// A concept was shown or hidden in a perspective, together with the
    /// relationships that followed it.
    ToggleConceptInPerspective {
        perspective_id: PerspectiveId,
        concept_id: ConceptId,
        was_included: bool,
        previous_membership: PerspectiveMembership,
    },
    ToggleRelationshipInPerspective {
        perspective_id: PerspectiveId,
        relationship_id: RelationshipId,
        was_included: bool,
        previous_membership: PerspectiveMembership,
    },
}

/// Discriminant of [`CommandKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandType {
    CreateMap,
    UpdateMap,
    DeleteMap,
    CreateConcept,
    UpdateConcept,
    DeleteConcept,
    CreateRelationship,
    UpdateRelationship,
    DeleteRelationship,
    ReverseRelationship,
    CreateComment,
    UpdateComment,
    DeleteComment,
    LinkComment,
    UnlinkComment,
    CreatePerspective,
    UpdatePerspective,
    DeletePerspective,
    ToggleConceptInPerspective,
    ToggleRelationshipInPerspective,
}

impl CommandType {
    pub const ALL: [CommandType; 20] = [
        CommandType::CreateMap,
        CommandType::UpdateMap,
        CommandType::DeleteMap,
        CommandType::CreateConcept,
        CommandType::UpdateConcept,
        CommandType::DeleteConcept,
        CommandType::CreateRelationship,
        CommandType::UpdateRelationship,
        CommandType::DeleteRelationship,
        CommandType::ReverseRelationship,
        CommandType::CreateComment,
        CommandType::UpdateComment,
        CommandType::DeleteComment,
        CommandType::LinkComment,
        CommandType::UnlinkComment,
        CommandType::CreatePerspective,
        CommandType::UpdatePerspective,
        CommandType::DeletePerspective,
        CommandType::ToggleConceptInPerspective,
        CommandType::ToggleRelationshipInPerspective,
    ];

    /// Human-readable label, suitable for "Undo <label>" menu entries.
    pub fn description(&self) -> &'static str {
        match self {
            CommandType::CreateMap => "create map",
            CommandType::UpdateMap => "edit map",
            CommandType::DeleteMap => "delete map",
            CommandType::CreateConcept => "create concept",
            CommandType::UpdateConcept => "edit concept",
            CommandType::DeleteConcept => "delete concept",
            CommandType::CreateRelationship => "create relationship",
            CommandType::UpdateRelationship => "edit relationship",
            CommandType::DeleteRelationship => "delete relationship",
            CommandType::ReverseRelationship => "reverse relationship",
            CommandType::CreateComment => "create comment",
            CommandType::UpdateComment => "edit comment",
            CommandType::DeleteComment => "delete comment",
            CommandType::LinkComment => "link comment",
            CommandType::UnlinkComment => "unlink comment",
            CommandType::CreatePerspective => "create perspective",
            CommandType::UpdatePerspective => "edit perspective",
            CommandType::DeletePerspective => "delete perspective",
            CommandType::ToggleConceptInPerspective => "toggle concept in perspective",
            CommandType::ToggleRelationshipInPerspective => "toggle relationship in perspective",
        }
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

impl CommandKind {
    pub fn command_type(&self) -> CommandType {
        match self {
            CommandKind::CreateMap { .. } => CommandType::CreateMap,
            CommandKind::UpdateMap { .. } => CommandType::UpdateMap,
            CommandKind::DeleteMap { .. } => CommandType::DeleteMap,
            CommandKind::CreateConcept { .. } => CommandType::CreateConcept,
            CommandKind::UpdateConcept { .. } => CommandType::UpdateConcept,
            CommandKind::DeleteConcept { .. } => CommandType::DeleteConcept,
            CommandKind::CreateRelationship { .. } => CommandType::CreateRelationship,
            CommandKind::UpdateRelationship { .. } => CommandType::UpdateRelationship,
            CommandKind::DeleteRelationship { .. } => CommandType::DeleteRelationship,
            CommandKind::ReverseRelationship { .. } => CommandType::ReverseRelationship,
            CommandKind::CreateComment { .. } => CommandType::CreateComment,
            CommandKind::UpdateComment { .. } => CommandType::UpdateComment,
            CommandKind::DeleteComment { .. } => CommandType::DeleteComment,
            CommandKind::LinkComment { .. } => CommandType::LinkComment,
            CommandKind::UnlinkComment { .. } => CommandType::UnlinkComment,
            CommandKind::CreatePerspective { .. } => CommandType::CreatePerspective,
            CommandKind::UpdatePerspective { .. } => CommandType::UpdatePerspective,
            CommandKind::DeletePerspective { .. } => CommandType::DeletePerspective,
            CommandKind::ToggleConceptInPerspective { .. } => {
                CommandType::ToggleConceptInPerspective
            }
            CommandKind::ToggleRelationshipInPerspective { .. } => {
                CommandType::ToggleRelationshipInPerspective
            }
        }
    }
}

/// One recorded mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub id: CommandId,
    pub timestamp: Timestamp,
    pub operation_id: OperationId,
    #[serde(flatten)]
    pub kind: CommandKind,
}

impl Command {
    /// Creates a command with a fresh id.
    pub fn new(kind: CommandKind, operation_id: OperationId, timestamp: Timestamp) -> Self {
        Command {
            id: CommandId::new(),
            timestamp,
            operation_id,
            kind,
        }
    }

    pub fn command_type(&self) -> CommandType {
        self.kind.command_type()
    }
}

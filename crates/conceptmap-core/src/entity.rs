//! Entity records and creation payloads for concept maps.
//!
//! A map is the container document. Concepts are the structural nodes,
//! relationships are directed, labelled edges between two concepts, comments
//! annotate the canvas and can be linked to concepts, and perspectives are
//! named views over a subset of concepts and relationships.
//!
//! Every `*Data` struct is the payload submitted at creation time. The full
//! records (`Concept`, `Relationship`, ...) carry the same fields plus the
//! bookkeeping a store needs (identifier, soft-delete marker).

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::id::{CommentId, ConceptId, MapId, PerspectiveId, RelationshipId};

/// Canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Position { x, y }
    }
}

/// Entity family discriminant, used in errors and in the legacy deletion log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Map,
    Concept,
    Relationship,
    Comment,
    Perspective,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Map => "map",
            EntityKind::Concept => "concept",
            EntityKind::Relationship => "relationship",
            EntityKind::Comment => "comment",
            EntityKind::Perspective => "perspective",
        }
    }
}

// ---------------------------------------------------------------------------
// Map
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapData {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapDocument {
    pub id: MapId,
    pub name: String,
    pub description: Option<String>,
    /// Epoch milliseconds of the soft delete, `None` while live.
    pub deleted_at: Option<u64>,
}

// ---------------------------------------------------------------------------
// Concept
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptData {
    pub map_id: MapId,
    pub label: String,
    pub position: Position,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concept {
    pub id: ConceptId,
    pub map_id: MapId,
    pub label: String,
    pub position: Position,
    pub color: Option<String>,
    pub notes: Option<String>,
    pub deleted_at: Option<u64>,
}

impl Concept {
    /// Builds a live concept from its creation payload.
    pub fn from_data(id: ConceptId, data: &ConceptData) -> Self {
        Concept {
            id,
            map_id: data.map_id,
            label: data.label.clone(),
            position: data.position,
            color: data.color.clone(),
            notes: None,
            deleted_at: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Relationship
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipData {
    pub map_id: MapId,
    pub from: ConceptId,
    pub to: ConceptId,
    pub primary_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverse_label: Option<String>,
}

/// The full directed description of a relationship: endpoints plus the label
/// read in each direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipDirection {
    pub from: ConceptId,
    pub to: ConceptId,
    pub primary_label: String,
    pub reverse_label: Option<String>,
}

impl RelationshipDirection {
    /// Swaps the endpoints and the label pair.
    ///
    /// When there is no reverse label the primary label is kept, so reversing
    /// an edge never loses its only label.
    pub fn reversed(&self) -> RelationshipDirection {
        match &self.reverse_label {
            Some(reverse) => RelationshipDirection {
                from: self.to,
                to: self.from,
                primary_label: reverse.clone(),
                reverse_label: Some(self.primary_label.clone()),
            },
            None => RelationshipDirection {
                from: self.to,
                to: self.from,
                primary_label: self.primary_label.clone(),
                reverse_label: None,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: RelationshipId,
    pub map_id: MapId,
    pub from: ConceptId,
    pub to: ConceptId,
    pub primary_label: String,
    pub reverse_label: Option<String>,
    pub deleted_at: Option<u64>,
}

impl Relationship {
    pub fn from_data(id: RelationshipId, data: &RelationshipData) -> Self {
        Relationship {
            id,
            map_id: data.map_id,
            from: data.from,
            to: data.to,
            primary_label: data.primary_label.clone(),
            reverse_label: data.reverse_label.clone(),
            deleted_at: None,
        }
    }

    pub fn direction(&self) -> RelationshipDirection {
        RelationshipDirection {
            from: self.from,
            to: self.to,
            primary_label: self.primary_label.clone(),
            reverse_label: self.reverse_label.clone(),
        }
    }

    pub fn set_direction(&mut self, direction: &RelationshipDirection) {
        self.from = direction.from;
        self.to = direction.to;
        self.primary_label = direction.primary_label.clone();
        self.reverse_label = direction.reverse_label.clone();
    }

    /// Returns true if either endpoint is `concept`.
    pub fn touches(&self, concept: ConceptId) -> bool {
        self.from == concept || self.to == concept
    }
}

// ---------------------------------------------------------------------------
// Comment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentData {
    pub map_id: MapId,
    pub text: String,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub map_id: MapId,
    pub text: String,
    pub position: Position,
    /// Concepts this comment is attached to, in link order.
    pub linked_concepts: IndexSet<ConceptId>,
    pub deleted_at: Option<u64>,
}

impl Comment {
    pub fn from_data(id: CommentId, data: &CommentData) -> Self {
        Comment {
            id,
            map_id: data.map_id,
            text: data.text.clone(),
            position: data.position,
            linked_concepts: IndexSet::new(),
            deleted_at: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Perspective
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerspectiveData {
    pub map_id: MapId,
    pub name: String,
    #[serde(default)]
    pub concept_ids: Vec<ConceptId>,
    #[serde(default)]
    pub relationship_ids: Vec<RelationshipId>,
}

/// Exact membership of a perspective at one point in time.
///
/// Toggling a concept also changes which relationships are visible, so a
/// membership change is only reversible by restoring both lists.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PerspectiveMembership {
    pub concept_ids: Vec<ConceptId>,
    pub relationship_ids: Vec<RelationshipId>,
}

impl PerspectiveMembership {
    pub fn contains_concept(&self, concept: ConceptId) -> bool {
        self.concept_ids.contains(&concept)
    }

    pub fn contains_relationship(&self, relationship: RelationshipId) -> bool {
        self.relationship_ids.contains(&relationship)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Perspective {
    pub id: PerspectiveId,
    pub map_id: MapId,
    pub name: String,
    pub concept_ids: IndexSet<ConceptId>,
    pub relationship_ids: IndexSet<RelationshipId>,
    pub deleted_at: Option<u64>,
}

impl Perspective {
    pub fn from_data(id: PerspectiveId, data: &PerspectiveData) -> Self {
        Perspective {
            id,
            map_id: data.map_id,
            name: data.name.clone(),
            concept_ids: data.concept_ids.iter().copied().collect(),
            relationship_ids: data.relationship_ids.iter().copied().collect(),
            deleted_at: None,
        }
    }

    pub fn membership(&self) -> PerspectiveMembership {
        PerspectiveMembership {
            concept_ids: self.concept_ids.iter().copied().collect(),
            relationship_ids: self.relationship_ids.iter().copied().collect(),
        }
    }

    pub fn set_membership(&mut self, membership: &PerspectiveMembership) {
        self.concept_ids = membership.concept_ids.iter().copied().collect();
        self.relationship_ids = membership.relationship_ids.iter().copied().collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn direction(reverse_label: Option<&str>) -> RelationshipDirection {
        RelationshipDirection {
            from: ConceptId::new(),
            to: ConceptId::new(),
            primary_label: "causes".into(),
            reverse_label: reverse_label.map(str::to_string),
        }
    }

    #[test]
    fn reversed_swaps_endpoints_and_labels() {
        let original = direction(Some("is caused by"));
        let reversed = original.reversed();
        assert_eq!(reversed.from, original.to);
        assert_eq!(reversed.to, original.from);
        assert_eq!(reversed.primary_label, "is caused by");
        assert_eq!(reversed.reverse_label.as_deref(), Some("causes"));
    }

    #[test]
    fn reversed_twice_is_identity() {
        let original = direction(Some("is caused by"));
        assert_eq!(original.reversed().reversed(), original);

        let unlabelled = direction(None);
        assert_eq!(unlabelled.reversed().reversed(), unlabelled);
    }

    #[test]
    fn reversed_without_reverse_label_keeps_primary() {
        let original = direction(None);
        let reversed = original.reversed();
        assert_eq!(reversed.primary_label, "causes");
        assert_eq!(reversed.reverse_label, None);
    }

    #[test]
    fn perspective_membership_roundtrip() {
        let map_id = MapId::new();
        let (a, b) = (ConceptId::new(), ConceptId::new());
        let rel = RelationshipId::new();
        let mut perspective = Perspective::from_data(
            PerspectiveId::new(),
            &PerspectiveData {
                map_id,
                name: "overview".into(),
                concept_ids: vec![a, b, a],
                relationship_ids: vec![rel],
            },
        );
        let snapshot = perspective.membership();
        assert_eq!(snapshot.concept_ids, vec![a, b]);

        perspective.concept_ids.clear();
        perspective.relationship_ids.clear();
        perspective.set_membership(&snapshot);
        assert_eq!(perspective.membership(), snapshot);
    }
}

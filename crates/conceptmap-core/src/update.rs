//! Partial update payloads.
//!
//! An update names only the fields it changes (`Some`), leaving the rest
//! untouched (`None`). The same types double as previous-state snapshots:
//! [`PartialUpdate::snapshot_of`] captures, from the current entity, exactly
//! the fields a pending update is about to overwrite, so re-applying the
//! snapshot later undoes the update.

use serde::{Deserialize, Serialize};

use crate::entity::{Comment, Concept, MapDocument, Perspective, Position, Relationship};

/// A sparse set of field assignments for an entity of type `E`.
pub trait PartialUpdate<E> {
    /// Writes every `Some` field into `entity`.
    fn apply_to(&self, entity: &mut E);

    /// Returns the current values in `entity` of every field this update sets.
    fn snapshot_of(&self, entity: &E) -> Self;

    /// True if no field is set.
    fn is_empty(&self) -> bool;
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConceptUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    /// `Some(None)` clears the color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
}

impl ConceptUpdate {
    pub fn label(label: impl Into<String>) -> Self {
        ConceptUpdate {
            label: Some(label.into()),
            ..Default::default()
        }
    }

    pub fn position(position: Position) -> Self {
        ConceptUpdate {
            position: Some(position),
            ..Default::default()
        }
    }
}

impl PartialUpdate<Concept> for ConceptUpdate {
    fn apply_to(&self, concept: &mut Concept) {
        if let Some(label) = &self.label {
            concept.label = label.clone();
        }
        if let Some(position) = self.position {
            concept.position = position;
        }
        if let Some(color) = &self.color {
            concept.color = color.clone();
        }
        if let Some(notes) = &self.notes {
            concept.notes = notes.clone();
        }
    }

    fn snapshot_of(&self, concept: &Concept) -> Self {
        ConceptUpdate {
            label: self.label.as_ref().map(|_| concept.label.clone()),
            position: self.position.map(|_| concept.position),
            color: self.color.as_ref().map(|_| concept.color.clone()),
            notes: self.notes.as_ref().map(|_| concept.notes.clone()),
        }
    }

    fn is_empty(&self) -> bool {
        self.label.is_none()
            && self.position.is_none()
            && self.color.is_none()
            && self.notes.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RelationshipUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverse_label: Option<Option<String>>,
}

impl PartialUpdate<Relationship> for RelationshipUpdate {
    fn apply_to(&self, relationship: &mut Relationship) {
        if let Some(label) = &self.primary_label {
            relationship.primary_label = label.clone();
        }
        if let Some(label) = &self.reverse_label {
            relationship.reverse_label = label.clone();
        }
    }

    fn snapshot_of(&self, relationship: &Relationship) -> Self {
        RelationshipUpdate {
            primary_label: self
                .primary_label
                .as_ref()
                .map(|_| relationship.primary_label.clone()),
            reverse_label: self
                .reverse_label
                .as_ref()
                .map(|_| relationship.reverse_label.clone()),
        }
    }

    fn is_empty(&self) -> bool {
        self.primary_label.is_none() && self.reverse_label.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CommentUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

impl PartialUpdate<Comment> for CommentUpdate {
    fn apply_to(&self, comment: &mut Comment) {
        if let Some(text) = &self.text {
            comment.text = text.clone();
        }
        if let Some(position) = self.position {
            comment.position = position;
        }
    }

    fn snapshot_of(&self, comment: &Comment) -> Self {
        CommentUpdate {
            text: self.text.as_ref().map(|_| comment.text.clone()),
            position: self.position.map(|_| comment.position),
        }
    }

    fn is_empty(&self) -> bool {
        self.text.is_none() && self.position.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PerspectiveUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl PartialUpdate<Perspective> for PerspectiveUpdate {
    fn apply_to(&self, perspective: &mut Perspective) {
        if let Some(name) = &self.name {
            perspective.name = name.clone();
        }
    }

    fn snapshot_of(&self, perspective: &Perspective) -> Self {
        PerspectiveUpdate {
            name: self.name.as_ref().map(|_| perspective.name.clone()),
        }
    }

    fn is_empty(&self) -> bool {
        self.name.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MapUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
}

impl PartialUpdate<MapDocument> for MapUpdate {
    fn apply_to(&self, map: &mut MapDocument) {
        if let Some(name) = &self.name {
            map.name = name.clone();
        }
        if let Some(description) = &self.description {
            map.description = description.clone();
        }
    }

    fn snapshot_of(&self, map: &MapDocument) -> Self {
        MapUpdate {
            name: self.name.as_ref().map(|_| map.name.clone()),
            description: self.description.as_ref().map(|_| map.description.clone()),
        }
    }

    fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }
}

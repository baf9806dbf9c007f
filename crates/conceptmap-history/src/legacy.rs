//! Legacy deletion log.
//!
//! Older call sites record soft deletions as bare `(entity, deleted_at)`
//! entries instead of full commands. These entries can only be undone by
//! undeleting, have no redo counterpart, and are grouped purely by time.
//! Undo consults them only when the command history is empty.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use conceptmap_core::{CommentId, ConceptId, EntityKind, RelationshipId};

use crate::clock::Timestamp;
use crate::command::OperationId;
use crate::grouping::TimeWindowGrouping;

/// The entity a legacy entry deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum DeletedEntity {
    Concept(ConceptId),
    Relationship(RelationshipId),
    Comment(CommentId),
}

impl DeletedEntity {
    pub fn kind(&self) -> EntityKind {
        match self {
            DeletedEntity::Concept(_) => EntityKind::Concept,
            DeletedEntity::Relationship(_) => EntityKind::Relationship,
            DeletedEntity::Comment(_) => EntityKind::Comment,
        }
    }

    /// Restore order: concepts first, since relationships and comments may
    /// point at them.
    pub fn restore_priority(&self) -> u8 {
        match self {
            DeletedEntity::Concept(_) => 0,
            DeletedEntity::Relationship(_) => 1,
            DeletedEntity::Comment(_) => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyDeletion {
    pub entity: DeletedEntity,
    pub deleted_at: Timestamp,
    pub operation_id: OperationId,
}

/// Bounded, newest-first log of legacy deletions.
#[derive(Debug, Clone)]
pub struct LegacyDeletionLog {
    entries: VecDeque<LegacyDeletion>,
    grouping: TimeWindowGrouping,
    max_size: usize,
}

impl LegacyDeletionLog {
    pub fn new(max_size: usize, window_ms: u64) -> Self {
        LegacyDeletionLog {
            entries: VecDeque::new(),
            grouping: TimeWindowGrouping::new(window_ms),
            max_size,
        }
    }

    /// Records a deletion that happened at `now`, returning its operation.
    pub fn record(&mut self, entity: DeletedEntity, now: Timestamp) -> OperationId {
        let latest = self
            .entries
            .front()
            .map(|entry| (entry.operation_id, entry.deleted_at));
        let operation_id = self.grouping.resolve(now, latest);
        self.entries.push_front(LegacyDeletion {
            entity,
            deleted_at: now,
            operation_id,
        });
        self.entries.truncate(self.max_size);
        operation_id
    }

    /// All entries sharing the newest entry's operation, newest first.
    pub fn most_recent_operation(&self) -> Vec<LegacyDeletion> {
        match self.entries.front() {
            None => Vec::new(),
            Some(head) => self
                .entries
                .iter()
                .filter(|entry| entry.operation_id == head.operation_id)
                .cloned()
                .collect(),
        }
    }

    /// Removes and returns the newest operation's entries.
    pub fn remove_most_recent_operation(&mut self) -> Vec<LegacyDeletion> {
        match self.entries.front().map(|entry| entry.operation_id) {
            Some(operation_id) => self.remove_operation(operation_id),
            None => Vec::new(),
        }
    }

    /// Removes and returns every entry of `operation_id`, wherever it sits.
    pub fn remove_operation(&mut self, operation_id: OperationId) -> Vec<LegacyDeletion> {
        let (removed, kept): (VecDeque<_>, VecDeque<_>) = self
            .entries
            .drain(..)
            .partition(|entry| entry.operation_id == operation_id);
        self.entries = kept;
        removed.into()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.grouping.reset();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &VecDeque<LegacyDeletion> {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deletions_within_window_share_an_operation() {
        let mut log = LegacyDeletionLog::new(100, 1_000);
        let concept = DeletedEntity::Concept(ConceptId::new());
        let relationship = DeletedEntity::Relationship(RelationshipId::new());
        let comment = DeletedEntity::Comment(CommentId::new());

        let a = log.record(concept, Timestamp(0));
        let b = log.record(relationship, Timestamp(300));
        let c = log.record(comment, Timestamp(5_000));
        assert_eq!(a, b);
        assert_ne!(b, c);

        let newest = log.most_recent_operation();
        assert_eq!(newest.len(), 1);
        assert_eq!(newest[0].entity, comment);

        assert_eq!(log.remove_most_recent_operation().len(), 1);
        let older = log.remove_most_recent_operation();
        assert_eq!(
            older.iter().map(|e| e.entity).collect::<Vec<_>>(),
            vec![relationship, concept]
        );
        assert!(log.is_empty());
        assert!(log.remove_most_recent_operation().is_empty());
    }

    #[test]
    fn remove_operation_leaves_newer_entries() {
        let mut log = LegacyDeletionLog::new(100, 1_000);
        let older = log.record(DeletedEntity::Concept(ConceptId::new()), Timestamp(0));
        let newer_entity = DeletedEntity::Comment(CommentId::new());
        let newer = log.record(newer_entity, Timestamp(9_000));
        assert_ne!(older, newer);

        assert_eq!(log.remove_operation(older).len(), 1);
        assert_eq!(log.len(), 1);
        assert_eq!(log.entries()[0].entity, newer_entity);
        assert!(log.remove_operation(older).is_empty());
    }

    #[test]
    fn log_is_bounded() {
        let mut log = LegacyDeletionLog::new(3, 0);
        for i in 0..5 {
            log.record(DeletedEntity::Concept(ConceptId::new()), Timestamp(i * 10));
        }
        assert_eq!(log.len(), 3);
        assert_eq!(log.entries()[0].deleted_at, Timestamp(40));
    }

    #[test]
    fn restore_priority_orders_concepts_first() {
        let mut entities = vec![
            DeletedEntity::Comment(CommentId::new()),
            DeletedEntity::Relationship(RelationshipId::new()),
            DeletedEntity::Concept(ConceptId::new()),
        ];
        entities.sort_by_key(DeletedEntity::restore_priority);
        assert_eq!(entities[0].kind(), EntityKind::Concept);
        assert_eq!(entities[1].kind(), EntityKind::Relationship);
        assert_eq!(entities[2].kind(), EntityKind::Comment);
    }

    #[test]
    fn clear_resets_grouping() {
        let mut log = LegacyDeletionLog::new(100, 1_000);
        let a = log.record(DeletedEntity::Concept(ConceptId::new()), Timestamp(0));
        log.clear();
        let b = log.record(DeletedEntity::Concept(ConceptId::new()), Timestamp(10));
        assert_ne!(a, b);
    }
}

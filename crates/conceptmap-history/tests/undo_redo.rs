//! Integration tests for undo/redo over the in-memory store.

mod common;

use std::sync::Arc;

use conceptmap_core::{ConceptUpdate, PerspectiveMembership, Position};
use conceptmap_history::{
    CommandKind, CommandType, DispatchMode, HistoryConfig, OperationId, Timestamp,
};
use conceptmap_storage::StoreCall;

use common::{concept_data, harness, harness_with};

#[tokio::test]
async fn create_then_update_round_trip() {
    let h = harness().await;
    let op1 = OperationId::new();
    let emitter = h.engine.emitter().in_operation(op1);

    let c1 = emitter
        .create_concept(concept_data(h.map_id, "A"))
        .await
        .unwrap();
    emitter
        .update_concept_with_snapshot(
            c1,
            ConceptUpdate::label("B"),
            Some(ConceptUpdate::label("A")),
        )
        .await
        .unwrap();
    assert_eq!(h.history_len(), 2);
    h.store.clear_calls();

    assert!(h.engine.undo().await);
    assert_eq!(
        h.store.calls(),
        vec![
            StoreCall::UpdateConcept(c1, ConceptUpdate::label("A")),
            StoreCall::DeleteConcept(c1),
        ]
    );
    assert_eq!(h.history_len(), 0);
    assert_eq!(h.redo_len(), 2);
    assert!(!h.is_live(c1));

    h.store.clear_calls();
    assert!(h.engine.redo().await);
    assert_eq!(
        h.store.calls(),
        vec![
            StoreCall::CreateConcept(c1),
            StoreCall::UpdateConcept(c1, ConceptUpdate::label("B")),
        ]
    );
    assert_eq!(h.redo_len(), 0);
    assert_eq!(h.history_len(), 2);
    assert!(h.is_live(c1));
    assert_eq!(h.label_of(c1), "B");
}

#[tokio::test]
async fn update_snapshot_is_taken_from_the_store() {
    let h = harness().await;
    let id = h.concept("Before").await;
    h.engine
        .emitter()
        .update_concept(id, ConceptUpdate::label("After"))
        .await
        .unwrap();

    assert!(h.engine.undo().await);
    assert_eq!(h.label_of(id), "Before");
    assert!(h.engine.redo().await);
    assert_eq!(h.label_of(id), "After");
}

#[tokio::test]
async fn drag_snapshot_supplied_by_caller() {
    let h = harness().await;
    let id = h.concept("Node").await;
    h.engine
        .emitter()
        .update_concept_with_snapshot(
            id,
            ConceptUpdate::position(Position::new(300.0, 40.0)),
            Some(ConceptUpdate::position(Position::new(10.0, 20.0))),
        )
        .await
        .unwrap();

    assert!(h.engine.undo().await);
    let concept = h.store.concept_record(id).unwrap();
    assert_eq!(concept.position, Position::new(10.0, 20.0));
}

#[tokio::test]
async fn update_without_snapshot_moves_to_redo_without_calling_store() {
    let h = harness().await;
    let id = h.concept("A").await;
    h.engine.history().lock().clear_history();
    h.engine
        .emitter()
        .update_concept_with_snapshot(id, ConceptUpdate::label("B"), None)
        .await
        .unwrap();
    h.store.clear_calls();

    assert!(h.engine.undo().await);
    assert!(h.store.calls().is_empty());
    assert_eq!(h.redo_len(), 1);
    assert_eq!(h.label_of(id), "B");
}

#[tokio::test]
async fn create_without_id_cannot_be_reversed_or_replayed() {
    let h = harness().await;
    h.engine.history().lock().record_mutation(
        CommandKind::CreateConcept {
            data: concept_data(h.map_id, "Ghost"),
            concept_id: None,
        },
        None,
        Timestamp(5),
    );

    assert!(h.engine.undo().await);
    assert!(h.store.calls().is_empty());
    assert_eq!(h.redo_len(), 1);

    assert!(!h.engine.redo().await);
    assert!(h.store.calls().is_empty());
    assert_eq!(h.history_len(), 1);
}

#[tokio::test]
async fn redo_does_not_record_new_commands() {
    let h = harness().await;
    let a = h.concept("A").await;
    h.engine
        .emitter()
        .update_concept(a, ConceptUpdate::label("B"))
        .await
        .unwrap();
    let before = h.history_ids();

    assert!(h.engine.undo().await);
    assert!(h.engine.undo().await);
    assert!(h.engine.redo().await);
    assert!(h.engine.redo().await);

    assert_eq!(h.history_ids(), before);
    assert!(!h.engine.history().lock().is_redoing());
}

#[tokio::test]
async fn emission_while_redoing_is_not_recorded() {
    let h = harness().await;
    h.engine.history().lock().set_is_redoing(true);
    h.concept("A").await;
    assert_eq!(h.history_len(), 0);

    h.engine.history().lock().set_is_redoing(false);
    h.concept("B").await;
    assert_eq!(h.history_len(), 1);
}

#[tokio::test]
async fn partial_reversal_failure_still_moves_operation() {
    let h = harness().await;
    h.engine.start_operation();
    let a = h.concept("A").await;
    let b = h.concept("B").await;
    h.engine.end_operation();

    h.store
        .fail_when(move |call| *call == StoreCall::DeleteConcept(a));
    assert!(h.engine.undo().await);
    assert_eq!(h.redo_len(), 2);
    assert_eq!(h.history_len(), 0);
    assert!(h.is_live(a));
    assert!(!h.is_live(b));

    // `a` is still live, so re-creating it fails; `b` comes back.
    h.store.clear_faults();
    assert!(h.engine.redo().await);
    assert!(h.is_live(b));
    assert_eq!(h.history_len(), 2);
}

#[tokio::test]
async fn redo_with_every_command_failing_returns_false() {
    let h = harness().await;
    let a = h.concept("A").await;
    assert!(h.engine.undo().await);

    h.store
        .fail_when(|call| matches!(call, StoreCall::CreateConcept(_)));
    assert!(!h.engine.redo().await);
    assert!(!h.is_live(a));
    assert!(!h.engine.can_redo());
    // Reinserted regardless, so the entry is not lost.
    assert_eq!(h.history_len(), 1);
}

#[tokio::test]
async fn failed_emission_is_not_recorded() {
    let h = harness().await;
    h.store
        .fail_when(|call| matches!(call, StoreCall::CreateConcept(_)));

    let result = h
        .engine
        .emitter()
        .create_concept(concept_data(h.map_id, "A"))
        .await;
    assert!(result.is_err());
    assert_eq!(h.history_len(), 0);
    assert!(!h.engine.can_undo());
}

#[tokio::test]
async fn explicit_operation_groups_commands() {
    let h = harness().await;
    let op = h.engine.start_operation();
    let a = h.concept("A").await;
    let b = h.concept("B").await;
    h.relationship(a, b).await;
    h.engine.end_operation();
    h.concept("C").await;

    assert_eq!(h.engine.peek_undo().unwrap().command_count, 1);
    assert!(h.engine.undo().await);

    let summary = h.engine.peek_undo().unwrap();
    assert_eq!(summary.operation_id, op);
    assert_eq!(summary.command_count, 3);
    assert_eq!(summary.head, CommandType::CreateRelationship);
    assert_eq!(summary.label(), "create relationship and 2 more");

    assert!(h.engine.undo().await);
    assert!(!h.is_live(a));
    assert!(!h.is_live(b));
    assert_eq!(h.redo_len(), 4);
    assert_eq!(h.engine.peek_redo().unwrap().operation_id, op);

    assert!(h.engine.redo().await);
    assert!(h.is_live(a));
    assert!(h.is_live(b));
    assert_eq!(h.history_len(), 3);
}

#[tokio::test]
async fn commands_outside_an_operation_are_undone_one_by_one() {
    let h = harness().await;
    h.concept("A").await;
    h.concept("B").await;

    assert!(h.engine.undo().await);
    assert_eq!(h.history_len(), 1);
    assert!(h.engine.undo().await);
    assert_eq!(h.history_len(), 0);
    assert!(!h.engine.undo().await);
}

#[tokio::test]
async fn new_edit_after_undo_clears_redo() {
    let h = harness().await;
    h.concept("A").await;
    assert!(h.engine.undo().await);
    assert!(h.engine.can_redo());

    h.concept("B").await;
    assert!(!h.engine.can_redo());
    assert!(!h.engine.redo().await);
}

#[tokio::test]
async fn empty_history_returns_false() {
    let h = harness().await;
    assert!(!h.engine.can_undo());
    assert!(!h.engine.can_redo());
    assert!(!h.engine.undo().await);
    assert!(!h.engine.redo().await);
    assert!(h.engine.peek_undo().is_none());
}

#[tokio::test]
async fn reverse_relationship_round_trip() {
    let h = harness().await;
    let a = h.concept("A").await;
    let b = h.concept("B").await;
    let r = h.relationship(a, b).await;

    let reversed = h.engine.emitter().reverse_relationship(r).await.unwrap();
    assert_eq!((reversed.from, reversed.to), (b, a));
    assert_eq!(reversed.primary_label, "is caused by");

    assert!(h.engine.undo().await);
    let relationship = h.store.relationship_record(r).unwrap();
    assert_eq!((relationship.from, relationship.to), (a, b));
    assert_eq!(relationship.primary_label, "causes");

    assert!(h.engine.redo().await);
    let relationship = h.store.relationship_record(r).unwrap();
    assert_eq!((relationship.from, relationship.to), (b, a));
    assert_eq!(relationship.reverse_label.as_deref(), Some("causes"));
}

#[tokio::test]
async fn toggle_undo_restores_cascaded_membership() {
    let h = harness().await;
    let a = h.concept("A").await;
    let b = h.concept("B").await;
    let r = h.relationship(a, b).await;
    let p = h.perspective(vec![a, b], vec![r]).await;
    let original = h.store.perspective_record(p).unwrap().membership();

    h.engine
        .emitter()
        .toggle_concept_in_perspective(p, a)
        .await
        .unwrap();
    assert_eq!(
        h.store.perspective_record(p).unwrap().membership(),
        PerspectiveMembership {
            concept_ids: vec![b],
            relationship_ids: vec![],
        }
    );
    match &h.engine.history().lock().mutation_history()[0].kind {
        CommandKind::ToggleConceptInPerspective { was_included, .. } => assert!(*was_included),
        other => panic!("unexpected command {other:?}"),
    }

    assert!(h.engine.undo().await);
    assert_eq!(h.store.perspective_record(p).unwrap().membership(), original);

    assert!(h.engine.redo().await);
    assert_eq!(
        h.store.perspective_record(p).unwrap().membership().concept_ids,
        vec![b]
    );
}

#[tokio::test]
async fn toggle_relationship_round_trip() {
    let h = harness().await;
    let a = h.concept("A").await;
    let b = h.concept("B").await;
    let r = h.relationship(a, b).await;
    let p = h.perspective(vec![a, b], vec![]).await;

    h.engine
        .emitter()
        .toggle_relationship_in_perspective(p, r)
        .await
        .unwrap();
    assert!(h
        .store
        .perspective_record(p)
        .unwrap()
        .membership()
        .contains_relationship(r));

    assert!(h.engine.undo().await);
    assert!(h
        .store
        .perspective_record(p)
        .unwrap()
        .relationship_ids
        .is_empty());
}

#[tokio::test]
async fn link_and_unlink_comment() {
    let h = harness().await;
    let a = h.concept("A").await;
    let k = h.comment("note").await;

    h.engine.emitter().link_comment(k, a).await.unwrap();
    assert!(h.store.comment_record(k).unwrap().linked_concepts.contains(&a));

    assert!(h.engine.undo().await);
    assert!(h.store.comment_record(k).unwrap().linked_concepts.is_empty());
    assert!(h.engine.redo().await);
    assert!(h.store.comment_record(k).unwrap().linked_concepts.contains(&a));

    h.engine.emitter().unlink_comment(k, a).await.unwrap();
    assert!(h.store.comment_record(k).unwrap().linked_concepts.is_empty());
    assert!(h.engine.undo().await);
    assert!(h.store.comment_record(k).unwrap().linked_concepts.contains(&a));
}

#[tokio::test]
async fn delete_is_undone_by_undelete() {
    let h = harness().await;
    let a = h.concept("A").await;
    h.engine.emitter().delete_concept(a).await.unwrap();
    assert!(!h.is_live(a));
    h.store.clear_calls();

    assert!(h.engine.undo().await);
    assert_eq!(h.store.calls(), vec![StoreCall::UndeleteConcept(a)]);
    assert!(h.is_live(a));

    assert!(h.engine.redo().await);
    assert!(!h.is_live(a));
}

#[tokio::test]
async fn undos_take_turns() {
    let h = harness().await;
    h.concept("A").await;
    h.concept("B").await;
    let engine = Arc::new(h.engine);

    let (first, second) = tokio::join!(engine.undo(), engine.undo());
    assert!(first && second);
    assert!(!engine.can_undo());
    assert_eq!(engine.history().lock().redo_stack().len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn undo_and_redo_from_spawned_tasks() {
    let h = harness().await;
    h.concept("A").await;
    h.concept("B").await;
    let engine = Arc::new(h.engine);

    let tasks: Vec<_> = (0..2)
        .map(|_| {
            let engine = engine.clone();
            tokio::spawn(async move { engine.undo().await })
        })
        .collect();
    for task in tasks {
        assert!(task.await.unwrap());
    }
    assert!(engine.redo().await);
    assert_eq!(engine.history().lock().mutation_history().len(), 1);
    assert_eq!(engine.history().lock().redo_stack().len(), 1);
}

#[tokio::test]
async fn sequential_dispatch_keeps_the_same_order() {
    let h = harness_with(HistoryConfig {
        dispatch: DispatchMode::Sequential,
        ..HistoryConfig::default()
    })
    .await;
    h.engine.start_operation();
    let a = h.concept("A").await;
    h.engine
        .emitter()
        .update_concept(a, ConceptUpdate::label("B"))
        .await
        .unwrap();
    h.engine.end_operation();
    h.store.clear_calls();

    assert!(h.engine.undo().await);
    assert!(h.engine.redo().await);
    assert_eq!(
        h.store.calls(),
        vec![
            StoreCall::UpdateConcept(a, ConceptUpdate::label("A")),
            StoreCall::DeleteConcept(a),
            StoreCall::CreateConcept(a),
            StoreCall::UpdateConcept(a, ConceptUpdate::label("B")),
        ]
    );
}

#[tokio::test]
async fn history_is_bounded() {
    let h = harness_with(HistoryConfig {
        max_size: 5,
        ..HistoryConfig::default()
    })
    .await;
    for i in 0..8 {
        h.concept(&format!("C{i}")).await;
    }
    assert_eq!(h.history_len(), 5);
    assert_eq!(h.history_types(), vec![CommandType::CreateConcept; 5]);
}

#[tokio::test]
async fn clear_history_forgets_everything() {
    let h = harness().await;
    h.concept("A").await;
    h.concept("B").await;
    assert!(h.engine.undo().await);
    h.engine.start_operation();

    h.engine.clear_history();
    assert!(!h.engine.can_undo());
    assert!(!h.engine.can_redo());
    assert!(h.engine.history().lock().current_operation().is_none());
}

#[tokio::test]
async fn map_update_and_delete_round_trip() {
    let h = harness().await;
    let emitter = h.engine.emitter();
    emitter
        .update_map(
            h.map_id,
            conceptmap_core::MapUpdate {
                name: Some("Renamed".into()),
                description: Some(Some("about".into())),
            },
        )
        .await
        .unwrap();
    emitter.delete_map(h.map_id).await.unwrap();

    assert!(h.engine.undo().await);
    assert!(h.engine.undo().await);
    let map = h.store.map_record(h.map_id).unwrap();
    assert_eq!(map.name, "Test map");
    assert_eq!(map.description, None);
    assert_eq!(map.deleted_at, None);
}

//! Shared fixtures for the history integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use conceptmap_core::{
    CommentData, CommentId, ConceptData, ConceptId, MapData, MapId, PerspectiveData,
    PerspectiveId, Position, RelationshipData, RelationshipId,
};
use conceptmap_history::{
    CommandId, CommandType, HistoryConfig, HistoryEngine, ManualClock,
};
use conceptmap_storage::{InMemoryStore, MapActions};

pub struct Harness {
    pub engine: HistoryEngine,
    pub store: Arc<InMemoryStore>,
    pub clock: Arc<ManualClock>,
    pub map_id: MapId,
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub async fn harness() -> Harness {
    harness_with(HistoryConfig::default()).await
}

/// Engine over an empty in-memory store holding one map. The store journal
/// starts empty.
pub async fn harness_with(config: HistoryConfig) -> Harness {
    init_tracing();
    let store = Arc::new(InMemoryStore::new());
    let clock = Arc::new(ManualClock::new(1_000));
    let engine = HistoryEngine::with_clock(store.clone(), config, clock.clone());
    let map_id = store
        .create_map(
            MapId::new(),
            &MapData {
                name: "Test map".into(),
                description: None,
            },
        )
        .await
        .unwrap();
    store.clear_calls();
    Harness {
        engine,
        store,
        clock,
        map_id,
    }
}

pub fn concept_data(map_id: MapId, label: &str) -> ConceptData {
    ConceptData {
        map_id,
        label: label.into(),
        position: Position::new(10.0, 20.0),
        color: None,
    }
}

impl Harness {
    pub async fn concept(&self, label: &str) -> ConceptId {
        self.engine
            .emitter()
            .create_concept(concept_data(self.map_id, label))
            .await
            .unwrap()
    }

    pub async fn relationship(&self, from: ConceptId, to: ConceptId) -> RelationshipId {
        self.engine
            .emitter()
            .create_relationship(RelationshipData {
                map_id: self.map_id,
                from,
                to,
                primary_label: "causes".into(),
                reverse_label: Some("is caused by".into()),
            })
            .await
            .unwrap()
    }

    pub async fn comment(&self, text: &str) -> CommentId {
        self.engine
            .emitter()
            .create_comment(CommentData {
                map_id: self.map_id,
                text: text.into(),
                position: Position::default(),
            })
            .await
            .unwrap()
    }

    pub async fn perspective(
        &self,
        concept_ids: Vec<ConceptId>,
        relationship_ids: Vec<RelationshipId>,
    ) -> PerspectiveId {
        self.engine
            .emitter()
            .create_perspective(PerspectiveData {
                map_id: self.map_id,
                name: "Overview".into(),
                concept_ids,
                relationship_ids,
            })
            .await
            .unwrap()
    }

    pub fn history_ids(&self) -> Vec<CommandId> {
        self.engine
            .history()
            .lock()
            .mutation_history()
            .iter()
            .map(|command| command.id)
            .collect()
    }

    pub fn history_types(&self) -> Vec<CommandType> {
        self.engine
            .history()
            .lock()
            .mutation_history()
            .iter()
            .map(|command| command.command_type())
            .collect()
    }

    pub fn history_len(&self) -> usize {
        self.engine.history().lock().mutation_history().len()
    }

    pub fn redo_len(&self) -> usize {
        self.engine.history().lock().redo_stack().len()
    }

    pub fn label_of(&self, id: ConceptId) -> String {
        self.store.concept_record(id).unwrap().label
    }

    pub fn is_live(&self, id: ConceptId) -> bool {
        self.store
            .concept_record(id)
            .is_some_and(|concept| concept.deleted_at.is_none())
    }
}

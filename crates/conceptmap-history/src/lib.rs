//! Undo/redo command engine for concept map editing.
//!
//! Every structural edit made through the [`CommandEmitter`] is recorded as a
//! [`Command`] carrying enough data to reverse and replay it. Commands are
//! grouped into operations (all commands sharing an [`OperationId`]), and an
//! operation is the unit the [`HistoryEngine`] undoes and redoes.
//!
//! The engine never touches persistence directly: it calls the collaborator
//! traits from `conceptmap-storage`, so any backend implementing
//! [`conceptmap_storage::MapStore`] can be driven by it.

pub mod clock;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod emit;
pub mod engine;
pub mod error;
pub mod grouping;
pub mod legacy;
pub mod replay;
pub mod reversal;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use command::{Command, CommandId, CommandKind, CommandType, OperationId};
pub use config::{DispatchMode, HistoryConfig};
pub use emit::CommandEmitter;
pub use engine::{HistoryEngine, OperationSummary};
pub use error::HistoryError;
pub use legacy::{DeletedEntity, LegacyDeletion};
pub use store::{CommandStore, SharedCommandStore};

//! Almacenamiento del log de eventos, participantes y libro de beneficios.

mod memory;
mod types;

pub use memory::InMemoryCareStore;
pub use types::{CareStore, Changeset, EventQuery, EventStore, Expectation, LedgerStore, ParticipantStore, PlaceholderPurge};

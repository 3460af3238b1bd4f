//! Extra Care
//!
//! Fachada del workspace:
//! - `domain`: tipos del programa (`care-domain`).
//! - `core`: motor de estados, validación y reportes (`care-core`).
//! - `persistence`: backend Postgres (`care-persistence`).
//! - `errors`: error de aplicación para binarios y demos.

pub mod errors;

pub use care_core as core;
pub use care_domain as domain;
pub use care_persistence as persistence;

pub use care_core::{CareEngine, CareError, EngineConfig, FixedClock, FlowRequirements, InMemoryCareStore, SystemClock};
pub use care_domain::{EventCatalog, EventSubmission, Participant, ParticipantStatus, Phase, ProgressEvent};
pub use errors::AppError;

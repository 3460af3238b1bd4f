//! care-core: máquina de estados del programa Extra Care.
//!
//! - `flow`: evaluador, validador y derivador de estado (funciones puras).
//! - `engine`: servicio que secuencia validación -> persistencia -> derivación.
//! - `store`: contratos de almacenamiento y backend en memoria.
//! - `ledger`: reporte de beneficios.
pub mod clock;
pub mod config;
pub mod constants;
pub mod engine;
pub mod errors;
pub mod flow;
pub mod ledger;
pub mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::EngineConfig;
pub use engine::{CareEngine, EngineBuilder};
pub use errors::{CareError, StoreError};
pub use flow::{derive_status, evaluate, validate, DateWindow, FlowRequirements, StatusDerivation};
pub use ledger::{BenefitReport, BenefitStats, BenefitTypeReport, ParticipantSpend, ParticipantTotals};
pub use store::{CareStore, Changeset, EventQuery, EventStore, Expectation, InMemoryCareStore, LedgerStore, ParticipantStore,
                PlaceholderPurge};

//! Errores del core.

use care_domain::ValidationError;
use thiserror::Error;
use uuid::Uuid;

/// Fallos de un backend de almacenamiento.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum StoreError {
    /// El historial cambió desde la lectura (escritor concurrente).
    #[error("concurrent modification detected")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("backend: {0}")]
    Backend(String),
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum CareError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("participant not found: {0}")]
    ParticipantNotFound(Uuid),
    #[error("progress event not found: {0}")]
    EventNotFound(Uuid),
    #[error("benefit type not found: {0}")]
    BenefitTypeNotFound(Uuid),
    /// Operación no permitida en el estado actual (aviso al operador).
    #[error("{0}")]
    Precondition(String),
    #[error("participant {0} was modified concurrently; retry the submission")]
    Conflict(Uuid),
    #[error("configuration: {0}")]
    Config(String),
    #[error("store: {0}")]
    Store(String),
}

impl From<StoreError> for CareError {
    fn from(e: StoreError) -> Self {
        CareError::Store(e.to_string())
    }
}

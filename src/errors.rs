use thiserror::Error;

use care_core::CareError;
use care_persistence::PersistenceError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Error del programa: {0}")]
    Care(#[from] CareError),
    #[error("Error de persistencia: {0}")]
    Persistence(#[from] PersistenceError),
    #[error("Error de configuración: {0}")]
    Config(String),
}

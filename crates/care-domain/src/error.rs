//! Errores de validación del dominio.
//!
//! Los mensajes se muestran tal cual al operador (formulario o respuesta de
//! API), por lo que su texto forma parte del contrato observable.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Campo de fecha de un evento de progreso.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateField {
    Scheduled,
    Occurred,
    Excused,
}

impl DateField {
    pub const ALL: [DateField; 3] = [DateField::Scheduled, DateField::Occurred, DateField::Excused];

    pub fn as_str(&self) -> &'static str {
        match self {
            DateField::Scheduled => "scheduled",
            DateField::Occurred => "occurred",
            DateField::Excused => "excused",
        }
    }
}

impl fmt::Display for DateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationError {
    #[error("Event type {0} not valid here.")]
    InvalidEventType(String),
    #[error("Invalid {0} date - it falls outside of program guidelines for monthly sessions.")]
    DateOutsideWindow(DateField),
    #[error("Cannot complete intake until all phases are complete.")]
    IntakeIncomplete,
    #[error("Event cannot be both occurred and excused.")]
    OccurredAndExcused,
    #[error("The {0} date cannot be in the future.")]
    FutureDate(DateField),
    #[error("Event {0} is already complete and cannot be edited.")]
    EventAlreadyComplete(uuid::Uuid),
    #[error("Event {0} does not belong to this participant's current program flow.")]
    ForeignEvent(uuid::Uuid),
    #[error("Invalid catalog: {0}")]
    Catalog(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_match_operator_templates() {
        assert_eq!(ValidationError::InvalidEventType("Check-in".into()).to_string(),
                   "Event type Check-in not valid here.");
        assert_eq!(ValidationError::DateOutsideWindow(DateField::Occurred).to_string(),
                   "Invalid occurred date - it falls outside of program guidelines for monthly sessions.");
        assert_eq!(ValidationError::IntakeIncomplete.to_string(),
                   "Cannot complete intake until all phases are complete.");
    }

    #[test]
    fn future_date_names_the_field() {
        let err = ValidationError::FutureDate(DateField::Excused);
        assert_eq!(err.to_string(), "The excused date cannot be in the future.");
    }
}

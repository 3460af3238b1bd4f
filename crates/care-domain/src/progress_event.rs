//! Evento de progreso clínico (una fila por hito).
//!
//! Rol en el flujo:
//! - Los eventos completos (`occurred` o `excused`) son el historial que
//!   consume el evaluador del flujo.
//! - Los incompletos son placeholders de agenda; no cuentan como historial.
//! - `program_flow` particiona el log por ciclo del programa.
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::phase::Phase;
use crate::submission::EventSubmission;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub id: Uuid,
    pub participant_id: Uuid,
    pub program_flow: u32,
    pub event_type: String,
    /// Informativo, fijado al crear el evento.
    pub phase: Phase,
    pub scheduled: Option<NaiveDate>,
    pub occurred: Option<NaiveDate>,
    pub excused: Option<NaiveDate>,
    pub note: String,
    pub complete: bool,
    pub rescheduled_count: u32,
}

impl ProgressEvent {
    /// Construye un evento nuevo a partir de una fila enviada.
    pub fn from_submission(participant_id: Uuid,
                           program_flow: u32,
                           phase: Phase,
                           row: &EventSubmission)
                           -> Result<Self, ValidationError> {
        if row.occurred.is_some() && row.excused.is_some() {
            return Err(ValidationError::OccurredAndExcused);
        }
        Ok(Self { id: Uuid::new_v4(),
                  participant_id,
                  program_flow,
                  event_type: row.event_type.clone(),
                  phase,
                  scheduled: row.scheduled,
                  occurred: row.occurred,
                  excused: row.excused,
                  note: row.note.clone(),
                  complete: row.completes(),
                  rescheduled_count: 0 })
    }

    /// Marcador terminal (`Completed` / `Exited program early`), siempre completo.
    pub fn marker(participant_id: Uuid, program_flow: u32, event_type: &str, phase: Phase, occurred: NaiveDate) -> Self {
        Self { id: Uuid::new_v4(),
               participant_id,
               program_flow,
               event_type: event_type.to_string(),
               phase,
               scheduled: None,
               occurred: Some(occurred),
               excused: None,
               note: String::new(),
               complete: true,
               rescheduled_count: 0 }
    }

    /// `occurred` si existe, si no `excused`.
    pub fn effective_date(&self) -> Option<NaiveDate> {
        self.occurred.or(self.excused)
    }

    /// Cambia `scheduled`; cada cambio real en una fila existente se audita.
    pub fn reschedule(&mut self, scheduled: Option<NaiveDate>) {
        if self.scheduled != scheduled {
            self.scheduled = scheduled;
            self.rescheduled_count += 1;
        }
    }

    /// Aplica una fila enviada sobre un placeholder existente.
    pub fn apply_submission(&mut self, row: &EventSubmission) -> Result<(), ValidationError> {
        if row.occurred.is_some() && row.excused.is_some() {
            return Err(ValidationError::OccurredAndExcused);
        }
        if row.scheduled.is_some() {
            self.reschedule(row.scheduled);
        }
        self.occurred = row.occurred;
        self.excused = row.excused;
        if !row.note.is_empty() {
            self.note = row.note.clone();
        }
        self.complete = self.effective_date().is_some();
        Ok(())
    }
}

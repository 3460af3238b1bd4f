//! Fila de envío tipada (una por tipo de evento requerido en el formulario).
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DateField, ValidationError};

/// Evento propuesto por el operador.
///
/// Si `event_id` está presente la fila completa/reagenda un placeholder ya
/// persistido en lugar de crear uno nuevo.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSubmission {
    #[serde(default)]
    pub event_id: Option<Uuid>,
    pub event_type: String,
    #[serde(default)]
    pub scheduled: Option<NaiveDate>,
    #[serde(default)]
    pub occurred: Option<NaiveDate>,
    #[serde(default)]
    pub excused: Option<NaiveDate>,
    #[serde(default)]
    pub note: String,
}

impl EventSubmission {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self { event_type: event_type.into(),
               ..Default::default() }
    }

    pub fn scheduled(mut self, date: NaiveDate) -> Self {
        self.scheduled = Some(date);
        self
    }

    pub fn occurred(mut self, date: NaiveDate) -> Self {
        self.occurred = Some(date);
        self
    }

    pub fn excused(mut self, date: NaiveDate) -> Self {
        self.excused = Some(date);
        self
    }

    pub fn for_event(mut self, event_id: Uuid) -> Self {
        self.event_id = Some(event_id);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    pub fn date(&self, field: DateField) -> Option<NaiveDate> {
        match field {
            DateField::Scheduled => self.scheduled,
            DateField::Occurred => self.occurred,
            DateField::Excused => self.excused,
        }
    }

    /// Fechas presentes en orden scheduled, occurred, excused.
    pub fn dates(&self) -> impl Iterator<Item = (DateField, NaiveDate)> + '_ {
        DateField::ALL.into_iter().filter_map(move |f| self.date(f).map(|d| (f, d)))
    }

    /// La fila marca el evento como ocurrido o excusado.
    pub fn completes(&self) -> bool {
        self.occurred.is_some() || self.excused.is_some()
    }

    /// Reglas por fila: exclusividad occurred/excused y fechas futuras.
    pub fn check(&self, today: NaiveDate, allow_future: bool) -> Result<(), ValidationError> {
        check_dates(self.occurred, self.excused, today, allow_future)
    }
}

/// `occurred` y `excused` son excluyentes; ninguno puede caer después de
/// mañana salvo en modo debug.
pub fn check_dates(occurred: Option<NaiveDate>,
                   excused: Option<NaiveDate>,
                   today: NaiveDate,
                   allow_future: bool)
                   -> Result<(), ValidationError> {
    if occurred.is_some() && excused.is_some() {
        return Err(ValidationError::OccurredAndExcused);
    }
    if allow_future {
        return Ok(());
    }
    let limit = today.checked_add_days(Days::new(1)).unwrap_or(today);
    for (field, date) in [(DateField::Occurred, occurred), (DateField::Excused, excused)] {
        if matches!(date, Some(d) if d > limit) {
            return Err(ValidationError::FutureDate(field));
        }
    }
    Ok(())
}

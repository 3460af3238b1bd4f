use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Autor mostrado cuando la nota no tiene usuario asociado.
pub const SYSTEM_AUTHOR: &str = "Athene";

/// Nota de seguimiento (sólo se agregan, nunca se editan).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantNote {
    pub id: Uuid,
    pub participant_id: Uuid,
    pub created: DateTime<Utc>,
    pub added_by: Option<String>,
    pub note: String,
}

impl ParticipantNote {
    pub fn new(participant_id: Uuid, created: DateTime<Utc>, added_by: Option<String>, note: impl Into<String>) -> Self {
        Self { id: Uuid::new_v4(),
               participant_id,
               created,
               added_by,
               note: note.into() }
    }
}

impl fmt::Display for ParticipantNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f,
               "{} by {}",
               self.created.format("%Y-%m-%d %H:%M"),
               self.added_by.as_deref().unwrap_or(SYSTEM_AUTHOR))
    }
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::phase::ParticipantStatus;

/// Participante inscrito en Extra Care (1:1 con la persona externa).
///
/// `status` es derivado: sólo lo modifica el derivador de estado del motor.
/// `current_program_flow` es el contador de generación que particiona el log
/// de eventos; empieza en 1 y sólo avanza con una salida anticipada.
/// `version` la incrementa el store en cada commit (control optimista).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Identidad de la persona (propiedad externa).
    pub id: Uuid,
    pub status: ParticipantStatus,
    pub current_program_flow: u32,
    #[serde(default)]
    pub version: u64,
}

impl Participant {
    pub fn new(human_id: Uuid) -> Self {
        Self { id: human_id,
               status: ParticipantStatus::Inactive,
               current_program_flow: 1,
               version: 0 }
    }

    pub fn is_active(&self) -> bool {
        self.status == ParticipantStatus::Active
    }
}

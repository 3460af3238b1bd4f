//! Contratos de almacenamiento que consume el motor.
//!
//! Las lecturas son por participante y ciclo; toda escritura del flujo pasa
//! por `CareStore::commit`, que aplica un `Changeset` de forma atómica.
use uuid::Uuid;

use care_domain::{Benefit, BenefitType, Participant, ParticipantNote, ProgressEvent};

use crate::errors::StoreError;

/// Filtro de lectura de eventos dentro de un ciclo.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventQuery {
    pub complete_only: bool,
    pub event_types: Option<Vec<String>>,
}

impl EventQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn completed() -> Self {
        Self { complete_only: true,
               event_types: None }
    }

    pub fn of_types<I, T>(mut self, types: I) -> Self
        where I: IntoIterator<Item = T>,
              T: Into<String>
    {
        self.event_types = Some(types.into_iter().map(Into::into).collect());
        self
    }

    pub fn matches(&self, ev: &ProgressEvent) -> bool {
        if self.complete_only && !ev.complete {
            return false;
        }
        match &self.event_types {
            Some(types) => types.iter().any(|t| *t == ev.event_type),
            None => true,
        }
    }
}

/// Borrado de placeholders sin completar (limpieza al cerrar el intake).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderPurge {
    pub participant_id: Uuid,
    pub program_flow: u32,
    pub event_types: Vec<String>,
}

impl PlaceholderPurge {
    pub fn matches(&self, ev: &ProgressEvent) -> bool {
        !ev.complete
        && ev.participant_id == self.participant_id
        && ev.program_flow == self.program_flow
        && self.event_types.iter().any(|t| *t == ev.event_type)
    }
}

/// Lo que el escritor observó al leer; el commit falla con
/// `StoreError::Conflict` si ya no se cumple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
    /// El participante no debe existir todavía.
    New,
    Existing {
        program_flow: u32,
        /// `Participant::version` leída; cualquier commit intermedio la cambia.
        version: u64,
    },
}

/// Unidad atómica de escritura.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Changeset {
    pub participant: Participant,
    pub expectation: Expectation,
    pub inserts: Vec<ProgressEvent>,
    /// Filas existentes reescritas (p. ej. reagendadas o completadas).
    pub updates: Vec<ProgressEvent>,
    pub purge: Option<PlaceholderPurge>,
}

impl Changeset {
    pub fn new(participant: Participant, expectation: Expectation) -> Self {
        Self { participant,
               expectation,
               inserts: Vec::new(),
               updates: Vec::new(),
               purge: None }
    }

    /// Changeset sobre un participante ya persistido, tal como se leyó.
    /// El participante del changeset lleva la versión que quedará escrita.
    pub fn existing(mut participant: Participant) -> Self {
        let expectation = Expectation::Existing { program_flow: participant.current_program_flow,
                                                  version: participant.version };
        participant.version += 1;
        Self::new(participant, expectation)
    }
}

pub trait ParticipantStore {
    fn participant(&self, id: Uuid) -> Result<Option<Participant>, StoreError>;
}

pub trait EventStore {
    /// Eventos del ciclo en orden de inserción.
    fn events(&self, participant_id: Uuid, program_flow: u32, query: &EventQuery) -> Result<Vec<ProgressEvent>, StoreError>;
    fn event(&self, id: Uuid) -> Result<Option<ProgressEvent>, StoreError>;
}

/// Beneficios y notas de seguimiento.
pub trait LedgerStore {
    fn benefit_types(&self) -> Result<Vec<BenefitType>, StoreError>;
    fn benefit_type(&self, id: Uuid) -> Result<Option<BenefitType>, StoreError>;
    fn insert_benefit_type(&self, benefit_type: &BenefitType) -> Result<(), StoreError>;
    fn insert_benefit(&self, benefit: &Benefit) -> Result<(), StoreError>;
    /// Todos los beneficios, o sólo los de un participante.
    fn benefits(&self, participant_id: Option<Uuid>) -> Result<Vec<Benefit>, StoreError>;
    fn insert_note(&self, note: &ParticipantNote) -> Result<(), StoreError>;
    fn notes(&self, participant_id: Uuid) -> Result<Vec<ParticipantNote>, StoreError>;
}

pub trait CareStore: ParticipantStore + EventStore + LedgerStore + Send + Sync {
    /// Aplica el changeset completo o nada.
    fn commit(&self, changeset: Changeset) -> Result<(), StoreError>;
}

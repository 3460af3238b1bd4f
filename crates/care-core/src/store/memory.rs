use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use indexmap::IndexMap;
use uuid::Uuid;

use care_domain::{Benefit, BenefitType, Participant, ParticipantNote, ProgressEvent};

use super::{Changeset, CareStore, EventQuery, EventStore, Expectation, LedgerStore, ParticipantStore};
use crate::errors::StoreError;

#[derive(Default)]
struct MemoryState {
    participants: HashMap<Uuid, Participant>,
    events: Vec<ProgressEvent>,
    benefit_types: IndexMap<Uuid, BenefitType>,
    benefits: Vec<Benefit>,
    notes: Vec<ParticipantNote>,
}

/// Backend en memoria; un único `RwLock` da atomicidad a `commit`.
#[derive(Default)]
pub struct InMemoryCareStore {
    inner: RwLock<MemoryState>,
}

impl InMemoryCareStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, MemoryState> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, MemoryState> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ParticipantStore for InMemoryCareStore {
    fn participant(&self, id: Uuid) -> Result<Option<Participant>, StoreError> {
        Ok(self.read().participants.get(&id).cloned())
    }
}

impl EventStore for InMemoryCareStore {
    fn events(&self, participant_id: Uuid, program_flow: u32, query: &EventQuery) -> Result<Vec<ProgressEvent>, StoreError> {
        Ok(self.read()
               .events
               .iter()
               .filter(|e| e.participant_id == participant_id && e.program_flow == program_flow && query.matches(e))
               .cloned()
               .collect())
    }

    fn event(&self, id: Uuid) -> Result<Option<ProgressEvent>, StoreError> {
        Ok(self.read().events.iter().find(|e| e.id == id).cloned())
    }
}

impl LedgerStore for InMemoryCareStore {
    fn benefit_types(&self) -> Result<Vec<BenefitType>, StoreError> {
        Ok(self.read().benefit_types.values().cloned().collect())
    }

    fn benefit_type(&self, id: Uuid) -> Result<Option<BenefitType>, StoreError> {
        Ok(self.read().benefit_types.get(&id).cloned())
    }

    fn insert_benefit_type(&self, benefit_type: &BenefitType) -> Result<(), StoreError> {
        self.write().benefit_types.insert(benefit_type.id, benefit_type.clone());
        Ok(())
    }

    fn insert_benefit(&self, benefit: &Benefit) -> Result<(), StoreError> {
        self.write().benefits.push(benefit.clone());
        Ok(())
    }

    fn benefits(&self, participant_id: Option<Uuid>) -> Result<Vec<Benefit>, StoreError> {
        Ok(self.read()
               .benefits
               .iter()
               .filter(|b| participant_id.map_or(true, |p| b.participant_id == p))
               .cloned()
               .collect())
    }

    fn insert_note(&self, note: &ParticipantNote) -> Result<(), StoreError> {
        self.write().notes.push(note.clone());
        Ok(())
    }

    fn notes(&self, participant_id: Uuid) -> Result<Vec<ParticipantNote>, StoreError> {
        let mut notes: Vec<ParticipantNote> =
            self.read().notes.iter().filter(|n| n.participant_id == participant_id).cloned().collect();
        notes.sort_by(|a, b| b.created.cmp(&a.created));
        Ok(notes)
    }
}

impl CareStore for InMemoryCareStore {
    fn commit(&self, mut changeset: Changeset) -> Result<(), StoreError> {
        let mut state = self.write();
        let pid = changeset.participant.id;

        // Verificación previa completa: si algo falla no se toca el estado.
        match changeset.expectation {
            Expectation::New => {
                if state.participants.contains_key(&pid) {
                    return Err(StoreError::Conflict);
                }
                changeset.participant.version = 0;
            }
            Expectation::Existing { program_flow, version } => {
                let current = state.participants.get(&pid).ok_or(StoreError::NotFound)?;
                if current.current_program_flow != program_flow || current.version != version {
                    return Err(StoreError::Conflict);
                }
                changeset.participant.version = version + 1;
            }
        }
        let update_idx = changeset.updates
                                  .iter()
                                  .map(|u| state.events.iter().position(|e| e.id == u.id).ok_or(StoreError::NotFound))
                                  .collect::<Result<Vec<_>, _>>()?;

        for (idx, updated) in update_idx.into_iter().zip(changeset.updates) {
            state.events[idx] = updated;
        }
        state.events.extend(changeset.inserts);
        if let Some(purge) = &changeset.purge {
            state.events.retain(|e| !purge.matches(e));
        }
        state.participants.insert(pid, changeset.participant);
        Ok(())
    }
}

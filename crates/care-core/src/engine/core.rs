//! Servicio del programa Extra Care.
//!
//! Cada escritura sigue la misma secuencia dentro de la sección crítica del
//! participante: leer -> evaluar -> validar -> armar `Changeset` -> derivar
//! estado -> `commit` atómico. Nada se escribe si la validación falla.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::NaiveDate;
use dashmap::DashMap;
use log::{debug, info, warn};
use uuid::Uuid;

use care_domain::{Benefit, BenefitType, DateField, EventCatalog, EventSubmission, Participant, ParticipantNote,
                  Phase, ProgressEvent, ValidationError};

use crate::clock::Clock;
use crate::constants::{COMMIT_ATTEMPTS, EXITED_EVENT_TYPE};
use crate::engine::EngineBuilder;
use crate::errors::{CareError, StoreError};
use crate::flow::{derive_status, evaluate, validate_against, FlowRequirements};
use crate::ledger::{benefit_report, participant_totals, BenefitReport, ParticipantTotals};
use crate::store::{CareStore, Changeset, EventQuery, Expectation, InMemoryCareStore, PlaceholderPurge};

pub struct CareEngine<S: CareStore> {
    store: S,
    catalog: EventCatalog,
    clock: Arc<dyn Clock>,
    allow_future_dates: bool,
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl CareEngine<InMemoryCareStore> {
    /// Builder con store en memoria.
    #[inline]
    pub fn new() -> EngineBuilder<InMemoryCareStore> {
        EngineBuilder::new(InMemoryCareStore::new())
    }
}

impl<S: CareStore> CareEngine<S> {
    #[inline]
    pub fn builder(store: S) -> EngineBuilder<S> {
        EngineBuilder::new(store)
    }

    pub(crate) fn from_builder(builder: EngineBuilder<S>) -> Self {
        Self { store: builder.store,
               catalog: builder.catalog,
               clock: builder.clock,
               allow_future_dates: builder.allow_future_dates,
               locks: DashMap::new() }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Devuelve el store (p. ej. para reabrirlo con otro reloj).
    pub fn into_store(self) -> S {
        self.store
    }

    pub fn catalog(&self) -> &EventCatalog {
        &self.catalog
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Ejecuta `op` con el lock del participante tomado, reintentando ante
    /// conflictos de escritura concurrente (otro proceso sobre el mismo store).
    ///
    /// La entrada de la tabla de locks se libera cuando nadie más la usa.
    fn with_participant<T>(&self, id: Uuid, op: impl FnMut() -> Result<T, CareError>) -> Result<T, CareError> {
        let lock = self.locks.entry(id).or_default().clone();
        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            retry_conflicts(id, op)
        };
        drop(lock);
        // `remove_if` toma el shard: nadie puede clonar el Arc mientras se mide.
        self.locks.remove_if(&id, |_, l| Arc::strong_count(l) == 1);
        result
    }

    /// Participantes con una escritura en curso en este proceso.
    pub fn active_locks(&self) -> usize {
        self.locks.len()
    }

    fn commit(&self, changeset: Changeset) -> Result<(), CareError> {
        let id = changeset.participant.id;
        self.store.commit(changeset).map_err(|e| match e {
                                        StoreError::Conflict => CareError::Conflict(id),
                                        StoreError::NotFound => CareError::ParticipantNotFound(id),
                                        other => other.into(),
                                    })
    }

    fn load_participant(&self, id: Uuid) -> Result<Participant, CareError> {
        self.store.participant(id)?.ok_or(CareError::ParticipantNotFound(id))
    }

    fn flow_events(&self, participant: &Participant) -> Result<Vec<ProgressEvent>, CareError> {
        Ok(self.store.events(participant.id, participant.current_program_flow, &EventQuery::all())?)
    }

    /// Deriva el estado sobre la proyección del ciclo y lo vuelca al changeset.
    fn apply_derivation(&self, changeset: &mut Changeset, projected: &[ProgressEvent]) {
        let derivation = derive_status(&self.catalog, &changeset.participant, projected, self.today());
        if derivation.status != changeset.participant.status {
            info!("status participant={} {} -> {}",
                  changeset.participant.id, changeset.participant.status, derivation.status);
        }
        changeset.participant.status = derivation.status;
        if let Some(marker) = derivation.synthesized {
            changeset.inserts.push(marker);
        }
    }

    pub fn participant(&self, id: Uuid) -> Result<Participant, CareError> {
        self.load_participant(id)
    }

    /// Inscribe a la persona; idempotente si ya estaba inscrita.
    pub fn enroll(&self, human_id: Uuid) -> Result<Participant, CareError> {
        self.with_participant(human_id, || {
                if let Some(existing) = self.store.participant(human_id)? {
                    return Ok(existing);
                }
                let participant = Participant::new(human_id);
                self.commit(Changeset::new(participant.clone(), Expectation::New))?;
                info!("enroll participant={human_id}");
                Ok(participant)
            })
    }

    /// Eventos (completos o no) del ciclo vigente.
    pub fn events(&self, participant_id: Uuid) -> Result<Vec<ProgressEvent>, CareError> {
        let participant = self.load_participant(participant_id)?;
        self.flow_events(&participant)
    }

    /// Requisitos para un participante aún no persistido.
    pub fn requirements_for_new(&self) -> FlowRequirements {
        evaluate(&self.catalog, &[])
    }

    pub fn get_requirements(&self, participant_id: Uuid) -> Result<FlowRequirements, CareError> {
        let participant = self.load_participant(participant_id)?;
        let history = self.store
                          .events(participant_id, participant.current_program_flow, &EventQuery::completed())?;
        Ok(evaluate(&self.catalog, &history))
    }

    /// Valida y persiste un lote; devuelve los eventos escritos.
    pub fn submit_events(&self, participant_id: Uuid, rows: &[EventSubmission]) -> Result<Vec<ProgressEvent>, CareError> {
        self.with_participant(participant_id, || self.try_submit(participant_id, rows))
    }

    fn try_submit(&self, participant_id: Uuid, rows: &[EventSubmission]) -> Result<Vec<ProgressEvent>, CareError> {
        let participant = self.load_participant(participant_id)?;
        let flow = participant.current_program_flow;
        let flow_events = self.flow_events(&participant)?;
        let history: Vec<ProgressEvent> = flow_events.iter().filter(|e| e.complete).cloned().collect();

        let today = self.today();
        for row in rows {
            row.check(today, self.allow_future_dates)?;
        }
        let requirements = evaluate(&self.catalog, &history);
        validate_against(&self.catalog, &requirements, &history, rows)?;
        debug!("submit_events:validated participant={participant_id} flow={flow} phase={} rows={}",
               requirements.phase,
               rows.len());

        let mut changeset = Changeset::existing(participant);
        let mut written = Vec::with_capacity(rows.len());
        for row in rows {
            let event = match row.event_id {
                Some(event_id) => {
                    let mut existing = match flow_events.iter().find(|e| e.id == event_id) {
                        Some(e) => e.clone(),
                        None => return Err(self.missing_event(event_id)?),
                    };
                    if existing.complete {
                        return Err(ValidationError::EventAlreadyComplete(event_id).into());
                    }
                    if existing.event_type != row.event_type {
                        return Err(ValidationError::InvalidEventType(row.event_type.clone()).into());
                    }
                    existing.apply_submission(row)?;
                    changeset.updates.push(existing.clone());
                    existing
                }
                None => {
                    let event = ProgressEvent::from_submission(participant_id, flow, requirements.phase, row)?;
                    changeset.inserts.push(event.clone());
                    event
                }
            };
            written.push(event);
        }

        let final_intake = self.catalog.final_intake_event();
        if rows.iter().any(|r| r.event_type == final_intake && r.completes()) {
            let purge = PlaceholderPurge { participant_id,
                                           program_flow: flow,
                                           event_types: self.catalog.intake_types().into_iter().map(String::from).collect() };
            written.retain(|e| !purge.matches(e));
            changeset.purge = Some(purge);
        }

        let projected = project(&flow_events, &changeset);
        self.apply_derivation(&mut changeset, &projected);
        self.commit(changeset)?;
        info!("submit_events:done participant={participant_id} flow={flow} written={}", written.len());
        Ok(written)
    }

    /// Distingue un evento inexistente de uno de otro participante/ciclo.
    fn missing_event(&self, event_id: Uuid) -> Result<CareError, CareError> {
        Ok(match self.store.event(event_id)? {
            Some(_) => ValidationError::ForeignEvent(event_id).into(),
            None => CareError::EventNotFound(event_id),
        })
    }

    /// Registro de una sola fila.
    pub fn record_event(&self, participant_id: Uuid, row: EventSubmission) -> Result<ProgressEvent, CareError> {
        self.submit_events(participant_id, std::slice::from_ref(&row))?
            .into_iter()
            .next()
            .ok_or_else(|| CareError::Store(format!("event {} was not written", row.event_type)))
    }

    /// Cambia la fecha agendada de un evento existente (`rescheduled_count` +1).
    pub fn reschedule_event(&self, event_id: Uuid, scheduled: Option<NaiveDate>) -> Result<ProgressEvent, CareError> {
        let participant_id = self.store.event(event_id)?.ok_or(CareError::EventNotFound(event_id))?.participant_id;
        self.with_participant(participant_id, || {
                let participant = self.load_participant(participant_id)?;
                let flow_events = self.flow_events(&participant)?;
                let mut event = self.store.event(event_id)?.ok_or(CareError::EventNotFound(event_id))?;

                if event.program_flow == participant.current_program_flow && !event.complete {
                    if let Some(date) = scheduled {
                        let history: Vec<ProgressEvent> = flow_events.iter().filter(|e| e.complete).cloned().collect();
                        if !evaluate(&self.catalog, &history).window.accepts(date) {
                            return Err(ValidationError::DateOutsideWindow(DateField::Scheduled).into());
                        }
                    }
                }
                event.reschedule(scheduled);

                let mut changeset = Changeset::existing(participant.clone());
                changeset.updates.push(event.clone());
                let projected = project(&flow_events, &changeset);
                self.apply_derivation(&mut changeset, &projected);
                self.commit(changeset)?;
                debug!("reschedule_event event={event_id} count={}", event.rescheduled_count);
                Ok(event)
            })
    }

    /// Re-deriva y persiste el estado del participante.
    pub fn save_participant(&self, participant_id: Uuid) -> Result<Participant, CareError> {
        self.with_participant(participant_id, || {
                let participant = self.load_participant(participant_id)?;
                let flow_events = self.flow_events(&participant)?;
                let mut changeset = Changeset::existing(participant.clone());
                self.apply_derivation(&mut changeset, &flow_events);
                let saved = changeset.participant.clone();
                self.commit(changeset)?;
                Ok(saved)
            })
    }

    /// Salida anticipada: cierra el ciclo vigente y abre uno vacío.
    pub fn exit_early(&self, participant_id: Uuid) -> Result<Participant, CareError> {
        self.with_participant(participant_id, || {
                let participant = self.load_participant(participant_id)?;
                if !participant.is_active() {
                    return Err(CareError::Precondition(format!("Participant {participant_id} is {}; only active participants can exit the program early.",
                                                               participant.status)));
                }
                let old_flow = participant.current_program_flow;
                let marker = ProgressEvent::marker(participant_id, old_flow, EXITED_EVENT_TYPE, Phase::Exited, self.today());

                let mut changeset = Changeset::existing(participant);
                changeset.participant.current_program_flow += 1;
                let new_flow_events = self.flow_events(&changeset.participant)?;
                changeset.inserts.push(marker);
                self.apply_derivation(&mut changeset, &new_flow_events);
                let saved = changeset.participant.clone();
                self.commit(changeset)?;
                info!("exit_early participant={participant_id} flow {old_flow} -> {}", saved.current_program_flow);
                Ok(saved)
            })
    }

    pub fn create_benefit_type(&self, name: &str, default_cost_cents: Option<i64>) -> Result<BenefitType, CareError> {
        let benefit_type = BenefitType::new(name, default_cost_cents);
        self.store.insert_benefit_type(&benefit_type)?;
        Ok(benefit_type)
    }

    /// Registra un beneficio; sin costo explícito usa el costo por defecto del tipo.
    pub fn record_benefit(&self,
                          participant_id: Uuid,
                          benefit_type_id: Uuid,
                          cost_cents: Option<i64>,
                          date: NaiveDate)
                          -> Result<Benefit, CareError> {
        self.load_participant(participant_id)?;
        let benefit_type = self.store
                               .benefit_type(benefit_type_id)?
                               .ok_or(CareError::BenefitTypeNotFound(benefit_type_id))?;
        let cost = cost_cents.or(benefit_type.default_cost_cents).ok_or_else(|| {
                       CareError::Precondition(format!("Benefit type {} has no default cost; a cost is required.",
                                                       benefit_type.name))
                   })?;
        let benefit = Benefit::new(participant_id, benefit_type_id, cost, date);
        self.store.insert_benefit(&benefit)?;
        Ok(benefit)
    }

    pub fn benefit_report(&self) -> Result<BenefitReport, CareError> {
        let types = self.store.benefit_types()?;
        let benefits = self.store.benefits(None)?;
        Ok(benefit_report(self.today(), &types, &benefits))
    }

    pub fn participant_benefit_totals(&self, participant_id: Uuid) -> Result<ParticipantTotals, CareError> {
        self.load_participant(participant_id)?;
        let benefits = self.store.benefits(Some(participant_id))?;
        Ok(participant_totals(self.today(), &benefits))
    }

    pub fn add_note(&self, participant_id: Uuid, added_by: Option<String>, text: &str) -> Result<ParticipantNote, CareError> {
        self.load_participant(participant_id)?;
        let note = ParticipantNote::new(participant_id, self.clock.now(), added_by, text);
        self.store.insert_note(&note)?;
        Ok(note)
    }

    /// Notas del participante, la más reciente primero.
    pub fn notes(&self, participant_id: Uuid) -> Result<Vec<ParticipantNote>, CareError> {
        self.load_participant(participant_id)?;
        Ok(self.store.notes(participant_id)?)
    }
}

fn retry_conflicts<T>(id: Uuid, mut op: impl FnMut() -> Result<T, CareError>) -> Result<T, CareError> {
    let mut attempt: u32 = 0;
    loop {
        match op() {
            Err(CareError::Conflict(_)) if attempt + 1 < COMMIT_ATTEMPTS => {
                attempt += 1;
                let delay_ms = 15 * u64::from(attempt);
                warn!("conflict participant={id} attempt={attempt} -> sleeping {delay_ms}ms");
                std::thread::sleep(Duration::from_millis(delay_ms));
            }
            r => return r,
        }
    }
}

/// Estado del ciclo tal como quedará tras aplicar el changeset.
fn project(flow_events: &[ProgressEvent], changeset: &Changeset) -> Vec<ProgressEvent> {
    let mut projected: Vec<ProgressEvent> =
        flow_events.iter()
                   .map(|e| changeset.updates.iter().find(|u| u.id == e.id).unwrap_or(e).clone())
                   .collect();
    projected.extend(changeset.inserts.iter().cloned());
    if let Some(purge) = &changeset.purge {
        projected.retain(|e| !purge.matches(e));
    }
    projected
}

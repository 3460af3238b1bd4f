//! Filas Diesel y su mapeo a tipos de dominio.
//!
//! Las filas `Queryable` siguen el orden de columnas de `schema.rs`.

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use care_domain::{Benefit, BenefitType, Participant, ParticipantNote, ParticipantStatus, Phase, ProgressEvent};

use crate::error::PersistenceError;
use crate::schema::{benefit_types, benefits, participant_notes, participants, progress_events};

fn flow_from_db(raw: i32) -> Result<u32, PersistenceError> {
    u32::try_from(raw).map_err(|_| PersistenceError::CorruptRow(format!("program flow {raw}")))
}

pub fn version_from_db(raw: i64) -> Result<u64, PersistenceError> {
    u64::try_from(raw).map_err(|_| PersistenceError::CorruptRow(format!("participant version {raw}")))
}

#[derive(Queryable, Debug)]
pub struct ParticipantRow {
    pub id: Uuid,
    pub status: String,
    pub current_program_flow: i32,
    pub created_at: DateTime<Utc>,
    pub version: i64,
}

impl ParticipantRow {
    pub fn into_domain(self) -> Result<Participant, PersistenceError> {
        let status: ParticipantStatus = self.status.parse().map_err(PersistenceError::CorruptRow)?;
        Ok(Participant { id: self.id,
                         status,
                         current_program_flow: flow_from_db(self.current_program_flow)?,
                         version: version_from_db(self.version)? })
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = participants)]
pub struct NewParticipantRow<'a> {
    pub id: Uuid,
    pub status: &'a str,
    pub current_program_flow: i32,
    pub version: i64,
}

impl<'a> From<&'a Participant> for NewParticipantRow<'a> {
    fn from(p: &'a Participant) -> Self {
        Self { id: p.id,
               status: p.status.as_str(),
               current_program_flow: p.current_program_flow as i32,
               version: 0 }
    }
}

/// Fila de `progress_events`; `seq` da el orden de inserción.
#[derive(Queryable, Debug)]
pub struct EventRow {
    pub id: Uuid,
    pub seq: i64,
    pub participant_id: Uuid,
    pub program_flow: i32,
    pub event_type: String,
    pub phase: String,
    pub scheduled: Option<NaiveDate>,
    pub occurred: Option<NaiveDate>,
    pub excused: Option<NaiveDate>,
    pub note: String,
    pub complete: bool,
    pub rescheduled_count: i32,
}

impl EventRow {
    pub fn into_domain(self) -> Result<ProgressEvent, PersistenceError> {
        let phase: Phase = self.phase.parse().map_err(PersistenceError::CorruptRow)?;
        let rescheduled_count = u32::try_from(self.rescheduled_count)
            .map_err(|_| PersistenceError::CorruptRow(format!("rescheduled_count {}", self.rescheduled_count)))?;
        Ok(ProgressEvent { id: self.id,
                           participant_id: self.participant_id,
                           program_flow: flow_from_db(self.program_flow)?,
                           event_type: self.event_type,
                           phase,
                           scheduled: self.scheduled,
                           occurred: self.occurred,
                           excused: self.excused,
                           note: self.note,
                           complete: self.complete,
                           rescheduled_count })
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = progress_events)]
pub struct NewEventRow<'a> {
    pub id: Uuid,
    pub participant_id: Uuid,
    pub program_flow: i32,
    pub event_type: &'a str,
    pub phase: &'a str,
    pub scheduled: Option<NaiveDate>,
    pub occurred: Option<NaiveDate>,
    pub excused: Option<NaiveDate>,
    pub note: &'a str,
    pub complete: bool,
    pub rescheduled_count: i32,
}

impl<'a> From<&'a ProgressEvent> for NewEventRow<'a> {
    fn from(ev: &'a ProgressEvent) -> Self {
        Self { id: ev.id,
               participant_id: ev.participant_id,
               program_flow: ev.program_flow as i32,
               event_type: &ev.event_type,
               phase: ev.phase.as_str(),
               scheduled: ev.scheduled,
               occurred: ev.occurred,
               excused: ev.excused,
               note: &ev.note,
               complete: ev.complete,
               rescheduled_count: ev.rescheduled_count as i32 }
    }
}

/// Reescritura completa de un evento existente (las fechas `None` se guardan como NULL).
#[derive(AsChangeset, Debug)]
#[diesel(table_name = progress_events, treat_none_as_null = true)]
pub struct EventChanges<'a> {
    pub event_type: &'a str,
    pub phase: &'a str,
    pub scheduled: Option<NaiveDate>,
    pub occurred: Option<NaiveDate>,
    pub excused: Option<NaiveDate>,
    pub note: &'a str,
    pub complete: bool,
    pub rescheduled_count: i32,
}

impl<'a> From<&'a ProgressEvent> for EventChanges<'a> {
    fn from(ev: &'a ProgressEvent) -> Self {
        Self { event_type: &ev.event_type,
               phase: ev.phase.as_str(),
               scheduled: ev.scheduled,
               occurred: ev.occurred,
               excused: ev.excused,
               note: &ev.note,
               complete: ev.complete,
               rescheduled_count: ev.rescheduled_count as i32 }
    }
}

#[derive(Queryable, Insertable, Debug)]
#[diesel(table_name = benefit_types)]
pub struct BenefitTypeRow {
    pub id: Uuid,
    pub name: String,
    pub default_cost_cents: Option<i64>,
}

impl From<BenefitTypeRow> for BenefitType {
    fn from(row: BenefitTypeRow) -> Self {
        Self { id: row.id,
               name: row.name,
               default_cost_cents: row.default_cost_cents }
    }
}

impl From<&BenefitType> for BenefitTypeRow {
    fn from(bt: &BenefitType) -> Self {
        Self { id: bt.id,
               name: bt.name.clone(),
               default_cost_cents: bt.default_cost_cents }
    }
}

#[derive(Queryable, Insertable, Debug)]
#[diesel(table_name = benefits)]
pub struct BenefitRow {
    pub id: Uuid,
    pub participant_id: Uuid,
    pub benefit_type_id: Uuid,
    pub cost_cents: i64,
    pub date: NaiveDate,
}

impl From<BenefitRow> for Benefit {
    fn from(row: BenefitRow) -> Self {
        Self { id: row.id,
               participant_id: row.participant_id,
               benefit_type_id: row.benefit_type_id,
               cost_cents: row.cost_cents,
               date: row.date }
    }
}

impl From<&Benefit> for BenefitRow {
    fn from(b: &Benefit) -> Self {
        Self { id: b.id,
               participant_id: b.participant_id,
               benefit_type_id: b.benefit_type_id,
               cost_cents: b.cost_cents,
               date: b.date }
    }
}

#[derive(Queryable, Insertable, Debug)]
#[diesel(table_name = participant_notes)]
pub struct NoteRow {
    pub id: Uuid,
    pub participant_id: Uuid,
    pub created: DateTime<Utc>,
    pub added_by: Option<String>,
    pub note: String,
}

impl From<NoteRow> for ParticipantNote {
    fn from(row: NoteRow) -> Self {
        Self { id: row.id,
               participant_id: row.participant_id,
               created: row.created,
               added_by: row.added_by,
               note: row.note }
    }
}

impl From<&ParticipantNote> for NoteRow {
    fn from(n: &ParticipantNote) -> Self {
        Self { id: n.id,
               participant_id: n.participant_id,
               created: n.created,
               added_by: n.added_by.clone(),
               note: n.note.clone() }
    }
}

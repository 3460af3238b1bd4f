//! Implementación Postgres (Diesel) de los contratos de almacenamiento.
//!
//! - Lecturas con reintento ante fallos transitorios de conexión.
//! - `commit` aplica el `Changeset` en una sola transacción read-write:
//!   bloquea la fila del participante (`FOR UPDATE`), verifica la
//!   `Expectation` (ciclo + `version`) y recién entonces escribe, subiendo
//!   la versión. Si el chequeo falla devuelve
//!   `StoreError::Conflict` sin tocar nada; el motor relee y reintenta.
//! - El orden de los eventos de un ciclo es el de `seq` (BIGSERIAL), igual
//!   que el orden de inserción del backend en memoria.

mod rows;

use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager};
use log::{debug, error, warn};
use uuid::Uuid;

use care_core::{CareStore, Changeset, EventQuery, EventStore, Expectation, LedgerStore, ParticipantStore, StoreError};
use care_domain::{Benefit, BenefitType, Participant, ParticipantNote, ProgressEvent};

use crate::error::PersistenceError;
use crate::migrations::run_pending_migrations;
use crate::schema::{benefit_types, benefits, participant_notes, participants, progress_events};

pub use rows::{version_from_db, BenefitRow, BenefitTypeRow, EventChanges, EventRow, NewEventRow, NewParticipantRow,
               NoteRow, ParticipantRow};

/// Pool r2d2 de conexiones Postgres.
pub type PgPool = r2d2::Pool<ConnectionManager<PgConnection>>;

/// Proveedor abstracto de conexiones (pool real en producción y tests de
/// integración).
pub trait ConnectionProvider: Send + Sync + 'static {
    fn connection(&self) -> Result<r2d2::PooledConnection<ConnectionManager<PgConnection>>, PersistenceError>;
}

pub struct PoolProvider {
    pub pool: PgPool,
}

impl ConnectionProvider for PoolProvider {
    fn connection(&self) -> Result<r2d2::PooledConnection<ConnectionManager<PgConnection>>, PersistenceError> {
        self.pool
            .get()
            .map_err(|e| PersistenceError::TransientIo(format!("pool error: {e}")))
    }
}

/// Errores transitorios que vale la pena reintentar con backoff.
///
/// `StaleWrite` no entra: lo resuelve el motor releyendo el historial.
fn is_retryable(e: &PersistenceError) -> bool {
    match e {
        PersistenceError::SerializationConflict => true,
        PersistenceError::TransientIo(_) => true,
        PersistenceError::Unknown(msg) => {
            let m = msg.to_lowercase();
            m.contains("deadlock detected")
            || m.contains("could not serialize access due to concurrent update")
            || m.contains("terminating connection due to administrator command")
            || m.contains("connection closed")
            || m.contains("connection refused")
            || m.contains("timeout")
        }
        _ => false,
    }
}

/// Retry simple con backoff lineal (15ms, 30ms, 45ms; hasta 3 reintentos).
fn with_retry<F, T>(mut f: F) -> Result<T, PersistenceError>
    where F: FnMut() -> Result<T, PersistenceError>
{
    let mut attempts = 0;
    loop {
        match f() {
            Err(e) if is_retryable(&e) && attempts < 3 => {
                let delay_ms = 15 * ((attempts + 1) as u64);
                warn!("retryable error (attempt {}): {:?} -> sleeping {}ms", attempts + 1, e, delay_ms);
                std::thread::sleep(std::time::Duration::from_millis(delay_ms));
                attempts += 1;
            }
            r => return r,
        }
    }
}

pub struct PgCareStore<P: ConnectionProvider> {
    pub provider: P,
}

impl<P: ConnectionProvider> PgCareStore<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Ejecuta `op` con una conexión del pool, con reintento.
    fn run<T>(&self, mut op: impl FnMut(&mut PgConnection) -> Result<T, PersistenceError>) -> Result<T, StoreError> {
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            op(&mut *conn)
        }).map_err(|e| {
              error!("pg store error: {e}");
              StoreError::from(e)
          })
    }
}

impl<P: ConnectionProvider> ParticipantStore for PgCareStore<P> {
    fn participant(&self, id: Uuid) -> Result<Option<Participant>, StoreError> {
        self.run(|conn| {
                participants::table.find(id)
                                   .first::<ParticipantRow>(conn)
                                   .optional()?
                                   .map(ParticipantRow::into_domain)
                                   .transpose()
            })
    }
}

impl<P: ConnectionProvider> EventStore for PgCareStore<P> {
    fn events(&self, participant_id: Uuid, program_flow: u32, query: &EventQuery) -> Result<Vec<ProgressEvent>, StoreError> {
        debug!("events:start participant={participant_id} flow={program_flow}");
        let events: Vec<ProgressEvent> = self.run(|conn| {
                             let mut q = progress_events::table.filter(progress_events::participant_id.eq(participant_id))
                                                               .filter(progress_events::program_flow.eq(program_flow as i32))
                                                               .order(progress_events::seq.asc())
                                                               .into_boxed();
                             if query.complete_only {
                                 q = q.filter(progress_events::complete.eq(true));
                             }
                             if let Some(types) = &query.event_types {
                                 q = q.filter(progress_events::event_type.eq_any(types.clone()));
                             }
                             let rows: Vec<EventRow> = q.load(conn)?;
                             rows.into_iter().map(EventRow::into_domain).collect()
                         })?;
        debug!("events:done participant={participant_id} flow={program_flow} count={}", events.len());
        Ok(events)
    }

    fn event(&self, id: Uuid) -> Result<Option<ProgressEvent>, StoreError> {
        self.run(|conn| {
                progress_events::table.find(id)
                                      .first::<EventRow>(conn)
                                      .optional()?
                                      .map(EventRow::into_domain)
                                      .transpose()
            })
    }
}

impl<P: ConnectionProvider> LedgerStore for PgCareStore<P> {
    fn benefit_types(&self) -> Result<Vec<BenefitType>, StoreError> {
        self.run(|conn| {
                let rows: Vec<BenefitTypeRow> = benefit_types::table.order(benefit_types::name.asc()).load(conn)?;
                Ok(rows.into_iter().map(BenefitType::from).collect())
            })
    }

    fn benefit_type(&self, id: Uuid) -> Result<Option<BenefitType>, StoreError> {
        self.run(|conn| {
                Ok(benefit_types::table.find(id)
                                       .first::<BenefitTypeRow>(conn)
                                       .optional()?
                                       .map(BenefitType::from))
            })
    }

    fn insert_benefit_type(&self, benefit_type: &BenefitType) -> Result<(), StoreError> {
        self.run(|conn| {
                diesel::insert_into(benefit_types::table).values(BenefitTypeRow::from(benefit_type))
                                                         .execute(conn)?;
                Ok(())
            })
    }

    fn insert_benefit(&self, benefit: &Benefit) -> Result<(), StoreError> {
        self.run(|conn| {
                diesel::insert_into(benefits::table).values(BenefitRow::from(benefit)).execute(conn)?;
                Ok(())
            })
    }

    fn benefits(&self, participant_id: Option<Uuid>) -> Result<Vec<Benefit>, StoreError> {
        self.run(|conn| {
                let mut q = benefits::table.order((benefits::date.asc(), benefits::id.asc())).into_boxed();
                if let Some(pid) = participant_id {
                    q = q.filter(benefits::participant_id.eq(pid));
                }
                let rows: Vec<BenefitRow> = q.load(conn)?;
                Ok(rows.into_iter().map(Benefit::from).collect())
            })
    }

    fn insert_note(&self, note: &ParticipantNote) -> Result<(), StoreError> {
        self.run(|conn| {
                diesel::insert_into(participant_notes::table).values(NoteRow::from(note)).execute(conn)?;
                Ok(())
            })
    }

    fn notes(&self, participant_id: Uuid) -> Result<Vec<ParticipantNote>, StoreError> {
        self.run(|conn| {
                let rows: Vec<NoteRow> = participant_notes::table.filter(participant_notes::participant_id.eq(participant_id))
                                                                 .order(participant_notes::created.desc())
                                                                 .load(conn)?;
                Ok(rows.into_iter().map(ParticipantNote::from).collect())
            })
    }
}

impl<P: ConnectionProvider> CareStore for PgCareStore<P> {
    fn commit(&self, changeset: Changeset) -> Result<(), StoreError> {
        let pid = changeset.participant.id;
        debug!("commit:start participant={pid} inserts={} updates={} purge={}",
               changeset.inserts.len(),
               changeset.updates.len(),
               changeset.purge.is_some());
        let result = with_retry(|| {
            let mut conn = self.provider.connection()?;
            conn.build_transaction().read_write().run(|tx| apply_changeset(tx, &changeset))
        });
        match result {
            Ok(()) => {
                debug!("commit:done participant={pid}");
                Ok(())
            }
            Err(PersistenceError::StaleWrite) => {
                warn!("commit:stale participant={pid}");
                Err(StoreError::Conflict)
            }
            Err(e) => {
                error!("commit:error participant={pid} err={e}");
                Err(e.into())
            }
        }
    }
}

/// Cuerpo transaccional de `commit`; cualquier `Err` revierte todo.
fn apply_changeset(tx: &mut PgConnection, changeset: &Changeset) -> Result<(), PersistenceError> {
    let participant = &changeset.participant;
    let pid = participant.id;

    match changeset.expectation {
        Expectation::New => {
            let inserted = diesel::insert_into(participants::table).values(NewParticipantRow::from(participant))
                                                                    .on_conflict_do_nothing()
                                                                    .execute(tx)?;
            if inserted == 0 {
                return Err(PersistenceError::StaleWrite);
            }
        }
        Expectation::Existing { program_flow: expected_flow,
                                version: expected_version, } => {
            let (stored_flow, stored_version): (i32, i64) =
                participants::table.find(pid)
                                   .select((participants::current_program_flow, participants::version))
                                   .for_update()
                                   .get_result(tx)
                                   .optional()?
                                   .ok_or(PersistenceError::NotFound)?;
            if stored_flow != expected_flow as i32 || version_from_db(stored_version)? != expected_version {
                return Err(PersistenceError::StaleWrite);
            }
        }
    }

    for updated in &changeset.updates {
        let touched = diesel::update(progress_events::table.find(updated.id)).set(EventChanges::from(updated))
                                                                            .execute(tx)?;
        if touched == 0 {
            return Err(PersistenceError::NotFound);
        }
    }

    if !changeset.inserts.is_empty() {
        let rows: Vec<NewEventRow> = changeset.inserts.iter().map(NewEventRow::from).collect();
        diesel::insert_into(progress_events::table).values(&rows).execute(tx)?;
    }

    if let Some(purge) = &changeset.purge {
        let removed = diesel::delete(progress_events::table.filter(progress_events::participant_id.eq(purge.participant_id))
                                                           .filter(progress_events::program_flow.eq(purge.program_flow as i32))
                                                           .filter(progress_events::complete.eq(false))
                                                           .filter(progress_events::event_type.eq_any(purge.event_types.clone())))
                          .execute(tx)?;
        debug!("commit:purge participant={pid} removed={removed}");
    }

    if let Expectation::Existing { version, .. } = changeset.expectation {
        diesel::update(participants::table.find(pid))
            .set((participants::status.eq(participant.status.as_str()),
                  participants::current_program_flow.eq(participant.current_program_flow as i32),
                  participants::version.eq((version + 1) as i64)))
            .execute(tx)?;
    }
    Ok(())
}

/// Construye un pool r2d2 y corre las migraciones pendientes.
///
/// Si `min_size > max_size` se usa `min_size = max_size`.
pub fn build_pool(database_url: &str, min_size: u32, max_size: u32) -> Result<PgPool, PersistenceError> {
    let validated_min = if min_size == 0 { 1 } else { min_size };
    let validated_max = if max_size == 0 { 1 } else { max_size };
    if validated_min > validated_max {
        warn!("min_size > max_size ({validated_min} > {validated_max}), ajustando min=max");
    }
    let final_min = validated_min.min(validated_max);
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = r2d2::Pool::builder().min_idle(Some(final_min))
                                    .max_size(validated_max)
                                    .build(manager)
                                    .map_err(|e| PersistenceError::TransientIo(format!("pool build: {e}")))?;
    {
        let mut conn = pool.get()
                           .map_err(|e| PersistenceError::TransientIo(format!("pool get for migrations: {e}")))?;
        run_pending_migrations(&mut conn)?;
    }
    Ok(pool)
}

/// Helper de desarrollo: carga `.env`, lee `DbConfig` y construye un pool ya
/// migrado.
pub fn build_dev_pool_from_env() -> Result<PgPool, PersistenceError> {
    crate::config::init_dotenv();
    let cfg = crate::config::DbConfig::from_env()?;
    build_pool(&cfg.url, cfg.min_connections, cfg.max_connections)
}

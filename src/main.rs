//! Demo de punta a punta: inscribe a una participante y la lleva por intake,
//! programa y release con el catálogo configurado.
//!
//! Por defecto corre en memoria; con `--features pg_demo` usa `DATABASE_URL`.

use chrono::{Datelike, Months, NaiveDate};
use log::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use extracare::core::{CareStore, DateWindow};
use extracare::{AppError, CareEngine, EngineConfig, EventSubmission, FixedClock, Phase};

fn date(y: i32, m: u32, d: u32) -> Result<NaiveDate, AppError> {
    NaiveDate::from_ymd_opt(y, m, d).ok_or_else(|| AppError::Config(format!("invalid date {y}-{m}-{d}")))
}

/// Envía, fase por fase, lo que pidan los requisitos hasta completar el ciclo.
fn run_demo<S: CareStore>(engine: &CareEngine<S>) -> Result<(), AppError> {
    let id = engine.enroll(Uuid::new_v4())?.id;
    info!("demo: enrolled participant={id}");
    engine.add_note(id, Some("Demo".into()), "Referred by county outreach")?;

    let intake_day = date(2024, 1, 3)?;
    let intake: Vec<EventSubmission> = engine.get_requirements(id)?
                                             .remaining
                                             .iter()
                                             .map(|t| EventSubmission::new(t).occurred(intake_day))
                                             .collect();
    engine.submit_events(id, &intake)?;

    let release_day = intake_day.checked_add_months(Months::new(engine.catalog().program_months))
                                .unwrap_or(intake_day);
    loop {
        let req = engine.get_requirements(id)?;
        if req.remaining.is_empty() {
            break;
        }
        let day = match req.window {
            DateWindow::Month { start, .. } => start.with_day(10).unwrap_or(start),
            DateWindow::Unrestricted => release_day,
        };
        let rows: Vec<EventSubmission> = req.remaining.iter().map(|t| EventSubmission::new(t).occurred(day)).collect();
        engine.submit_events(id, &rows)?;
        info!("demo: phase={} month={:?} submitted={}", req.phase, req.program_month, rows.len());
        if req.phase == Phase::Release {
            break;
        }
    }

    let participant = engine.save_participant(id)?;
    println!("participant {} -> {}", participant.id, participant.status);
    for ev in engine.events(id)? {
        println!("  {:<28} {:<10} {:?}", ev.event_type, ev.phase.as_str(), ev.effective_date());
    }
    for note in engine.notes(id)? {
        println!("  note: {note}: {}", note.note);
    }
    Ok(())
}

fn main() -> Result<(), AppError> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
                             .init();

    let config = EngineConfig::from_env();
    // Reloj fijo para que las fechas históricas de la demo sean válidas.
    let clock = FixedClock::at_date(date(2024, 12, 1)?);

    #[cfg(feature = "pg_demo")]
    {
        use extracare::persistence::{build_dev_pool_from_env, PgCareStore, PoolProvider};
        let pool = build_dev_pool_from_env()?;
        let engine = CareEngine::builder(PgCareStore::new(PoolProvider { pool })).config(&config)?
                                                                                 .clock(clock)
                                                                                 .build();
        run_demo(&engine)
    }
    #[cfg(not(feature = "pg_demo"))]
    {
        let engine = CareEngine::new().config(&config)?.clock(clock).build();
        run_demo(&engine)
    }
}

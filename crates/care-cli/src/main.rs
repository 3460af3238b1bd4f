//! CLI de operación de Extra Care contra Postgres (`DATABASE_URL`).
//!
//! Salida en JSON por stdout; errores por stderr. Códigos de salida:
//! 0 ok, 2 uso/configuración, 3 validación, 4 no encontrado o estado no
//! permitido, 5 backend.

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use log::debug;
use serde::Serialize;
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use care_core::{CareEngine, CareError, EngineConfig};
use care_domain::EventSubmission;
use care_persistence::{build_dev_pool_from_env, PersistenceError, PgCareStore, PoolProvider};

#[derive(Parser)]
#[command(name = "extracare", version, about = "Extra Care program-flow operations")]
struct Cli {
    /// Accept dates after tomorrow (seeding test data)
    #[arg(long, global = true)]
    allow_future_dates: bool,

    /// Event catalog JSON (overrides EXTRACARE_CATALOG)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the active event catalog
    Catalog,
    /// Enroll a person (idempotent)
    Enroll {
        #[arg(long)]
        participant: Uuid,
    },
    /// Show the participant record
    Show {
        #[arg(long)]
        participant: Uuid,
    },
    /// What the participant still needs in the current phase
    Requirements {
        #[arg(long)]
        participant: Uuid,
    },
    /// Events of the current program flow
    Events {
        #[arg(long)]
        participant: Uuid,
    },
    /// Submit a batch of rows from a JSON array ("-" reads stdin)
    Submit {
        #[arg(long)]
        participant: Uuid,
        #[arg(long)]
        file: PathBuf,
    },
    /// Record a single event row
    Record {
        #[arg(long)]
        participant: Uuid,
        #[arg(long = "type")]
        event_type: String,
        /// Complete an existing placeholder instead of creating a row
        #[arg(long)]
        event: Option<Uuid>,
        #[arg(long)]
        scheduled: Option<NaiveDate>,
        #[arg(long)]
        occurred: Option<NaiveDate>,
        #[arg(long)]
        excused: Option<NaiveDate>,
        #[arg(long, default_value = "")]
        note: String,
    },
    /// Move the scheduled date of an event (omit --scheduled to clear it)
    Reschedule {
        #[arg(long)]
        event: Uuid,
        #[arg(long)]
        scheduled: Option<NaiveDate>,
    },
    /// Re-derive and persist the participant status
    Save {
        #[arg(long)]
        participant: Uuid,
    },
    /// Close the current cycle early and open a fresh one
    ExitEarly {
        #[arg(long)]
        participant: Uuid,
    },
    /// Attach a follow-up note
    Note {
        #[arg(long)]
        participant: Uuid,
        #[arg(long)]
        text: String,
        #[arg(long)]
        by: Option<String>,
    },
    /// List notes, newest first
    Notes {
        #[arg(long)]
        participant: Uuid,
    },
    /// Create a benefit type
    BenefitType {
        #[arg(long)]
        name: String,
        /// Default cost in cents
        #[arg(long)]
        default_cost: Option<i64>,
    },
    /// Record a benefit given to a participant
    Benefit {
        #[arg(long)]
        participant: Uuid,
        #[arg(long = "type")]
        benefit_type: Uuid,
        /// Cost in cents (defaults to the type's cost)
        #[arg(long)]
        cost: Option<i64>,
        #[arg(long)]
        date: NaiveDate,
    },
    /// Benefits report (this month, this year, all time)
    Report,
    /// Benefit totals for one participant
    Totals {
        #[arg(long)]
        participant: Uuid,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Care(#[from] CareError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error("input: {0}")]
    Input(String),
    #[error("output: {0}")]
    Output(#[from] serde_json::Error),
}

impl CliError {
    fn exit_code(&self) -> u8 {
        match self {
            CliError::Care(CareError::Validation(_)) => 3,
            CliError::Care(CareError::ParticipantNotFound(_))
            | CliError::Care(CareError::EventNotFound(_))
            | CliError::Care(CareError::BenefitTypeNotFound(_))
            | CliError::Care(CareError::Precondition(_)) => 4,
            CliError::Care(CareError::Config(_)) | CliError::Persistence(PersistenceError::Config(_)) => 2,
            CliError::Input(_) => 2,
            CliError::Care(_) | CliError::Persistence(_) | CliError::Output(_) => 5,
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_rows(file: &PathBuf) -> Result<Vec<EventSubmission>, CliError> {
    let raw = if file.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)
                        .map_err(|e| CliError::Input(format!("stdin: {e}")))?;
        buf
    } else {
        std::fs::read_to_string(file).map_err(|e| CliError::Input(format!("{}: {e}", file.display())))?
    };
    serde_json::from_str(&raw).map_err(|e| CliError::Input(format!("rows: {e}")))
}

fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = EngineConfig::from_env();
    if cli.allow_future_dates {
        config.allow_future_dates = true;
    }
    if let Some(path) = cli.catalog {
        config.catalog_path = Some(path);
    }
    if let Command::Catalog = cli.command {
        return print_json(&config.load_catalog()?);
    }

    let pool = build_dev_pool_from_env()?;
    let engine = CareEngine::builder(PgCareStore::new(PoolProvider { pool })).config(&config)?
                                                                             .build();
    debug!("engine ready allow_future_dates={}", config.allow_future_dates);

    match cli.command {
        Command::Catalog => print_json(engine.catalog()),
        Command::Enroll { participant } => print_json(&engine.enroll(participant)?),
        Command::Show { participant } => print_json(&engine.participant(participant)?),
        Command::Requirements { participant } => print_json(&engine.get_requirements(participant)?),
        Command::Events { participant } => print_json(&engine.events(participant)?),
        Command::Submit { participant, file } => {
            let rows = read_rows(&file)?;
            print_json(&engine.submit_events(participant, &rows)?)
        }
        Command::Record { participant,
                          event_type,
                          event,
                          scheduled,
                          occurred,
                          excused,
                          note, } => {
            let row = EventSubmission { event_id: event,
                                        event_type,
                                        scheduled,
                                        occurred,
                                        excused,
                                        note };
            print_json(&engine.record_event(participant, row)?)
        }
        Command::Reschedule { event, scheduled } => print_json(&engine.reschedule_event(event, scheduled)?),
        Command::Save { participant } => print_json(&engine.save_participant(participant)?),
        Command::ExitEarly { participant } => print_json(&engine.exit_early(participant)?),
        Command::Note { participant, text, by } => print_json(&engine.add_note(participant, by, &text)?),
        Command::Notes { participant } => {
            for note in engine.notes(participant)? {
                println!("{note}\n  {}", note.note);
            }
            Ok(())
        }
        Command::BenefitType { name, default_cost } => print_json(&engine.create_benefit_type(&name, default_cost)?),
        Command::Benefit { participant,
                           benefit_type,
                           cost,
                           date, } => print_json(&engine.record_benefit(participant, benefit_type, cost, date)?),
        Command::Report => print_json(&engine.benefit_report()?),
        Command::Totals { participant } => print_json(&engine.participant_benefit_totals(participant)?),
    }
}

fn main() -> ExitCode {
    // Cargar .env si existe para obtener DATABASE_URL
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
                             .with_writer(std::io::stderr)
                             .init();
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("[extracare] {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

//! Derivación del estado del participante a partir del log del ciclo vigente.
use chrono::NaiveDate;
use log::debug;

use care_domain::{EventCatalog, Participant, ParticipantStatus, Phase, ProgressEvent};

use crate::constants::COMPLETED_EVENT_TYPE;

/// Estado derivado y, si corresponde, el marcador terminal a persistir.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusDerivation {
    pub status: ParticipantStatus,
    pub synthesized: Option<ProgressEvent>,
}

impl StatusDerivation {
    fn plain(status: ParticipantStatus) -> Self {
        Self { status, synthesized: None }
    }
}

/// Recalcula el estado; nunca falla.
///
/// `flow_events` son todos los eventos (completos o no) del
/// `current_program_flow` del participante. `today` sólo se usa si ningún
/// evento tiene fecha efectiva.
pub fn derive_status(catalog: &EventCatalog,
                     participant: &Participant,
                     flow_events: &[ProgressEvent],
                     today: NaiveDate)
                     -> StatusDerivation {
    if participant.status == ParticipantStatus::Complete {
        return StatusDerivation::plain(ParticipantStatus::Complete);
    }
    if flow_events.is_empty() {
        return StatusDerivation::plain(ParticipantStatus::Inactive);
    }

    let release_done = catalog.release_types()
                              .into_iter()
                              .all(|t| flow_events.iter().any(|e| e.complete && e.event_type == t));
    if !release_done {
        return StatusDerivation::plain(ParticipantStatus::Active);
    }

    if flow_events.iter().any(|e| e.event_type == COMPLETED_EVENT_TYPE) {
        return StatusDerivation::plain(ParticipantStatus::Complete);
    }

    let occurred = flow_events.iter().filter_map(|e| e.effective_date()).max().unwrap_or(today);
    debug!("derive_status:complete participant={} flow={} occurred={occurred}",
           participant.id, participant.current_program_flow);
    let marker = ProgressEvent::marker(participant.id,
                                       participant.current_program_flow,
                                       COMPLETED_EVENT_TYPE,
                                       Phase::Completed,
                                       occurred);
    StatusDerivation { status: ParticipantStatus::Complete,
                       synthesized: Some(marker) }
}

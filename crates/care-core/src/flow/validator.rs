//! Validador de lotes de eventos enviados por el operador.
//!
//! Fail-fast: devuelve el primer error encontrado, en orden de envío. No
//! modifica nada; si devuelve `Ok`, el lote puede persistirse.
use care_domain::{EventCatalog, EventSubmission, ProgressEvent, ValidationError};

use super::evaluator::{evaluate, FlowRequirements};

/// Evalúa el flujo una vez y valida el lote contra ese resultado.
pub fn validate(catalog: &EventCatalog,
                history: &[ProgressEvent],
                rows: &[EventSubmission])
                -> Result<(), ValidationError> {
    let requirements = evaluate(catalog, history);
    validate_against(catalog, &requirements, history, rows)
}

/// Igual que [`validate`] pero con requisitos ya evaluados por el llamador.
pub fn validate_against(catalog: &EventCatalog,
                        requirements: &FlowRequirements,
                        history: &[ProgressEvent],
                        rows: &[EventSubmission])
                        -> Result<(), ValidationError> {
    let final_intake = catalog.final_intake_event();
    let mut remaining = requirements.remaining.clone();

    for row in rows {
        // Cada fila consume una instancia: los duplicados por encima de lo
        // requerido se rechazan.
        if !remaining.remove_one(&row.event_type) {
            return Err(ValidationError::InvalidEventType(row.event_type.clone()));
        }

        for (field, date) in row.dates() {
            if !requirements.window.accepts(date) {
                return Err(ValidationError::DateOutsideWindow(field));
            }
        }

        if row.event_type == final_intake && row.completes() {
            check_intake_prerequisites(catalog, history, rows)?;
        }
    }
    Ok(())
}

/// Cada tipo de intake debe estar completo en el historial o venir completo
/// en este mismo lote.
fn check_intake_prerequisites(catalog: &EventCatalog,
                              history: &[ProgressEvent],
                              rows: &[EventSubmission])
                              -> Result<(), ValidationError> {
    for intake_type in catalog.intake_types() {
        let in_history = history.iter().any(|e| e.complete && e.event_type == intake_type);
        let in_batch = rows.iter().any(|r| r.event_type == intake_type && r.completes());
        if !in_history && !in_batch {
            return Err(ValidationError::IntakeIncomplete);
        }
    }
    Ok(())
}

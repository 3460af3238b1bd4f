//! Evaluador del flujo: historial completo del ciclo -> requisitos vigentes.
//!
//! Recorre las fases en orden (intake, program mes a mes, release) y se
//! detiene en la primera con requisitos pendientes. Es una lectura pura: no
//! escribe nada y nunca falla.
use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use care_domain::{EventCatalog, EventMultiset, Phase, ProgressEvent};

use crate::constants::PROGRAM_START_CUTOFF_DAY;

/// Ventana de fechas aceptables para los eventos de la fase vigente.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DateWindow {
    Unrestricted,
    /// Mes calendario, inclusivo en ambos extremos.
    Month { start: NaiveDate, end: NaiveDate },
}

impl DateWindow {
    pub fn accepts(&self, date: NaiveDate) -> bool {
        match self {
            DateWindow::Unrestricted => true,
            DateWindow::Month { start, end } => *start <= date && date <= *end,
        }
    }
}

/// Resultado de evaluar el flujo de un participante.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowRequirements {
    pub remaining: EventMultiset,
    pub phase: Phase,
    pub window: DateWindow,
    /// Mes del programa (1-based) cuando `phase == Program`.
    pub program_month: Option<u32>,
}

impl FlowRequirements {
    fn unrestricted(remaining: EventMultiset, phase: Phase) -> Self {
        Self { remaining,
               phase,
               window: DateWindow::Unrestricted,
               program_month: None }
    }
}

/// Evalúa los requisitos vigentes a partir de los eventos completos del ciclo.
///
/// Los eventos incompletos (placeholders) se ignoran aunque vengan en `history`.
pub fn evaluate(catalog: &EventCatalog, history: &[ProgressEvent]) -> FlowRequirements {
    let completed: Vec<&ProgressEvent> = history.iter().filter(|e| e.complete).collect();

    // Intake: orden libre, pero el evento final debe ser el último.
    let final_intake = catalog.final_intake_event();
    let mut intake = catalog.intake_required();
    for ev in &completed {
        intake.remove_one(&ev.event_type);
    }
    if intake.contains(final_intake) {
        return FlowRequirements::unrestricted(intake, Phase::Intake);
    }

    let final_intake_date = completed.iter()
                                     .filter(|e| e.event_type == final_intake)
                                     .filter_map(|e| e.effective_date())
                                     .max();
    let Some(final_intake_date) = final_intake_date else {
        return FlowRequirements::unrestricted(intake, Phase::Intake);
    };

    // Program: cada mes debe cerrarse completo antes de abrir el siguiente.
    let start = program_start(final_intake_date);
    for offset in 0..catalog.program_months {
        let Some((month_start, month_end)) = month_bounds(start, offset) else {
            break;
        };
        let mut required = catalog.program_required();
        for ev in &completed {
            if matches!(ev.effective_date(), Some(d) if month_start <= d && d <= month_end) {
                required.remove_one(&ev.event_type);
            }
        }
        if !required.is_empty() {
            return FlowRequirements { remaining: required,
                                      phase: Phase::Program,
                                      window: DateWindow::Month { start: month_start,
                                                                  end: month_end },
                                      program_month: Some(offset + 1) };
        }
    }

    // Release: orden libre; vacío significa ciclo listo para completarse.
    let mut release = catalog.release_required();
    for ev in &completed {
        release.remove_one(&ev.event_type);
    }
    FlowRequirements::unrestricted(release, Phase::Release)
}

/// Primer día del primer mes del programa.
pub fn program_start(final_intake_date: NaiveDate) -> NaiveDate {
    let first = first_of_month(final_intake_date);
    if final_intake_date.day() <= PROGRAM_START_CUTOFF_DAY {
        first
    } else {
        first.checked_add_months(Months::new(1)).unwrap_or(first)
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// `(primer día, último día)` del mes `offset` contado desde `start`.
fn month_bounds(start: NaiveDate, offset: u32) -> Option<(NaiveDate, NaiveDate)> {
    let month_start = start.checked_add_months(Months::new(offset))?;
    let month_end = month_start.checked_add_months(Months::new(1))?.pred_opt()?;
    Some((month_start, month_end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use care_domain::EventSubmission;
    use uuid::Uuid;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn catalog() -> EventCatalog {
        EventCatalog::from_pairs(&[("A", 1), ("B", 1), ("Z", 1)],
                                 &[("Check-in", 1)],
                                 &[("X", 1)],
                                 6).unwrap()
    }

    fn done(event_type: &str, date: NaiveDate) -> ProgressEvent {
        ProgressEvent::from_submission(Uuid::nil(), 1, Phase::Intake, &EventSubmission::new(event_type).occurred(date)).unwrap()
    }

    #[test]
    fn empty_history_starts_at_intake() {
        let req = evaluate(&catalog(), &[]);
        assert_eq!(req.phase, Phase::Intake);
        assert_eq!(req.remaining.into_vec(), vec!["A", "B", "Z"]);
        assert_eq!(req.window, DateWindow::Unrestricted);
    }

    #[test]
    fn placeholders_do_not_count_as_history() {
        let placeholder = ProgressEvent::from_submission(Uuid::nil(), 1, Phase::Intake, &EventSubmission::new("A").scheduled(d(2024, 3, 1))).unwrap();
        let req = evaluate(&catalog(), &[placeholder]);
        assert!(req.remaining.contains("A"));
    }

    #[test]
    fn program_start_cutoff_is_the_seventh() {
        assert_eq!(program_start(d(2024, 3, 7)), d(2024, 3, 1));
        assert_eq!(program_start(d(2024, 3, 8)), d(2024, 4, 1));
        assert_eq!(program_start(d(2024, 12, 20)), d(2025, 1, 1));
    }

    #[test]
    fn final_intake_on_the_seventh_opens_same_month() {
        let history = vec![done("A", d(2024, 3, 1)), done("B", d(2024, 3, 2)), done("Z", d(2024, 3, 7))];
        let req = evaluate(&catalog(), &history);
        assert_eq!(req.phase, Phase::Program);
        assert_eq!(req.program_month, Some(1));
        assert_eq!(req.window, DateWindow::Month { start: d(2024, 3, 1), end: d(2024, 3, 31) });
    }

    #[test]
    fn final_intake_on_the_eighth_opens_next_month() {
        let history = vec![done("A", d(2024, 3, 1)), done("B", d(2024, 3, 2)), done("Z", d(2024, 3, 8))];
        let req = evaluate(&catalog(), &history);
        assert_eq!(req.window, DateWindow::Month { start: d(2024, 4, 1), end: d(2024, 4, 30) });
    }

    #[test]
    fn month_window_is_inclusive_on_both_ends() {
        let window = DateWindow::Month { start: d(2024, 2, 1), end: d(2024, 2, 29) };
        assert!(window.accepts(d(2024, 2, 1)));
        assert!(window.accepts(d(2024, 2, 29)));
        assert!(!window.accepts(d(2024, 3, 1)));
        assert!(!window.accepts(d(2024, 1, 31)));
    }

    #[test]
    fn months_advance_only_when_satisfied_in_order() {
        let mut history = vec![done("A", d(2024, 3, 1)), done("B", d(2024, 3, 2)), done("Z", d(2024, 3, 3))];
        // April satisfied but March not: still in month 1
        history.push(done("Check-in", d(2024, 4, 10)));
        let req = evaluate(&catalog(), &history);
        assert_eq!(req.program_month, Some(1));
        history.push(done("Check-in", d(2024, 3, 20)));
        let req = evaluate(&catalog(), &history);
        // March and April both done -> May
        assert_eq!(req.program_month, Some(3));
        assert_eq!(req.window, DateWindow::Month { start: d(2024, 5, 1), end: d(2024, 5, 31) });
    }

    #[test]
    fn release_after_all_program_months() {
        let mut history = vec![done("A", d(2024, 3, 1)), done("B", d(2024, 3, 2)), done("Z", d(2024, 3, 3))];
        for m in 3..=8 {
            history.push(done("Check-in", d(2024, m, 15)));
        }
        let req = evaluate(&catalog(), &history);
        assert_eq!(req.phase, Phase::Release);
        assert_eq!(req.remaining.into_vec(), vec!["X"]);

        history.push(done("X", d(2024, 9, 2)));
        let req = evaluate(&catalog(), &history);
        assert_eq!(req.phase, Phase::Release);
        assert!(req.remaining.is_empty());
    }

    #[test]
    fn shorter_program_from_injected_catalog() {
        let short = EventCatalog::from_pairs(&[("Z", 1)], &[("Check-in", 1)], &[("X", 1)], 1).unwrap();
        let history = vec![done("Z", d(2024, 1, 2)), done("Check-in", d(2024, 1, 20))];
        assert_eq!(evaluate(&short, &history).phase, Phase::Release);
    }

    #[test]
    fn unknown_event_types_are_ignored() {
        let history = vec![done("Haircut", d(2024, 3, 1)), done("A", d(2024, 3, 1))];
        let req = evaluate(&catalog(), &history);
        assert_eq!(req.remaining.into_vec(), vec!["B", "Z"]);
    }
}

use chrono::NaiveDate;
use uuid::Uuid;

use extracare::core::DateWindow;
use extracare::{CareEngine, EventCatalog, EventSubmission, FixedClock, ParticipantStatus, Phase};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

#[test]
fn default_catalog_runs_a_full_six_month_cycle() {
    let engine = CareEngine::new().clock(FixedClock::at_date(d(2025, 1, 15))).build();
    assert_eq!(engine.catalog(), &EventCatalog::default());
    let id = engine.enroll(Uuid::new_v4()).unwrap().id;

    // intake cerrado el día 12: el programa empieza el mes siguiente
    let intake: Vec<EventSubmission> = engine.get_requirements(id)
                                             .unwrap()
                                             .remaining
                                             .iter()
                                             .map(|t| EventSubmission::new(t).occurred(d(2024, 3, 12)))
                                             .collect();
    assert_eq!(intake.len(), 4);
    engine.submit_events(id, &intake).unwrap();

    let mut months_seen = Vec::new();
    loop {
        let req = engine.get_requirements(id).unwrap();
        let DateWindow::Month { start, end } = req.window else { break };
        assert_eq!(req.phase, Phase::Program);
        months_seen.push(start);
        assert_eq!(req.remaining.count_of("Individual session"), 2);
        let rows: Vec<EventSubmission> = req.remaining.iter().map(|t| EventSubmission::new(t).occurred(end)).collect();
        engine.submit_events(id, &rows).unwrap();
    }
    assert_eq!(months_seen.first(), Some(&d(2024, 4, 1)));
    assert_eq!(months_seen.len(), 6);

    let release = engine.get_requirements(id).unwrap();
    assert_eq!(release.phase, Phase::Release);
    assert_eq!(release.remaining.into_vec(), vec!["Release assessment", "Exit interview"]);

    engine.submit_events(id,
                         &[EventSubmission::new("Release assessment").occurred(d(2024, 10, 3)),
                           EventSubmission::new("Exit interview").excused(d(2024, 10, 9))])
          .unwrap();
    let participant = engine.participant(id).unwrap();
    assert_eq!(participant.status, ParticipantStatus::Complete);
    assert_eq!(participant.current_program_flow, 1);
    // 4 intake + 18 programa + 2 release + marcador
    assert_eq!(engine.events(id).unwrap().len(), 25);
}

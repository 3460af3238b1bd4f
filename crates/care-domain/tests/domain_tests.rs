use care_domain::{format_cents, EventCatalog, EventSubmission, Participant, ParticipantStatus, Phase, ProgressEvent,
                  ValidationError};
use chrono::NaiveDate;
use serde_json::json;
use uuid::Uuid;

fn d(m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, m, day).unwrap()
}

#[test]
fn test_submission_rows_accept_sparse_json() {
    // Filas tal como llegan del formulario: solo las fechas presentes
    let rows: Vec<EventSubmission> = serde_json::from_value(json!([
        {"event_type": "Intake call", "occurred": "2024-03-01"},
        {"event_type": "Clinical assessment", "scheduled": "2024-03-09", "note": "bring ID"}
    ])).unwrap();
    assert_eq!(rows[0], EventSubmission::new("Intake call").occurred(d(3, 1)));
    assert!(rows[0].completes());
    assert!(!rows[1].completes());
    assert_eq!(rows[1].note, "bring ID");
    assert_eq!(rows[1].event_id, None);
}

#[test]
fn test_catalog_json_defaults_program_length() {
    let raw = json!({
        "intake": [{"event_type": "Call", "count": 1}, {"event_type": "Session", "count": 1}],
        "program": [{"event_type": "Check-in", "count": 2}],
        "release": [{"event_type": "Exit interview", "count": 1}]
    }).to_string();
    let catalog = EventCatalog::from_json(&raw).unwrap();
    assert_eq!(catalog.program_months, 6);
    assert_eq!(catalog.final_intake_event(), "Session");
    assert_eq!(catalog.program_required().count_of("Check-in"), 2);
}

#[test]
fn test_catalog_json_rejects_bad_shapes() {
    assert!(matches!(EventCatalog::from_json("{not json"), Err(ValidationError::Catalog(_))));
    let no_intake = json!({"intake": [], "program": [], "release": []}).to_string();
    assert!(matches!(EventCatalog::from_json(&no_intake), Err(ValidationError::Catalog(_))));
}

#[test]
fn test_event_wire_format_uses_lowercase_phase() {
    let p = Participant::new(Uuid::new_v4());
    let ev = ProgressEvent::from_submission(p.id, p.current_program_flow, Phase::Program,
                                            &EventSubmission::new("Check-in").excused(d(4, 2)))
        .unwrap();
    let value = serde_json::to_value(&ev).unwrap();
    assert_eq!(value["phase"], "program");
    assert_eq!(value["excused"], "2024-04-02");
    assert_eq!(value["complete"], true);
    let back: ProgressEvent = serde_json::from_value(value).unwrap();
    assert_eq!(back, ev);
}

#[test]
fn test_status_strings_parse_back() {
    for s in [ParticipantStatus::Inactive, ParticipantStatus::Active, ParticipantStatus::Complete] {
        assert_eq!(s.as_str().parse::<ParticipantStatus>().unwrap(), s);
    }
    assert!("paused".parse::<ParticipantStatus>().is_err());
}

#[test]
fn test_validation_messages_are_user_facing() {
    assert_eq!(ValidationError::IntakeIncomplete.to_string(),
               "Cannot complete intake until all phases are complete.");
    assert_eq!(ValidationError::InvalidEventType("Yoga".into()).to_string(), "Event type Yoga not valid here.");
}

#[test]
fn test_cents_formatting() {
    assert_eq!(format_cents(123456), "1234.56");
    assert_eq!(format_cents(-5), "-0.05");
}

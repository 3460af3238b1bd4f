use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::thread;

use care_core::{CareEngine, CareError, CareStore, Changeset, EventQuery, EventStore, Expectation, FixedClock,
                InMemoryCareStore, LedgerStore, ParticipantStore, StoreError};
use care_domain::{Benefit, BenefitType, EventCatalog, EventSubmission, Participant, ParticipantNote, Phase,
                  ProgressEvent};
use chrono::NaiveDate;
use uuid::Uuid;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn engine() -> CareEngine<InMemoryCareStore> {
    let catalog =
        EventCatalog::from_pairs(&[("A", 1), ("Z", 1)], &[("Check-in", 1)], &[("X", 1)], 6).unwrap();
    CareEngine::new().catalog(catalog).clock(FixedClock::at_date(d(2024, 10, 1))).build()
}

#[test]
fn concurrent_submissions_never_exceed_required_counts() {
    let engine = engine();
    let id = engine.enroll(Uuid::new_v4()).unwrap().id;
    engine.submit_events(id,
                         &[EventSubmission::new("A").occurred(d(2024, 3, 1)),
                           EventSubmission::new("Z").occurred(d(2024, 3, 2))])
          .unwrap();

    let results: Vec<Result<ProgressEvent, CareError>> = thread::scope(|s| {
        let handles: Vec<_> = (0..8).map(|i| {
                                        let engine = &engine;
                                        s.spawn(move || {
                                             engine.record_event(id,
                                                                 EventSubmission::new("Check-in").occurred(d(2024,
                                                                                                             3,
                                                                                                             10 + i)))
                                         })
                                    })
                                    .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results.iter()
                   .filter_map(|r| r.as_ref().err())
                   .all(|e| matches!(e, CareError::Validation(_))));

    let march = engine.events(id)
                      .unwrap()
                      .into_iter()
                      .filter(|e| e.event_type == "Check-in" && e.occurred.map_or(false, |o| o < d(2024, 4, 1)))
                      .count();
    assert_eq!(march, 1);
    assert_eq!(engine.active_locks(), 0);
}

#[test]
fn different_participants_do_not_block_each_other() {
    let engine = engine();
    let ids: Vec<Uuid> = (0..4).map(|_| engine.enroll(Uuid::new_v4()).unwrap().id).collect();
    thread::scope(|s| {
        for id in &ids {
            let engine = &engine;
            s.spawn(move || {
                 engine.record_event(*id, EventSubmission::new("A").occurred(d(2024, 3, 1))).unwrap();
             });
        }
    });
    for id in ids {
        assert_eq!(engine.events(id).unwrap().len(), 1);
    }
}

#[test]
fn stale_expectation_is_a_conflict_and_leaves_state_untouched() {
    let store = InMemoryCareStore::new();
    let p = Participant::new(Uuid::new_v4());
    store.commit(Changeset::new(p.clone(), Expectation::New)).unwrap();

    let mut first = Changeset::existing(p.clone());
    first.inserts.push(ProgressEvent::marker(p.id, 1, "A", Phase::Intake, d(2024, 3, 1)));
    store.commit(first).unwrap();
    assert_eq!(store.participant(p.id).unwrap().unwrap().version, 1);

    // escritor que leyó antes del primer commit
    let mut stale = Changeset::existing(p.clone());
    stale.inserts.push(ProgressEvent::marker(p.id, 1, "A", Phase::Intake, d(2024, 3, 2)));
    assert_eq!(store.commit(stale), Err(StoreError::Conflict));
    assert_eq!(store.events(p.id, 1, &EventQuery::all()).unwrap().len(), 1);

    assert_eq!(store.commit(Changeset::new(p.clone(), Expectation::New)), Err(StoreError::Conflict));
}

#[test]
fn commit_for_unknown_participant_is_not_found() {
    let store = InMemoryCareStore::new();
    let p = Participant::new(Uuid::new_v4());
    let cs = Changeset::existing(p.clone());
    assert_eq!(store.commit(cs), Err(StoreError::NotFound));
    assert_eq!(store.participant(p.id).unwrap(), None);
}

#[test]
fn updates_to_missing_rows_abort_the_whole_changeset() {
    let store = InMemoryCareStore::new();
    let p = Participant::new(Uuid::new_v4());
    store.commit(Changeset::new(p.clone(), Expectation::New)).unwrap();

    let mut cs = Changeset::existing(p.clone());
    cs.inserts.push(ProgressEvent::marker(p.id, 1, "A", Phase::Intake, d(2024, 3, 1)));
    cs.updates.push(ProgressEvent::marker(p.id, 1, "B", Phase::Intake, d(2024, 3, 1)));
    assert_eq!(store.commit(cs), Err(StoreError::NotFound));
    assert!(store.events(p.id, 1, &EventQuery::all()).unwrap().is_empty());
    assert_eq!(store.participant(p.id).unwrap().unwrap().version, 0);
}

/// Participante con dos placeholders de "Check-in" en marzo, leído tras crearlos.
fn participant_with_two_checkin_placeholders(store: &InMemoryCareStore) -> (Participant, Vec<ProgressEvent>) {
    let p = Participant::new(Uuid::new_v4());
    store.commit(Changeset::new(p.clone(), Expectation::New)).unwrap();
    let mut seed = Changeset::existing(p.clone());
    for day in [10, 20] {
        let row = EventSubmission::new("Check-in").scheduled(d(2024, 3, day));
        seed.inserts.push(ProgressEvent::from_submission(p.id, 1, Phase::Program, &row).unwrap());
    }
    store.commit(seed).unwrap();
    let snapshot = store.participant(p.id).unwrap().unwrap();
    let events = store.events(p.id, 1, &EventQuery::all()).unwrap();
    (snapshot, events)
}

#[test]
fn stale_update_with_same_event_count_is_a_conflict() {
    let store = InMemoryCareStore::new();
    let (snapshot, events) = participant_with_two_checkin_placeholders(&store);

    // dos escritores completan placeholders distintos desde la misma lectura
    let complete = |ev: &ProgressEvent| {
        let mut ev = ev.clone();
        ev.apply_submission(&EventSubmission::new("Check-in").occurred(d(2024, 3, 12))).unwrap();
        let mut cs = Changeset::existing(snapshot.clone());
        cs.updates.push(ev);
        cs
    };
    let first = complete(&events[0]);
    let second = complete(&events[1]);
    store.commit(first).unwrap();
    assert_eq!(store.commit(second), Err(StoreError::Conflict));

    let completed = store.events(snapshot.id, 1, &EventQuery::completed()).unwrap();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].id, events[0].id);
}

#[test]
fn stale_insert_plus_purge_is_a_conflict() {
    let store = InMemoryCareStore::new();
    let (snapshot, events) = participant_with_two_checkin_placeholders(&store);

    let mut first = Changeset::existing(snapshot.clone());
    first.updates.push(events[0].clone());
    store.commit(first).unwrap();

    // mismo número de eventos al final, pero sobre una lectura vieja
    let mut stale = Changeset::existing(snapshot.clone());
    stale.inserts.push(ProgressEvent::marker(snapshot.id, 1, "Check-in", Phase::Program, d(2024, 3, 5)));
    stale.purge = Some(care_core::PlaceholderPurge { participant_id: snapshot.id,
                                                     program_flow: 1,
                                                     event_types: vec!["Check-in".into()] });
    assert_eq!(store.commit(stale), Err(StoreError::Conflict));
    assert_eq!(store.events(snapshot.id, 1, &EventQuery::all()).unwrap(), events);
}

/// Store que responde `Conflict` a los primeros `conflicts` commits.
struct ContendedStore {
    inner: InMemoryCareStore,
    conflicts: AtomicU32,
    reads: AtomicUsize,
}

impl ContendedStore {
    fn new(conflicts: u32) -> Self {
        Self { inner: InMemoryCareStore::new(),
               conflicts: AtomicU32::new(conflicts),
               reads: AtomicUsize::new(0) }
    }
}

impl ParticipantStore for ContendedStore {
    fn participant(&self, id: Uuid) -> Result<Option<Participant>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.participant(id)
    }
}

impl EventStore for ContendedStore {
    fn events(&self, participant_id: Uuid, program_flow: u32, query: &EventQuery) -> Result<Vec<ProgressEvent>, StoreError> {
        self.inner.events(participant_id, program_flow, query)
    }

    fn event(&self, id: Uuid) -> Result<Option<ProgressEvent>, StoreError> {
        self.inner.event(id)
    }
}

impl LedgerStore for ContendedStore {
    fn benefit_types(&self) -> Result<Vec<BenefitType>, StoreError> {
        self.inner.benefit_types()
    }

    fn benefit_type(&self, id: Uuid) -> Result<Option<BenefitType>, StoreError> {
        self.inner.benefit_type(id)
    }

    fn insert_benefit_type(&self, benefit_type: &BenefitType) -> Result<(), StoreError> {
        self.inner.insert_benefit_type(benefit_type)
    }

    fn insert_benefit(&self, benefit: &Benefit) -> Result<(), StoreError> {
        self.inner.insert_benefit(benefit)
    }

    fn benefits(&self, participant_id: Option<Uuid>) -> Result<Vec<Benefit>, StoreError> {
        self.inner.benefits(participant_id)
    }

    fn insert_note(&self, note: &ParticipantNote) -> Result<(), StoreError> {
        self.inner.insert_note(note)
    }

    fn notes(&self, participant_id: Uuid) -> Result<Vec<ParticipantNote>, StoreError> {
        self.inner.notes(participant_id)
    }
}

impl CareStore for ContendedStore {
    fn commit(&self, changeset: Changeset) -> Result<(), StoreError> {
        if changeset.expectation != Expectation::New
           && self.conflicts.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1)).is_ok()
        {
            return Err(StoreError::Conflict);
        }
        self.inner.commit(changeset)
    }
}

fn contended_engine(conflicts: u32) -> (CareEngine<ContendedStore>, Uuid) {
    let catalog =
        EventCatalog::from_pairs(&[("A", 1), ("Z", 1)], &[("Check-in", 1)], &[("X", 1)], 6).unwrap();
    let engine = CareEngine::builder(ContendedStore::new(conflicts)).catalog(catalog)
                                                                    .clock(FixedClock::at_date(d(2024, 10, 1)))
                                                                    .build();
    let id = engine.enroll(Uuid::new_v4()).unwrap().id;
    engine.store().reads.store(0, Ordering::SeqCst);
    (engine, id)
}

#[test]
fn conflicts_are_retried_from_a_fresh_read() {
    let (engine, id) = contended_engine(2);
    let written = engine.record_event(id, EventSubmission::new("A").occurred(d(2024, 3, 1))).unwrap();
    assert_eq!(written.event_type, "A");
    // una lectura del participante por intento
    assert_eq!(engine.store().reads.load(Ordering::SeqCst), 3);
    assert_eq!(engine.events(id).unwrap().len(), 1);
    assert_eq!(engine.participant(id).unwrap().version, 1);
    assert_eq!(engine.active_locks(), 0);
}

#[test]
fn conflicts_past_the_attempt_limit_surface_to_the_caller() {
    let (engine, id) = contended_engine(3);
    let err = engine.record_event(id, EventSubmission::new("A").occurred(d(2024, 3, 1))).unwrap_err();
    assert!(matches!(err, CareError::Conflict(pid) if pid == id));
    assert_eq!(engine.store().reads.load(Ordering::SeqCst), 3);
    assert!(engine.events(id).unwrap().is_empty());
    assert_eq!(engine.active_locks(), 0);
}

#[test]
fn lock_table_does_not_grow_with_participants() {
    let engine = engine();
    for _ in 0..50 {
        let id = engine.enroll(Uuid::new_v4()).unwrap().id;
        engine.record_event(id, EventSubmission::new("A").occurred(d(2024, 3, 1))).unwrap();
    }
    assert_eq!(engine.active_locks(), 0);
}

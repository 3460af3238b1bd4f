//! Esquema Diesel (escrito a mano). Reemplazable con `diesel print-schema`.

diesel::table! {
    participants (id) {
        id -> Uuid,
        status -> Text,
        current_program_flow -> Int4,
        created_at -> Timestamptz,
        version -> Int8,
    }
}

diesel::table! {
    progress_events (id) {
        id -> Uuid,
        seq -> Int8,
        participant_id -> Uuid,
        program_flow -> Int4,
        event_type -> Text,
        phase -> Text,
        scheduled -> Nullable<Date>,
        occurred -> Nullable<Date>,
        excused -> Nullable<Date>,
        note -> Text,
        complete -> Bool,
        rescheduled_count -> Int4,
    }
}

diesel::table! {
    benefit_types (id) {
        id -> Uuid,
        name -> Text,
        default_cost_cents -> Nullable<Int8>,
    }
}

diesel::table! {
    benefits (id) {
        id -> Uuid,
        participant_id -> Uuid,
        benefit_type_id -> Uuid,
        cost_cents -> Int8,
        date -> Date,
    }
}

diesel::table! {
    participant_notes (id) {
        id -> Uuid,
        participant_id -> Uuid,
        created -> Timestamptz,
        added_by -> Nullable<Text>,
        note -> Text,
    }
}

diesel::joinable!(progress_events -> participants (participant_id));
diesel::joinable!(benefits -> participants (participant_id));
diesel::joinable!(benefits -> benefit_types (benefit_type_id));
diesel::joinable!(participant_notes -> participants (participant_id));

diesel::allow_tables_to_appear_in_same_query!(
    participants,
    progress_events,
    benefit_types,
    benefits,
    participant_notes,
);

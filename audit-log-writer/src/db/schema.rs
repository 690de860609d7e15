// audit trail, one row per recorded user action
diesel::table! {
    audit_event (id) {
        id -> Integer,
        event_code -> Varchar,
        source -> Varchar,
        user_id -> Nullable<Varchar>,
        study_id -> Nullable<Varchar>,
        site_id -> Nullable<Varchar>,
        app_id -> Nullable<Varchar>,
        participant_id -> Nullable<Varchar>,
        description -> Nullable<Text>,
        event_details -> Nullable<Jsonb>,
        occurred -> Timestamptz,
        created_at -> Timestamptz,
    }
}

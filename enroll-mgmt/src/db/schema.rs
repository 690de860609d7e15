
diesel::table! {
    study_info (id) {
        id -> Varchar,
        custom_id -> Varchar,
    }
}

// status is one of yetToEnroll, notEligible, inProgress, withdrawn
diesel::table! {
    participant_study_info (id) {
        id -> Varchar,
        study_info_id -> Varchar,
        participant_id -> Nullable<Varchar>,
        status -> Varchar,
        enrolled_time -> Nullable<Timestamptz>,
        withdrawal_time -> Nullable<Timestamptz>,
    }
}


// admin users of the participant manager
diesel::table! {
    ur_admin_user (id) {
        id -> Varchar,
        email -> Varchar,
        first_name -> Nullable<Varchar>,
        last_name -> Nullable<Varchar>,
        status -> Integer,
        super_admin -> Bool,
        location_permission -> Nullable<Integer>,
    }
}

diesel::table! {
    app_info (id) {
        id -> Varchar,
        custom_app_id -> Varchar,
        app_name -> Varchar,
    }
}

diesel::table! {
    study_info (id) {
        id -> Varchar,
        custom_id -> Varchar,
        name -> Varchar,
        app_info_id -> Nullable<Varchar>,
        study_type -> Varchar,
        created_time -> Timestamptz,
    }
}

diesel::table! {
    locations (id) {
        id -> Varchar,
        custom_id -> Varchar,
        name -> Varchar,
        description -> Nullable<Varchar>,
        status -> Integer,
        created_by -> Nullable<Varchar>,
        created_time -> Timestamptz,
    }
}

diesel::table! {
    sites (id) {
        id -> Varchar,
        study_id -> Varchar,
        location_id -> Nullable<Varchar>,
        status -> Integer,
        target_enrollment -> Nullable<Integer>,
        created_time -> Timestamptz,
    }
}

// edit is 0 for view only, 1 for edit
diesel::table! {
    sites_permissions (id) {
        id -> Varchar,
        ur_admin_user_id -> Varchar,
        site_id -> Varchar,
        study_id -> Varchar,
        app_info_id -> Nullable<Varchar>,
        edit -> Integer,
    }
}

diesel::table! {
    study_permissions (id) {
        id -> Varchar,
        ur_admin_user_id -> Varchar,
        study_id -> Varchar,
        app_info_id -> Nullable<Varchar>,
        edit -> Integer,
    }
}

// onboarding_status is one of N, I, E, D
diesel::table! {
    participant_registry_site (id) {
        id -> Varchar,
        site_id -> Varchar,
        study_info_id -> Varchar,
        email -> Varchar,
        onboarding_status -> Varchar,
        invitation_time -> Nullable<Timestamptz>,
        created_time -> Timestamptz,
    }
}

diesel::table! {
    participant_study_info (id) {
        id -> Varchar,
        participant_registry_site_id -> Nullable<Varchar>,
        study_info_id -> Varchar,
        site_id -> Nullable<Varchar>,
        participant_id -> Nullable<Varchar>,
        status -> Varchar,
        enrolled_time -> Nullable<Timestamptz>,
        withdrawal_time -> Nullable<Timestamptz>,
    }
}

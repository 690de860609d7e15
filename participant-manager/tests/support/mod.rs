#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;
use tower::ServiceExt;

use audit::InMemoryAuditSink;
use participant_manager::db::*;
use participant_manager::settings::ActiveUserSettings;
use participant_manager::{AppState, router};

pub const CONTEXT_PATH: &str = "/participant-manager-datastore";

pub const USER_ID: &str = "admin-1";
pub const APP_ID: &str = "app-1";
pub const STUDY_ID: &str = "study-1";
pub const SITE_ID: &str = "site-1";
pub const LOCATION_ID: &str = "location-1";

pub struct TestApp {
    pub store: Arc<InMemoryStore>,
    pub audit: Arc<InMemoryAuditSink>,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        TestApp::with(InMemoryStore::new(), InMemoryAuditSink::new())
    }

    pub fn with(store: InMemoryStore, audit: InMemoryAuditSink) -> Self {
        let store = Arc::new(store);
        let audit = Arc::new(audit);
        let state = AppState::new(store.clone(), audit.clone());
        let router = router(
            state,
            CONTEXT_PATH,
            &ActiveUserSettings::default().protected,
        )
        .unwrap();

        TestApp {
            store,
            audit,
            router,
        }
    }

    pub async fn get(&self, path: &str, user_id: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, path, user_id, None).await
    }

    pub async fn send(
        &self,
        method: Method,
        path: &str,
        user_id: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(format!("{}{}", CONTEXT_PATH, path));
        if let Some(user_id) = user_id {
            builder = builder.header("userId", user_id);
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }
}

pub fn at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, day, 9, 0, 0).unwrap()
}

pub fn ago(minutes: i64) -> DateTime<Utc> {
    Utc::now() - Duration::minutes(minutes)
}

pub fn add_user(store: &InMemoryStore, id: &str, super_admin: bool) -> AdminUser {
    let user = AdminUser {
        id: id.to_string(),
        email: format!("{}@example.org", id),
        first_name: Some("Site".to_string()),
        last_name: Some("Coordinator".to_string()),
        active: true,
        super_admin,
        location_permission: None,
    };
    store.save_user(&user).unwrap();
    user
}

pub fn add_app(store: &InMemoryStore, id: &str) -> App {
    let app = App {
        id: id.to_string(),
        custom_id: id.to_uppercase(),
        name: format!("App {}", id),
    };
    store.save_app(&app).unwrap();
    app
}

pub fn add_study(
    store: &InMemoryStore,
    id: &str,
    study_type: StudyType,
    created_at: DateTime<Utc>,
) -> Study {
    let study = Study {
        id: id.to_string(),
        custom_id: id.to_uppercase(),
        name: format!("Study {}", id),
        app_id: Some(APP_ID.to_string()),
        study_type,
        created_at,
    };
    store.save_study(&study).unwrap();
    study
}

pub fn add_location(store: &InMemoryStore, id: &str, name: &str) -> Location {
    let location = Location {
        id: id.to_string(),
        custom_id: id.to_uppercase(),
        name: name.to_string(),
        description: None,
        status: LocationStatus::Active,
        created_by: None,
        created_at: ago(60),
    };
    store.save_location(&location).unwrap();
    location
}

pub fn add_site(
    store: &InMemoryStore,
    id: &str,
    study_id: &str,
    location_id: Option<&str>,
    status: SiteStatus,
) -> Site {
    let site = Site {
        id: id.to_string(),
        study_id: study_id.to_string(),
        location_id: location_id.map(str::to_string),
        status,
        target_enrollment: Some(100),
        created_at: ago(30),
    };
    store.save_site(&site).unwrap();
    site
}

pub fn grant_site(store: &InMemoryStore, user_id: &str, site: &Site, edit: Permission) {
    store
        .save_site_permission(&SitePermission {
            id: format!("{}-{}", user_id, site.id),
            user_id: user_id.to_string(),
            site_id: site.id.clone(),
            study_id: site.study_id.clone(),
            app_id: Some(APP_ID.to_string()),
            edit,
        })
        .unwrap();
}

pub fn grant_study(store: &InMemoryStore, user_id: &str, study_id: &str, edit: Permission) {
    store
        .save_study_permission(&StudyPermission {
            id: format!("{}-{}", user_id, study_id),
            user_id: user_id.to_string(),
            study_id: study_id.to_string(),
            app_id: Some(APP_ID.to_string()),
            edit,
        })
        .unwrap();
}

pub fn add_registry_entry(
    store: &InMemoryStore,
    id: &str,
    site: &Site,
    email: &str,
    onboarding_status: OnboardingStatus,
    invited_day: Option<u32>,
) -> ParticipantRegistrySite {
    let entry = ParticipantRegistrySite {
        id: id.to_string(),
        site_id: site.id.clone(),
        study_id: site.study_id.clone(),
        email: email.to_string(),
        onboarding_status,
        invitation_date: invited_day.map(at),
        created_at: ago(10),
    };
    store.save_registry_entry(&entry).unwrap();
    entry
}

pub fn add_participant_study(
    store: &InMemoryStore,
    entry: &ParticipantRegistrySite,
    status: EnrollmentStatus,
) -> ParticipantStudy {
    let participant = ParticipantStudy {
        id: format!("ps-{}", entry.id),
        participant_registry_site_id: Some(entry.id.clone()),
        study_id: entry.study_id.clone(),
        site_id: Some(entry.site_id.clone()),
        participant_id: Some(format!("participant-{}", entry.id)),
        status,
        enrolled_date: None,
        withdrawal_date: None,
    };
    store.save_participant_study(&participant).unwrap();
    participant
}

/// One open study with one site at one location, and a non super admin
/// holding `edit` on that site.
pub fn seed(store: &InMemoryStore, edit: Permission) -> Site {
    add_user(store, USER_ID, false);
    add_app(store, APP_ID);
    add_study(store, STUDY_ID, StudyType::Open, ago(5));
    add_location(store, LOCATION_ID, "Boston General");
    let site = add_site(store, SITE_ID, STUDY_ID, Some(LOCATION_ID), SiteStatus::Active);
    grant_site(store, USER_ID, &site, edit);
    site
}

pub fn error_code(body: &Value) -> &str {
    body["error_code"].as_str().unwrap_or_default()
}

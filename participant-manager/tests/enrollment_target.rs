mod support;

use axum::http::{Method, StatusCode};
use serde_json::json;

use audit::{EventCode, InMemoryAuditSink};
use common::ErrorCode;
use participant_manager::db::*;

use support::*;

fn target_path(study_id: &str) -> String {
    format!("/studies/{}/enrollment-target", study_id)
}

async fn update(app: &TestApp, study_id: &str, user_id: &str, target: serde_json::Value) -> (StatusCode, serde_json::Value) {
    app.send(
        Method::PATCH,
        &target_path(study_id),
        Some(user_id),
        Some(json!({ "targetEnrollment": target })),
    )
    .await
}

#[tokio::test]
async fn updates_target_of_open_study_site() {
    let app = TestApp::new();
    seed(&app.store, Permission::Edit);

    let (status, body) = update(&app, STUDY_ID, USER_ID, json!(150)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["siteId"], SITE_ID);
    assert_eq!(body["message"], "Target enrollment updated successfully");
    let site = app.store.find_site(SITE_ID).unwrap().unwrap();
    assert_eq!(site.target_enrollment, Some(150));

    let events = app.audit.events_with_code(EventCode::EnrollmentTargetUpdated);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].user_id.as_deref(), Some(USER_ID));
    assert_eq!(events[0].study_id.as_deref(), Some(STUDY_ID));
    assert_eq!(events[0].site_id.as_deref(), Some(SITE_ID));
    assert_eq!(app.audit.events().len(), 1);
}

#[tokio::test]
async fn view_permission_is_denied() {
    let app = TestApp::new();
    seed(&app.store, Permission::View);

    let (status, body) = update(&app, STUDY_ID, USER_ID, json!(150)).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), ErrorCode::SitePermissionAccessDenied.code());
    assert_eq!(
        app.store.find_site(SITE_ID).unwrap().unwrap().target_enrollment,
        Some(100)
    );
    assert!(app.audit.events().is_empty());
}

#[tokio::test]
async fn study_without_site_is_not_found() {
    let app = TestApp::new();
    add_user(&app.store, "root", true);
    add_study(&app.store, "bare", StudyType::Open, ago(1));

    let (status, body) = update(&app, "bare", "root", json!(10)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), ErrorCode::SiteNotFound.code());
}

#[tokio::test]
async fn closed_study_cannot_be_updated() {
    let app = TestApp::new();
    seed(&app.store, Permission::Edit);
    add_study(&app.store, STUDY_ID, StudyType::Close, ago(5));

    let (status, body) = update(&app, STUDY_ID, USER_ID, json!(10)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        error_code(&body),
        ErrorCode::CannotUpdateEnrollmentTargetForCloseStudy.code()
    );
}

#[tokio::test]
async fn decommissioned_site_cannot_be_updated() {
    let app = TestApp::new();
    seed(&app.store, Permission::Edit);
    add_site(&app.store, SITE_ID, STUDY_ID, Some(LOCATION_ID), SiteStatus::Deactive);

    let (status, body) = update(&app, STUDY_ID, USER_ID, json!(10)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        error_code(&body),
        ErrorCode::CannotUpdateEnrollmentTargetForDecommissionedSite.code()
    );
}

#[tokio::test]
async fn negative_target_is_a_violation() {
    let app = TestApp::new();
    seed(&app.store, Permission::Edit);

    let (status, body) = update(&app, STUDY_ID, USER_ID, json!(-5)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["violations"][0]["path"], "targetEnrollment");
}

#[tokio::test]
async fn audit_failure_fails_the_update() {
    let store = InMemoryStore::new();
    seed(&store, Permission::Edit);
    let app = TestApp::with(store, InMemoryAuditSink::failing());

    let (status, body) = update(&app, STUDY_ID, USER_ID, json!(150)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_code(&body), ErrorCode::ApplicationError.code());
}

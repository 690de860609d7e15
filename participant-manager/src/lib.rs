//! Study, site and participant registry administration for site coordinators.

pub mod db;
pub mod locations;
pub mod model;
pub mod settings;
pub mod studies;

use std::sync::Arc;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, patch},
};
use tower::ServiceBuilder;

use audit::{AuditEvent, AuditSink};
use auth_check::{ActiveUserFilter, ProtectedPath, ProtectedRoutes, RouteConfigError, active_user_filter};
use common::{ApiError, ErrorCode};

use db::{AdminUser, AdminUsers, Store};

pub const SERVICE_NAME: &str = "participant-manager-datastore";

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub audit: Arc<dyn AuditSink>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, audit: Arc<dyn AuditSink>) -> Self {
        AppState { store, audit }
    }

    /// Records an audit event; a failed write fails the request.
    pub async fn audit(&self, event: AuditEvent) -> Result<(), ApiError> {
        self.audit.record(&event).await.map_err(|err| {
            tracing::error!("Failed to record audit event {}: {}", event.event_code, err);
            ApiError::internal(err)
        })
    }
}

pub(crate) fn find_user(store: &dyn Store, user_id: &str) -> Result<AdminUser, ApiError> {
    Ok(store.find_user(user_id)?.ok_or(ErrorCode::UserNotFound)?)
}

/// Builds the service router under `context_path`, guarded by the active user filter.
pub fn router(
    state: AppState,
    context_path: &str,
    protected: &[ProtectedPath],
) -> Result<Router, RouteConfigError> {
    let routes = ProtectedRoutes::from_config(context_path, protected)?;
    let filter = ActiveUserFilter::new(routes, Arc::new(AdminUsers(state.store.clone())));

    let api = Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/studies", get(studies::list_studies))
        .route(
            "/studies/{study_id}/participants",
            get(studies::get_study_participants),
        )
        .route(
            "/studies/{study_id}/enrollment-target",
            patch(studies::update_target_enrollment),
        )
        .route(
            "/locations",
            get(locations::list_locations).post(locations::add_location),
        )
        .with_state(state);

    let app = if context_path.is_empty() {
        api
    } else {
        Router::new().nest(context_path, api)
    };

    Ok(app.layer(ServiceBuilder::new().layer(from_fn_with_state(filter, active_user_filter))))
}

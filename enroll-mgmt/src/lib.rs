//! Enrollment status lookups for participants.

pub mod db;
pub mod participant_info;
pub mod settings;

use std::sync::Arc;

use axum::{Router, middleware::from_fn_with_state, routing::get};

use audit::{AuditEvent, AuditSink};
use auth_check::{TokenIntrospector, token_auth};
use common::ApiError;

use db::EnrollmentStore;

pub const SERVICE_NAME: &str = "enroll-mgmt";

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EnrollmentStore>,
    pub audit: Arc<dyn AuditSink>,
}

impl AppState {
    pub fn new(store: Arc<dyn EnrollmentStore>, audit: Arc<dyn AuditSink>) -> Self {
        AppState { store, audit }
    }

    pub async fn audit(&self, event: AuditEvent) -> Result<(), ApiError> {
        self.audit.record(&event).await.map_err(|err| {
            tracing::error!("Failed to record audit event {}: {}", event.event_code, err);
            ApiError::internal(err)
        })
    }
}

/// Every route but `/health` requires an active access token.
pub fn router(
    state: AppState,
    introspector: Arc<dyn TokenIntrospector>,
    context_path: &str,
) -> Router {
    let api = Router::new()
        .route("/participantInfo", get(participant_info::participant_info))
        .route_layer(from_fn_with_state(introspector, token_auth))
        .route("/health", get(|| async { "OK" }))
        .with_state(state);

    if context_path.is_empty() {
        api
    } else {
        Router::new().nest(context_path, api)
    }
}

//! Feedback and contact-us mail for app users.

pub mod contact;
pub mod settings;

use std::sync::Arc;

use axum::{Router, middleware::from_fn_with_state, routing::{get, post}};

use audit::{AuditEvent, AuditSink};
use auth_check::{TokenIntrospector, token_auth};
use common::ApiError;
use mail::Mailer;

use settings::MailContent;

pub const SERVICE_NAME: &str = "user-mgmt";

#[derive(Clone)]
pub struct AppState {
    pub mailer: Arc<dyn Mailer>,
    pub audit: Arc<dyn AuditSink>,
    pub feedback: Arc<MailContent>,
    pub contact_us: Arc<MailContent>,
}

impl AppState {
    pub async fn audit(&self, event: AuditEvent) -> Result<(), ApiError> {
        self.audit.record(&event).await.map_err(|err| {
            tracing::error!("Failed to record audit event {}: {}", event.event_code, err);
            ApiError::internal(err)
        })
    }
}

pub fn router(
    state: AppState,
    introspector: Arc<dyn TokenIntrospector>,
    context_path: &str,
) -> Router {
    let api = Router::new()
        .route("/feedback", post(contact::send_feedback))
        .route("/contactUs", post(contact::send_contact_us))
        .route_layer(from_fn_with_state(introspector, token_auth))
        .route("/health", get(|| async { "OK" }))
        .with_state(state);

    if context_path.is_empty() {
        api
    } else {
        Router::new().nest(context_path, api)
    }
}

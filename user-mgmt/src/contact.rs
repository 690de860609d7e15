use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::HeaderMap,
};
use serde::{Deserialize, Serialize};

use audit::{AuditEvent, EventCode};
use common::{ApiError, ErrorCode, USER_ID_HEADER, Violation};
use mail::EmailMessage;

use crate::settings::MailContent;
use crate::{AppState, SERVICE_NAME};

pub const FEEDBACK_SENT: &str = "Thank you for your feedback";
pub const CONTACT_US_SENT: &str = "Thank you for contacting us";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactUsRequest {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Which mail is being sent and the events recording its outcome.
struct Delivery<'a> {
    content: &'a MailContent,
    sent: EventCode,
    failed: EventCode,
}

pub async fn send_feedback(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<FeedbackRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(request) =
        payload.map_err(|rejection| ApiError::violation("body", rejection.body_text()))?;
    require(&[("subject", &request.subject), ("body", &request.body)])?;

    let delivery = Delivery {
        content: &state.feedback,
        sent: EventCode::FeedbackContentEmailed,
        failed: EventCode::FeedbackContentEmailFailed,
    };
    deliver(&state, &delivery, user_id(&headers), &request).await?;

    Ok(Json(MessageResponse {
        message: FEEDBACK_SENT.to_string(),
    }))
}

pub async fn send_contact_us(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ContactUsRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(request) =
        payload.map_err(|rejection| ApiError::violation("body", rejection.body_text()))?;
    require(&[
        ("subject", &request.subject),
        ("body", &request.body),
        ("firstName", &request.first_name),
        ("email", &request.email),
    ])?;

    let delivery = Delivery {
        content: &state.contact_us,
        sent: EventCode::ContactUsContentEmailed,
        failed: EventCode::ContactUsContentEmailFailed,
    };
    deliver(&state, &delivery, user_id(&headers), &request).await?;

    Ok(Json(MessageResponse {
        message: CONTACT_US_SENT.to_string(),
    }))
}

fn user_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn require(fields: &[(&str, &String)]) -> Result<(), ApiError> {
    let violations: Vec<Violation> = fields
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(path, _)| Violation::required(*path))
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Violations(violations))
    }
}

async fn deliver<T: Serialize>(
    state: &AppState,
    delivery: &Delivery<'_>,
    user_id: Option<String>,
    values: &T,
) -> Result<(), ApiError> {
    let (subject, body) = delivery
        .content
        .template
        .render(values)
        .map_err(ApiError::internal)?;
    let message = EmailMessage {
        to: vec![delivery.content.to.clone()],
        subject,
        body,
    };

    let outcome = state.mailer.send(&message).await;
    let code = if outcome.is_ok() {
        delivery.sent
    } else {
        delivery.failed
    };

    let mut event = AuditEvent::new(code, SERVICE_NAME);
    if let Some(user_id) = user_id {
        event = event.user(user_id);
    }
    state.audit(event).await?;

    outcome.map_err(|err| {
        tracing::error!("Failed to send {} mail: {}", delivery.content.to, err);
        ApiError::Code(ErrorCode::EmailSendFailed)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_lists_every_blank_field() {
        let empty = String::new();
        let filled = "hello".to_string();

        match require(&[("subject", &empty), ("body", &filled), ("email", &empty)]) {
            Err(ApiError::Violations(violations)) => {
                let paths: Vec<&str> = violations.iter().map(|v| v.path.as_str()).collect();
                assert_eq!(paths, vec!["subject", "email"]);
            }
            other => panic!("expected violations, got {:?}", other),
        }
        assert!(require(&[("body", &filled)]).is_ok());
    }
}

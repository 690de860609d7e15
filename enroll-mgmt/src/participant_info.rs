use axum::{
    Json,
    extract::{Query, State},
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use audit::{AuditEvent, EventCode};
use common::{ApiError, ErrorCode};

use crate::{AppState, SERVICE_NAME};

pub const PARTICIPANT_INFO_SUCCESS: &str = "Participant information fetched successfully";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantInfoQuery {
    pub participant_id: Option<String>,
    pub study_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantInfoResponse {
    pub message: String,
    pub enrollment_status: String,
    pub enrollment_date: Option<String>,
    pub withdrawal_date: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn format_date(date: Option<DateTime<Utc>>) -> Option<String> {
    date.map(|date| date.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Enrollment status of a participant in a study, `studyId` being the custom study id.
pub async fn participant_info(
    State(state): State<AppState>,
    Query(query): Query<ParticipantInfoQuery>,
) -> Result<Json<ParticipantInfoResponse>, ApiError> {
    let (Some(participant_id), Some(study_id)) =
        (non_blank(query.participant_id), non_blank(query.study_id))
    else {
        return Err(ErrorCode::BadRequest.into());
    };

    let Some(enrollment) = state.store.find_enrollment(&participant_id, &study_id)? else {
        tracing::warn!(
            "no enrollment for participant {} in study {}",
            participant_id,
            study_id
        );
        state
            .audit(
                AuditEvent::new(EventCode::ReadOperationFailedForEnrollmentStatus, SERVICE_NAME)
                    .participant(participant_id.as_str())
                    .study(study_id.as_str()),
            )
            .await?;
        return Err(ErrorCode::InvalidParticipantId.into());
    };

    state
        .audit(
            AuditEvent::new(EventCode::ReadOperationSucceededForEnrollmentStatus, SERVICE_NAME)
                .participant(participant_id.as_str())
                .study(study_id.as_str()),
        )
        .await?;

    Ok(Json(ParticipantInfoResponse {
        message: PARTICIPANT_INFO_SUCCESS.to_string(),
        enrollment_status: enrollment.status,
        enrollment_date: format_date(enrollment.enrolled_date),
        withdrawal_date: format_date(enrollment.withdrawal_date),
    }))
}

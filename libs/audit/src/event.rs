use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventCode {
    StudyParticipantRegistryViewed,
    EnrollmentTargetUpdated,
    NewLocationAdded,
    ReadOperationSucceededForEnrollmentStatus,
    ReadOperationFailedForEnrollmentStatus,
    FeedbackContentEmailed,
    FeedbackContentEmailFailed,
    ContactUsContentEmailed,
    ContactUsContentEmailFailed,
}

impl EventCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventCode::StudyParticipantRegistryViewed => "STUDY_PARTICIPANT_REGISTRY_VIEWED",
            EventCode::EnrollmentTargetUpdated => "ENROLLMENT_TARGET_UPDATED",
            EventCode::NewLocationAdded => "NEW_LOCATION_ADDED",
            EventCode::ReadOperationSucceededForEnrollmentStatus => {
                "READ_OPERATION_SUCCEEDED_FOR_ENROLLMENT_STATUS"
            }
            EventCode::ReadOperationFailedForEnrollmentStatus => {
                "READ_OPERATION_FAILED_FOR_ENROLLMENT_STATUS"
            }
            EventCode::FeedbackContentEmailed => "FEEDBACK_CONTENT_EMAILED",
            EventCode::FeedbackContentEmailFailed => "FEEDBACK_CONTENT_EMAIL_FAILED",
            EventCode::ContactUsContentEmailed => "CONTACT_US_CONTENT_EMAILED",
            EventCode::ContactUsContentEmailFailed => "CONTACT_US_CONTENT_EMAIL_FAILED",
        }
    }
}

impl fmt::Display for EventCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A write-once record of something a user did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub event_code: EventCode,
    pub source: String,
    pub user_id: Option<String>,
    pub study_id: Option<String>,
    pub site_id: Option<String>,
    pub app_id: Option<String>,
    pub participant_id: Option<String>,
    pub description: Option<String>,
    pub occurred: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(event_code: EventCode, source: impl Into<String>) -> Self {
        AuditEvent {
            event_code,
            source: source.into(),
            user_id: None,
            study_id: None,
            site_id: None,
            app_id: None,
            participant_id: None,
            description: None,
            occurred: Utc::now(),
        }
    }

    pub fn user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn study(mut self, study_id: impl Into<String>) -> Self {
        self.study_id = Some(study_id.into());
        self
    }

    pub fn site(mut self, site_id: impl Into<String>) -> Self {
        self.site_id = Some(site_id.into());
        self
    }

    pub fn app(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = Some(app_id.into());
        self
    }

    pub fn participant(mut self, participant_id: impl Into<String>) -> Self {
        self.participant_id = Some(participant_id.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_code_as_screaming_snake_case() {
        let event = AuditEvent::new(EventCode::StudyParticipantRegistryViewed, "participant-manager")
            .user("u1")
            .study("s1")
            .app("a1");

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["eventCode"], EventCode::StudyParticipantRegistryViewed.as_str());
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["studyId"], "s1");
        assert_eq!(json["appId"], "a1");
        assert!(json["siteId"].is_null());
    }
}

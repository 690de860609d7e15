use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

/// Machine readable error codes shared by all services.
///
/// Every code maps to a fixed HTTP status and a human readable description,
/// and is rendered as a JSON body of the form
/// `{"status": 404, "error_code": "EC_0002", "error_type": "Not Found", "error_description": "..."}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    UserNotFound,
    UserNotActive,
    Unauthorized,
    BadRequest,
    NoStudiesFound,
    StudyNotFound,
    AppNotFound,
    SiteNotFound,
    SitePermissionAccessDenied,
    StudyPermissionAccessDenied,
    LocationAccessDenied,
    CustomIdExists,
    UnsupportedSortByValue,
    UnsupportedSortDirectionValue,
    CannotUpdateEnrollmentTargetForCloseStudy,
    CannotUpdateEnrollmentTargetForDecommissionedSite,
    InvalidParticipantId,
    EmailSendFailed,
    ApplicationError,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::UserNotFound
            | ErrorCode::NoStudiesFound
            | ErrorCode::StudyNotFound
            | ErrorCode::AppNotFound
            | ErrorCode::SiteNotFound => StatusCode::NOT_FOUND,
            ErrorCode::UserNotActive
            | ErrorCode::SitePermissionAccessDenied
            | ErrorCode::StudyPermissionAccessDenied
            | ErrorCode::LocationAccessDenied => StatusCode::FORBIDDEN,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::CustomIdExists => StatusCode::CONFLICT,
            ErrorCode::BadRequest
            | ErrorCode::UnsupportedSortByValue
            | ErrorCode::UnsupportedSortDirectionValue
            | ErrorCode::CannotUpdateEnrollmentTargetForCloseStudy
            | ErrorCode::CannotUpdateEnrollmentTargetForDecommissionedSite
            | ErrorCode::InvalidParticipantId => StatusCode::BAD_REQUEST,
            ErrorCode::EmailSendFailed | ErrorCode::ApplicationError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ErrorCode::UserNotFound => "EC_0001",
            ErrorCode::UserNotActive => "EC_0002",
            ErrorCode::Unauthorized => "EC_0003",
            ErrorCode::BadRequest => "EC_0004",
            ErrorCode::NoStudiesFound => "EC_0005",
            ErrorCode::StudyNotFound => "EC_0006",
            ErrorCode::AppNotFound => "EC_0007",
            ErrorCode::SiteNotFound => "EC_0008",
            ErrorCode::SitePermissionAccessDenied => "EC_0009",
            ErrorCode::StudyPermissionAccessDenied => "EC_0010",
            ErrorCode::LocationAccessDenied => "EC_0011",
            ErrorCode::CustomIdExists => "EC_0012",
            ErrorCode::UnsupportedSortByValue => "EC_0013",
            ErrorCode::UnsupportedSortDirectionValue => "EC_0014",
            ErrorCode::CannotUpdateEnrollmentTargetForCloseStudy => "EC_0015",
            ErrorCode::CannotUpdateEnrollmentTargetForDecommissionedSite => "EC_0016",
            ErrorCode::InvalidParticipantId => "EC_0017",
            ErrorCode::EmailSendFailed => "EC_0018",
            ErrorCode::ApplicationError => "EC_0500",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::UserNotFound => "User not found",
            ErrorCode::UserNotActive => "This user account is not active",
            ErrorCode::Unauthorized => "Missing or invalid access token",
            ErrorCode::BadRequest => "Malformed request syntax or invalid request message framing",
            ErrorCode::NoStudiesFound => "No studies found",
            ErrorCode::StudyNotFound => "Study not found",
            ErrorCode::AppNotFound => "App not found",
            ErrorCode::SiteNotFound => "Site not found",
            ErrorCode::SitePermissionAccessDenied => {
                "You do not have permission to view or edit this site"
            }
            ErrorCode::StudyPermissionAccessDenied => {
                "You do not have permission to view or edit this study"
            }
            ErrorCode::LocationAccessDenied => "You do not have permission to manage locations",
            ErrorCode::CustomIdExists => "ID already exists. Please provide a different ID",
            ErrorCode::UnsupportedSortByValue => "Invalid sortBy value",
            ErrorCode::UnsupportedSortDirectionValue => "Invalid sortDirection value",
            ErrorCode::CannotUpdateEnrollmentTargetForCloseStudy => {
                "Enrollment target can be updated only for open studies"
            }
            ErrorCode::CannotUpdateEnrollmentTargetForDecommissionedSite => {
                "Enrollment target cannot be updated for a decommissioned site"
            }
            ErrorCode::InvalidParticipantId => "Participant not found for the given study",
            ErrorCode::EmailSendFailed => "Sorry, an error occurred while sending the email",
            ErrorCode::ApplicationError => {
                "Sorry, an error has occurred and your request could not be processed"
            }
        }
    }

    pub fn body(&self) -> ErrorBody {
        let status = self.status();
        ErrorBody {
            status: status.as_u16(),
            error_code: self.code().to_string(),
            error_type: status.canonical_reason().unwrap_or("Error").to_string(),
            error_description: self.description().to_string(),
        }
    }
}

impl IntoResponse for ErrorCode {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

/// JSON body written for every [`ErrorCode`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    pub status: u16,
    pub error_code: String,
    pub error_type: String,
    pub error_description: String,
}

/// A single failed constraint on a request field or header.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Violation {
    pub path: String,
    pub message: String,
}

impl Violation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Violation {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn required(path: impl Into<String>) -> Self {
        Violation::new(path, "must not be blank")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{}", .0.description())]
    Code(ErrorCode),

    #[error("request failed validation on {} field(s)", .0.len())]
    Violations(Vec<Violation>),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal(err: impl std::fmt::Display) -> Self {
        ApiError::Internal(err.to_string())
    }

    pub fn violation(path: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Violations(vec![Violation::new(path, message)])
    }
}

impl From<ErrorCode> for ApiError {
    fn from(code: ErrorCode) -> Self {
        ApiError::Code(code)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Code(code) => code.into_response(),
            ApiError::Violations(violations) => (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "violations": violations })),
            )
                .into_response(),
            ApiError::Internal(msg) => {
                tracing::error!("Request failed: {}", msg);
                ErrorCode::ApplicationError.into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_carries_status_and_description() {
        let body = ErrorCode::SiteNotFound.body();
        assert_eq!(body.status, 404);
        assert_eq!(body.error_type, "Not Found");
        assert_eq!(body.error_description, "Site not found");
    }

    #[test]
    fn business_rule_violations_are_bad_requests() {
        assert_eq!(
            ErrorCode::CannotUpdateEnrollmentTargetForCloseStudy.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErrorCode::CannotUpdateEnrollmentTargetForDecommissionedSite.status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn internal_errors_hide_their_message() {
        let response = ApiError::internal("connection refused").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.error_code, "EC_0500");
        assert!(!body.error_description.contains("connection refused"));
    }

    #[tokio::test]
    async fn violations_render_as_list() {
        let response = ApiError::violation("userId", "header is required").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["violations"][0]["path"], "userId");
        assert_eq!(json["violations"][0]["message"], "header is required");
    }
}

use serde::{Deserialize, Serialize};

use crate::db;

pub const GET_STUDIES_SUCCESS: &str = "Get studies successfully";
pub const GET_PARTICIPANT_REGISTRY_SUCCESS: &str = "Get participant registry successfully";
pub const TARGET_ENROLLMENT_UPDATE_SUCCESS: &str = "Target enrollment updated successfully";
pub const NEW_LOCATION_ADDED_SUCCESS: &str = "New location added successfully";
pub const GET_LOCATIONS_SUCCESS: &str = "Get locations successfully";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudiesQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub search_term: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantRegistryQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_direction: Option<String>,
    pub search_term: Option<String>,
    pub exclude_participant_study_status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationsQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub search_term: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyDetails {
    pub id: String,
    pub custom_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub study_type: String,
    pub app_id: Option<String>,
    pub invited: u64,
    pub enrolled: u64,
    pub enrollment_percentage: f64,
    /// `VIEW` or `EDIT`.
    pub study_permission: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyResponse {
    pub message: String,
    pub studies: Vec<StudyDetails>,
    pub super_admin: bool,
    pub site_permission_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryParticipant {
    pub id: String,
    pub email: String,
    pub site_id: String,
    pub custom_location_id: Option<String>,
    pub location_name: Option<String>,
    pub onboarding_status: String,
    pub enrollment_status: String,
    pub invited_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantRegistryDetail {
    pub study_id: String,
    pub custom_study_id: String,
    pub study_name: String,
    pub study_type: String,
    pub app_id: String,
    pub app_name: String,
    pub target_enrollment: Option<i32>,
    pub registry_participants: Vec<RegistryParticipant>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantRegistryResponse {
    pub message: String,
    pub participant_registry_detail: ParticipantRegistryDetail,
    pub total_participant_count: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTargetEnrollmentRequest {
    pub target_enrollment: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTargetEnrollmentResponse {
    pub site_id: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRequest {
    #[serde(default)]
    pub custom_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationDetails {
    pub location_id: String,
    pub custom_id: String,
    pub name: String,
    pub description: Option<String>,
    pub status: i32,
    pub created_at: String,
}

impl From<db::Location> for LocationDetails {
    fn from(location: db::Location) -> Self {
        LocationDetails {
            location_id: location.id,
            custom_id: location.custom_id,
            name: location.name,
            description: location.description,
            status: location.status.value(),
            created_at: location.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationResponse {
    pub message: String,
    #[serde(flatten)]
    pub location: LocationDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationListResponse {
    pub message: String,
    pub locations: Vec<LocationDetails>,
}

pub fn permission_name(permission: db::Permission) -> &'static str {
    match permission {
        db::Permission::View => "VIEW",
        db::Permission::Edit => "EDIT",
    }
}

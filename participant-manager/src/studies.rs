use std::collections::HashMap;
use std::str::FromStr;

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
};
use chrono::SecondsFormat;

use audit::{AuditEvent, EventCode};
use common::{ApiError, ErrorCode, PageRequest, SortDirection, UserId};

use crate::db::{
    AdminUser, EnrollmentStatus, Location, OnboardingStatus, ParticipantStudy, Permission, Site,
    SitePermission, SiteStatus, Store, StudyPermission, StudySearch, StudyType,
};
use crate::model::*;
use crate::{AppState, SERVICE_NAME, find_user};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortBy {
    #[default]
    Email,
    LocationName,
    OnboardingStatus,
    EnrollmentStatus,
    InvitedDate,
}

impl FromStr for SortBy {
    type Err = ErrorCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(SortBy::Email),
            "locationName" => Ok(SortBy::LocationName),
            "onboardingStatus" => Ok(SortBy::OnboardingStatus),
            "enrollmentStatus" => Ok(SortBy::EnrollmentStatus),
            "invitedDate" => Ok(SortBy::InvitedDate),
            _ => Err(ErrorCode::UnsupportedSortByValue),
        }
    }
}

/// Studies visible to the calling user, with their registry counts.
pub async fn list_studies(
    State(state): State<AppState>,
    user_id: UserId,
    Query(query): Query<StudiesQuery>,
) -> Result<Json<StudyResponse>, ApiError> {
    tracing::info!("list studies for user {}", user_id.as_str());
    let response = study_list(state.store.as_ref(), user_id.as_str(), &query)?;
    tracing::info!("found {} studies", response.studies.len());
    Ok(Json(response))
}

pub async fn get_study_participants(
    State(state): State<AppState>,
    user_id: UserId,
    Path(study_id): Path<String>,
    Query(query): Query<ParticipantRegistryQuery>,
) -> Result<Json<ParticipantRegistryResponse>, ApiError> {
    tracing::info!(
        "get participant registry of study {} for user {}",
        study_id,
        user_id.as_str()
    );
    let response = participant_registry(state.store.as_ref(), user_id.as_str(), &study_id, &query)?;

    let detail = &response.participant_registry_detail;
    state
        .audit(
            AuditEvent::new(EventCode::StudyParticipantRegistryViewed, SERVICE_NAME)
                .user(user_id.as_str())
                .study(detail.study_id.as_str())
                .app(detail.app_id.as_str()),
        )
        .await?;

    Ok(Json(response))
}

pub async fn update_target_enrollment(
    State(state): State<AppState>,
    user_id: UserId,
    Path(study_id): Path<String>,
    payload: Result<Json<UpdateTargetEnrollmentRequest>, JsonRejection>,
) -> Result<Json<UpdateTargetEnrollmentResponse>, ApiError> {
    let Json(request) =
        payload.map_err(|rejection| ApiError::violation("body", rejection.body_text()))?;

    let site = update_site_target(state.store.as_ref(), user_id.as_str(), &study_id, &request)?;
    tracing::info!(
        "target enrollment of site {} set to {:?}",
        site.id,
        site.target_enrollment
    );

    state
        .audit(
            AuditEvent::new(EventCode::EnrollmentTargetUpdated, SERVICE_NAME)
                .user(user_id.as_str())
                .study(study_id.as_str())
                .site(site.id.as_str()),
        )
        .await?;

    Ok(Json(UpdateTargetEnrollmentResponse {
        site_id: site.id,
        message: TARGET_ENROLLMENT_UPDATE_SUCCESS.to_string(),
    }))
}

fn study_list(
    store: &dyn Store,
    user_id: &str,
    query: &StudiesQuery,
) -> Result<StudyResponse, ApiError> {
    let user = find_user(store, user_id)?;
    let site_permissions = store.site_permissions_for_user(&user.id)?;
    let study_permissions = store.study_permissions_for_user(&user.id)?;

    let study_ids = if user.super_admin {
        None
    } else {
        let mut ids: Vec<String> = site_permissions
            .iter()
            .map(|p| p.study_id.clone())
            .chain(study_permissions.iter().map(|p| p.study_id.clone()))
            .collect();
        ids.sort();
        ids.dedup();
        Some(ids)
    };

    let studies = store.search_studies(&StudySearch {
        study_ids,
        search_term: non_blank(query.search_term.as_deref()),
        page: PageRequest::new(query.limit, query.offset),
    })?;
    if studies.is_empty() {
        return Err(ErrorCode::NoStudiesFound.into());
    }

    let mut details = Vec::with_capacity(studies.len());
    for study in studies {
        let sites = store.find_sites_by_study(&study.id)?;
        let site_ids = visible_site_ids(&user, &study.id, sites, &site_permissions, &study_permissions);

        let invited = store
            .registry_for_sites(&site_ids)?
            .iter()
            .filter(|entry| {
                matches!(
                    entry.onboarding_status,
                    OnboardingStatus::Invited | OnboardingStatus::Enrolled
                )
            })
            .count() as u64;
        let enrolled = store
            .participant_studies_for_sites(&site_ids)?
            .iter()
            .filter(|participant| participant.status == EnrollmentStatus::Enrolled)
            .count() as u64;

        let permission =
            study_permission(&user, &study.id, &site_permissions, &study_permissions);

        details.push(StudyDetails {
            id: study.id,
            custom_id: study.custom_id,
            name: study.name,
            study_type: study.study_type.code().to_string(),
            app_id: study.app_id,
            invited,
            enrolled,
            enrollment_percentage: enrollment_percentage(invited, enrolled),
            study_permission: permission_name(permission).to_string(),
        });
    }

    Ok(StudyResponse {
        message: GET_STUDIES_SUCCESS.to_string(),
        studies: details,
        super_admin: user.super_admin,
        site_permission_count: site_permissions.len(),
    })
}

/// Sites the user may see in a study. A study permission covers every site.
fn visible_site_ids(
    user: &AdminUser,
    study_id: &str,
    sites: Vec<Site>,
    site_permissions: &[SitePermission],
    study_permissions: &[StudyPermission],
) -> Vec<String> {
    let whole_study =
        user.super_admin || study_permissions.iter().any(|p| p.study_id == study_id);

    sites
        .into_iter()
        .map(|site| site.id)
        .filter(|site_id| whole_study || site_permissions.iter().any(|p| &p.site_id == site_id))
        .collect()
}

fn study_permission(
    user: &AdminUser,
    study_id: &str,
    site_permissions: &[SitePermission],
    study_permissions: &[StudyPermission],
) -> Permission {
    if user.super_admin {
        return Permission::Edit;
    }
    if let Some(permission) = study_permissions.iter().find(|p| p.study_id == study_id) {
        return permission.edit;
    }
    site_permissions
        .iter()
        .filter(|p| p.study_id == study_id)
        .map(|p| p.edit)
        .max()
        .unwrap_or(Permission::View)
}

pub fn enrollment_percentage(invited: u64, enrolled: u64) -> f64 {
    if invited == 0 {
        return 0.0;
    }
    enrolled as f64 * 100.0 / invited as f64
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn participant_registry(
    store: &dyn Store,
    user_id: &str,
    study_id: &str,
    query: &ParticipantRegistryQuery,
) -> Result<ParticipantRegistryResponse, ApiError> {
    let sort_by = query
        .sort_by
        .as_deref()
        .map(SortBy::from_str)
        .transpose()?
        .unwrap_or_default();
    let direction = query
        .sort_direction
        .as_deref()
        .map(SortDirection::from_str)
        .transpose()?
        .unwrap_or_default();

    let user = find_user(store, user_id)?;
    let study = store
        .find_study(study_id)?
        .ok_or(ErrorCode::StudyNotFound)?;
    let app = match &study.app_id {
        Some(app_id) => store.find_app(app_id)?,
        None => None,
    }
    .ok_or(ErrorCode::AppNotFound)?;

    let sites = store.find_sites_by_study(&study.id)?;
    let sites = if user.super_admin
        || store
            .study_permissions_for_user(&user.id)?
            .iter()
            .any(|p| p.study_id == study.id)
    {
        sites
    } else {
        let permitted: Vec<String> = store
            .site_permissions_for_user(&user.id)?
            .into_iter()
            .filter(|p| p.study_id == study.id)
            .map(|p| p.site_id)
            .collect();
        if permitted.is_empty() {
            tracing::warn!("user {} has no permission in study {}", user.id, study.id);
            return Err(match study.study_type {
                StudyType::Open => ErrorCode::SitePermissionAccessDenied,
                StudyType::Close => ErrorCode::StudyPermissionAccessDenied,
            }
            .into());
        }
        sites
            .into_iter()
            .filter(|site| permitted.contains(&site.id))
            .collect()
    };

    let mut site_locations: HashMap<String, Option<Location>> = HashMap::new();
    for site in &sites {
        let location = match &site.location_id {
            Some(location_id) => store.find_location(location_id)?,
            None => None,
        };
        site_locations.insert(site.id.clone(), location);
    }

    let site_ids: Vec<String> = sites.iter().map(|site| site.id.clone()).collect();
    let registry = store.registry_for_sites(&site_ids)?;
    let registry_ids: Vec<String> = registry.iter().map(|entry| entry.id.clone()).collect();
    let participant_studies: HashMap<String, ParticipantStudy> = store
        .participant_studies_for_registry(&registry_ids)?
        .into_iter()
        .filter_map(|participant| {
            participant
                .participant_registry_site_id
                .clone()
                .map(|registry_id| (registry_id, participant))
        })
        .collect();

    let excluded: Vec<EnrollmentStatus> = query
        .exclude_participant_study_status
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .filter_map(|code| EnrollmentStatus::from_code(code.trim()))
        .collect();
    let search_term = non_blank(query.search_term.as_deref()).map(|term| term.to_lowercase());

    let mut participants: Vec<RegistryParticipant> = registry
        .into_iter()
        .filter_map(|entry| {
            let status = participant_studies
                .get(&entry.id)
                .map(|participant| participant.status)
                .unwrap_or(EnrollmentStatus::YetToEnroll);
            if excluded.contains(&status) {
                return None;
            }

            let location = site_locations.get(&entry.site_id).and_then(Option::as_ref);
            Some(RegistryParticipant {
                id: entry.id,
                email: entry.email,
                site_id: entry.site_id,
                custom_location_id: location.map(|l| l.custom_id.clone()),
                location_name: location.map(|l| l.name.clone()),
                onboarding_status: entry.onboarding_status.display().to_string(),
                enrollment_status: status.display().to_string(),
                invited_date: entry
                    .invitation_date
                    .map(|date| date.to_rfc3339_opts(SecondsFormat::Millis, true)),
            })
        })
        .filter(|participant| match &search_term {
            Some(term) => matches_search(participant, term),
            None => true,
        })
        .collect();

    sort_participants(&mut participants, sort_by, direction);
    let total_participant_count = participants.len();
    let participants = PageRequest::new(query.limit, query.offset).apply(participants);

    Ok(ParticipantRegistryResponse {
        message: GET_PARTICIPANT_REGISTRY_SUCCESS.to_string(),
        participant_registry_detail: ParticipantRegistryDetail {
            study_id: study.id,
            custom_study_id: study.custom_id,
            study_name: study.name,
            study_type: study.study_type.code().to_string(),
            app_id: app.id,
            app_name: app.name,
            target_enrollment: sites.first().and_then(|site| site.target_enrollment),
            registry_participants: participants,
        },
        total_participant_count,
    })
}

fn matches_search(participant: &RegistryParticipant, term: &str) -> bool {
    let contains = |value: &str| value.to_lowercase().contains(term);

    contains(&participant.email)
        || participant.location_name.as_deref().is_some_and(contains)
        || participant.custom_location_id.as_deref().is_some_and(contains)
}

pub fn sort_participants(
    participants: &mut [RegistryParticipant],
    sort_by: SortBy,
    direction: SortDirection,
) {
    participants.sort_by(|a, b| {
        let ordering = match sort_by {
            SortBy::Email => a.email.to_lowercase().cmp(&b.email.to_lowercase()),
            SortBy::LocationName => a.location_name.cmp(&b.location_name),
            SortBy::OnboardingStatus => a.onboarding_status.cmp(&b.onboarding_status),
            SortBy::EnrollmentStatus => a.enrollment_status.cmp(&b.enrollment_status),
            SortBy::InvitedDate => a.invited_date.cmp(&b.invited_date),
        }
        .then_with(|| a.email.cmp(&b.email));

        match direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
}

fn target_enrollment(request: &UpdateTargetEnrollmentRequest) -> Result<i32, ApiError> {
    let Some(target) = request.target_enrollment else {
        return Err(ApiError::violation("targetEnrollment", "must not be null"));
    };

    i32::try_from(target)
        .ok()
        .filter(|target| *target >= 0)
        .ok_or_else(|| ApiError::violation("targetEnrollment", "must be a non-negative integer"))
}

fn update_site_target(
    store: &dyn Store,
    user_id: &str,
    study_id: &str,
    request: &UpdateTargetEnrollmentRequest,
) -> Result<Site, ApiError> {
    let target = target_enrollment(request)?;
    let user = find_user(store, user_id)?;
    let sites = store.find_sites_by_study(study_id)?;

    let site = if user.super_admin {
        sites.into_iter().next()
    } else {
        let editable: Vec<String> = store
            .site_permissions_for_user(&user.id)?
            .into_iter()
            .filter(|p| p.study_id == study_id && p.edit == Permission::Edit)
            .map(|p| p.site_id)
            .collect();
        if editable.is_empty() {
            return Err(ErrorCode::SitePermissionAccessDenied.into());
        }
        sites.into_iter().find(|site| editable.contains(&site.id))
    };
    let mut site = site.ok_or(ErrorCode::SiteNotFound)?;

    let study = store
        .find_study(study_id)?
        .ok_or(ErrorCode::StudyNotFound)?;
    if study.study_type == StudyType::Close {
        return Err(ErrorCode::CannotUpdateEnrollmentTargetForCloseStudy.into());
    }
    if site.status == SiteStatus::Deactive {
        return Err(ErrorCode::CannotUpdateEnrollmentTargetForDecommissionedSite.into());
    }

    site.target_enrollment = Some(target);
    store.save_site(&site)?;
    Ok(site)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn participant(email: &str, location: Option<&str>, invited: Option<&str>) -> RegistryParticipant {
        RegistryParticipant {
            id: email.to_string(),
            email: email.to_string(),
            site_id: "site".to_string(),
            custom_location_id: location.map(|l| l.to_uppercase()),
            location_name: location.map(str::to_string),
            onboarding_status: "Invited".to_string(),
            enrollment_status: "Yet to enroll".to_string(),
            invited_date: invited.map(str::to_string),
        }
    }

    fn emails(participants: &[RegistryParticipant]) -> Vec<&str> {
        participants.iter().map(|p| p.email.as_str()).collect()
    }

    #[test]
    fn percentage_is_zero_without_invitations() {
        assert_eq!(enrollment_percentage(0, 0), 0.0);
        assert_eq!(enrollment_percentage(0, 3), 0.0);
        assert_eq!(enrollment_percentage(4, 1), 25.0);
    }

    #[test]
    fn sort_by_parses_known_fields_only() {
        assert_eq!("invitedDate".parse::<SortBy>(), Ok(SortBy::InvitedDate));
        assert_eq!(
            "createdDate".parse::<SortBy>(),
            Err(ErrorCode::UnsupportedSortByValue)
        );
    }

    #[test]
    fn sorts_by_email_ignoring_case() {
        let mut participants = vec![
            participant("carol@example.org", None, None),
            participant("Alice@example.org", None, None),
            participant("bob@example.org", None, None),
        ];
        sort_participants(&mut participants, SortBy::Email, SortDirection::Asc);
        assert_eq!(
            emails(&participants),
            vec!["Alice@example.org", "bob@example.org", "carol@example.org"]
        );
    }

    #[test]
    fn sorts_invited_date_descending() {
        let mut participants = vec![
            participant("a@example.org", None, Some("2024-01-01T00:00:00.000Z")),
            participant("b@example.org", None, Some("2024-03-01T00:00:00.000Z")),
            participant("c@example.org", None, None),
        ];
        sort_participants(&mut participants, SortBy::InvitedDate, SortDirection::Desc);
        assert_eq!(
            emails(&participants),
            vec!["b@example.org", "a@example.org", "c@example.org"]
        );
    }

    #[test]
    fn search_matches_location_fields() {
        let p = participant("a@example.org", Some("Boston"), None);
        assert!(matches_search(&p, "bost"));
        assert!(matches_search(&p, "example"));
        assert!(!matches_search(&p, "denver"));
    }

    #[test]
    fn target_enrollment_must_be_non_negative() {
        let request = |value| UpdateTargetEnrollmentRequest {
            target_enrollment: value,
        };
        assert_eq!(target_enrollment(&request(Some(150))).unwrap(), 150);
        assert!(target_enrollment(&request(Some(-1))).is_err());
        assert!(target_enrollment(&request(None)).is_err());
        assert!(target_enrollment(&request(Some(i64::MAX))).is_err());
    }
}

use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::Utc;
use uuid::Uuid;

use audit::{AuditEvent, EventCode};
use common::{ApiError, ErrorCode, PageRequest, UserId, Violation};

use crate::db::{Location, LocationStatus, Permission, Store, StoreError};
use crate::model::*;
use crate::{AppState, SERVICE_NAME, find_user};

/// Adds a location. Only super admins and users allowed to edit locations may.
pub async fn add_location(
    State(state): State<AppState>,
    user_id: UserId,
    payload: Result<Json<LocationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<LocationResponse>), ApiError> {
    let Json(request) =
        payload.map_err(|rejection| ApiError::violation("body", rejection.body_text()))?;

    let location = create_location(state.store.as_ref(), user_id.as_str(), &request)?;
    tracing::info!("location {} created with id {}", location.custom_id, location.id);

    state
        .audit(
            AuditEvent::new(EventCode::NewLocationAdded, SERVICE_NAME)
                .user(user_id.as_str())
                .description(format!("New location {} added", location.custom_id)),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(LocationResponse {
            message: NEW_LOCATION_ADDED_SUCCESS.to_string(),
            location: LocationDetails::from(location),
        }),
    ))
}

pub async fn list_locations(
    State(state): State<AppState>,
    user_id: UserId,
    Query(query): Query<LocationsQuery>,
) -> Result<Json<LocationListResponse>, ApiError> {
    let store = state.store.as_ref();
    let user = find_user(store, user_id.as_str())?;
    if !user.super_admin && user.location_permission.is_none() {
        return Err(ErrorCode::LocationAccessDenied.into());
    }

    let search_term = query
        .search_term
        .as_deref()
        .map(str::trim)
        .filter(|term| !term.is_empty());
    let locations = store.search_locations(search_term, PageRequest::new(query.limit, query.offset))?;

    Ok(Json(LocationListResponse {
        message: GET_LOCATIONS_SUCCESS.to_string(),
        locations: locations.into_iter().map(LocationDetails::from).collect(),
    }))
}

fn validate(request: &LocationRequest) -> Result<(), ApiError> {
    let mut violations = Vec::new();
    if request.custom_id.trim().is_empty() {
        violations.push(Violation::required("customId"));
    }
    if request.name.trim().is_empty() {
        violations.push(Violation::required("name"));
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Violations(violations))
    }
}

fn create_location(
    store: &dyn Store,
    user_id: &str,
    request: &LocationRequest,
) -> Result<Location, ApiError> {
    validate(request)?;

    let user = find_user(store, user_id)?;
    if !user.super_admin && user.location_permission != Some(Permission::Edit) {
        tracing::warn!("user {} may not add locations", user.id);
        return Err(ErrorCode::LocationAccessDenied.into());
    }

    let custom_id = request.custom_id.trim();
    if store.find_location_by_custom_id(custom_id)?.is_some() {
        return Err(ErrorCode::CustomIdExists.into());
    }

    let location = Location {
        id: Uuid::new_v4().to_string(),
        custom_id: custom_id.to_string(),
        name: request.name.trim().to_string(),
        description: request.description.clone(),
        status: LocationStatus::Active,
        created_by: Some(user.id),
        created_at: Utc::now(),
    };
    insert_location(store, &location)?;
    Ok(location)
}

/// Saves a new location. A concurrent insert of the same custom id loses here.
fn insert_location(store: &dyn Store, location: &Location) -> Result<(), ApiError> {
    match store.save_location(location) {
        Err(StoreError::Conflict(constraint)) => {
            tracing::warn!(
                "location {} collided on {}",
                location.custom_id,
                constraint
            );
            Err(ErrorCode::CustomIdExists.into())
        }
        other => Ok(other?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{InMemoryStore, LocationRepository};

    #[test]
    fn blank_fields_are_reported_together() {
        let request = LocationRequest {
            custom_id: " ".to_string(),
            name: String::new(),
            description: None,
        };

        match validate(&request) {
            Err(ApiError::Violations(violations)) => {
                let paths: Vec<&str> = violations.iter().map(|v| v.path.as_str()).collect();
                assert_eq!(paths, vec!["customId", "name"]);
            }
            other => panic!("expected violations, got {:?}", other),
        }
    }

    #[test]
    fn custom_id_taken_at_save_time_conflicts() {
        let store = InMemoryStore::new();
        let first = Location {
            id: "loc-1".to_string(),
            custom_id: "BOS-01".to_string(),
            name: "Boston General".to_string(),
            description: None,
            status: LocationStatus::Active,
            created_by: None,
            created_at: Utc::now(),
        };
        store.save_location(&first).unwrap();

        let second = Location {
            id: "loc-2".to_string(),
            ..first.clone()
        };
        match insert_location(&store, &second) {
            Err(ApiError::Code(ErrorCode::CustomIdExists)) => {}
            other => panic!("expected custom id conflict, got {:?}", other),
        }
        assert!(store.find_location("loc-2").unwrap().is_none());
    }
}

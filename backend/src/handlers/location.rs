//! HTTP handlers for location management endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use shared::{Coordinates, CreateLocationInput, Location};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::location::CreatedLocation;
use crate::AppState;

/// Track a new location
pub async fn create_location(
    State(state): State<AppState>,
    Json(input): Json<CreateLocationInput>,
) -> AppResult<(StatusCode, Json<CreatedLocation>)> {
    let created = state.location_service().create_location(input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// List all tracked locations
pub async fn list_locations(State(state): State<AppState>) -> AppResult<Json<Vec<Location>>> {
    let locations = state.location_service().list_locations().await?;
    Ok(Json(locations))
}

/// Stop tracking a location by ID
pub async fn delete_location(
    State(state): State<AppState>,
    Path(location_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.location_service().delete_location(location_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Query parameters for deleting by coordinates
#[derive(Debug, Deserialize)]
pub struct CoordinatesQuery {
    pub latitude: f64,
    pub longitude: f64,
}

/// Stop tracking the location at the given coordinates
pub async fn delete_location_by_coordinates(
    State(state): State<AppState>,
    Query(query): Query<CoordinatesQuery>,
) -> AppResult<StatusCode> {
    state
        .location_service()
        .delete_by_coordinates(Coordinates::new(query.latitude, query.longitude))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

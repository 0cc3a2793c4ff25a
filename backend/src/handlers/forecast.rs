//! HTTP handlers for forecast endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use shared::ForecastView;
use uuid::Uuid;

use crate::error::AppResult;
use crate::AppState;

/// Return the stored forecast of every tracked location
pub async fn read_stored_forecasts(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<ForecastView>>> {
    let forecasts = state.forecast_service().read_all().await?;
    Ok(Json(forecasts))
}

/// Refresh every tracked location from the provider and return the results
pub async fn refresh_forecasts(State(state): State<AppState>) -> AppResult<Json<Vec<ForecastView>>> {
    let forecasts = state.forecast_service().refresh_all().await?;
    Ok(Json(forecasts))
}

/// Return the stored forecast of one location
pub async fn read_location_forecast(
    State(state): State<AppState>,
    Path(location_id): Path<Uuid>,
) -> AppResult<Json<ForecastView>> {
    let forecast = state.forecast_service().read_one(location_id).await?;
    Ok(Json(forecast))
}

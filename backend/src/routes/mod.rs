//! Route definitions for the forecast tracker

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Location management
        .nest("/locations", location_routes())
        // Forecasts
        .nest("/forecast", forecast_routes())
}

/// Location management routes
fn location_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(handlers::create_location)
                .get(handlers::list_locations)
                .delete(handlers::delete_location_by_coordinates),
        )
        .route("/:location_id", delete(handlers::delete_location))
}

/// Forecast routes
fn forecast_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::read_stored_forecasts))
        .route("/latest", put(handlers::refresh_forecasts))
        .route("/:location_id", get(handlers::read_location_forecast))
}

//! Forecast Tracker - Backend
//!
//! Tracks geographic locations and keeps the latest hourly forecast for each,
//! refreshing and reading all locations concurrently under a deadline.

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod external;
pub mod handlers;
pub mod routes;
pub mod services;
pub mod storage;

pub use config::Config;

use external::ForecastProvider;
use services::{Coordinator, ForecastService, LocationService};
use storage::Storage;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub provider: Arc<dyn ForecastProvider>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        storage: Arc<dyn Storage>,
        provider: Arc<dyn ForecastProvider>,
        config: Config,
    ) -> Self {
        Self {
            storage,
            provider,
            config: Arc::new(config),
        }
    }

    pub fn forecast_service(&self) -> ForecastService {
        ForecastService::new(
            self.storage.clone(),
            self.provider.clone(),
            Coordinator::from_config(&self.config.aggregation),
        )
    }

    pub fn location_service(&self) -> LocationService {
        LocationService::new(self.storage.clone(), self.forecast_service())
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Forecast Tracker API v1"
}

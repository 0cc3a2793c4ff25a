//! External API integrations

use async_trait::async_trait;
use shared::{Coordinates, Forecast};
use thiserror::Error;

pub mod open_meteo;

pub use open_meteo::OpenMeteoClient;

/// Forecast provider failures
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Forecast API request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Forecast API error: {status} - {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse forecast response: {0}")]
    Decode(String),

    #[error("Invalid forecast API URL: {0}")]
    InvalidUrl(String),
}

/// Source of hourly forecasts for a coordinate pair
#[async_trait]
pub trait ForecastProvider: Send + Sync {
    async fn get_forecast(&self, coords: Coordinates) -> Result<Forecast, ProviderError>;
}

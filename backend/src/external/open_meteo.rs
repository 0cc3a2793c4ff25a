//! Open-Meteo forecast client
//!
//! Requests hourly 2 m temperature in Fahrenheit, wind speed in mph, and lets
//! the provider resolve the local timezone.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use shared::{Coordinates, Forecast};

use super::{ForecastProvider, ProviderError};

/// Forecast API client
#[derive(Clone)]
pub struct OpenMeteoClient {
    client: Client,
    base_url: String,
}

impl OpenMeteoClient {
    /// Create a new client against the given base URL
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn forecast_url(&self, coords: Coordinates) -> Result<Url, ProviderError> {
        let (latitude, longitude) = coords.to_query_pair();
        let endpoint = format!("{}/forecast", self.base_url.trim_end_matches('/'));

        Url::parse_with_params(
            &endpoint,
            &[
                ("latitude", latitude.as_str()),
                ("longitude", longitude.as_str()),
                ("hourly", "temperature_2m"),
                ("temperature_unit", "fahrenheit"),
                ("wind_speed_unit", "mph"),
                ("timezone", "auto"),
            ],
        )
        .map_err(|e| ProviderError::InvalidUrl(format!("{}: {}", endpoint, e)))
    }
}

#[async_trait]
impl ForecastProvider for OpenMeteoClient {
    #[tracing::instrument(skip(self), level = "debug")]
    async fn get_forecast(&self, coords: Coordinates) -> Result<Forecast, ProviderError> {
        let url = self.forecast_url(coords)?;

        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice::<Forecast>(&body).map_err(|e| ProviderError::Decode(e.to_string()))
    }
}

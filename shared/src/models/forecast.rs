//! Forecast payload and response models
//!
//! `Forecast` mirrors the provider's JSON body. Every field defaults when absent
//! so that missing data is reported by the validator instead of the decoder.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Forecast payload as returned by the forecast provider
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Forecast {
    pub latitude: f64,
    pub longitude: f64,
    pub generationtime_ms: f64,
    pub utc_offset_seconds: i64,
    pub timezone: String,
    pub timezone_abbreviation: String,
    pub elevation: f64,
    pub hourly_units: HourlyUnits,
    pub hourly: Hourly,
}

/// Hourly temperature series. `time[i]` labels `temperature_2m[i]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Hourly {
    pub time: Vec<String>,
    pub temperature_2m: Vec<f64>,
}

impl Hourly {
    /// Iterate over aligned (time, temperature) pairs
    pub fn points(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.time
            .iter()
            .map(String::as_str)
            .zip(self.temperature_2m.iter().copied())
    }
}

/// Unit labels for each hourly series
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HourlyUnits {
    pub time: String,
    pub temperature_2m: String,
}

/// Stored forecast for one location, as returned to API clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForecastView {
    pub location_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub generationtime_ms: f64,
    pub utc_offset_seconds: i64,
    pub timezone: String,
    pub timezone_abbreviation: String,
    pub elevation: f64,
    pub hourly_units: HourlyUnits,
    pub hourly: Hourly,
}

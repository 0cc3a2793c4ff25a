//! Persisted forecast entities
//!
//! A snapshot owns its hourly rows and its unit row through `forecast_id`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Forecast snapshot metadata for one location
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForecastRecord {
    pub id: Uuid,
    pub location_id: Uuid,
    pub generationtime_ms: f64,
    pub utc_offset_seconds: i64,
    pub timezone: String,
    pub timezone_abbreviation: String,
    pub elevation: f64,
    pub fetched_at: DateTime<Utc>,
}

/// One hourly sample. `position` is the index within the series.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HourlyRecord {
    pub forecast_id: Uuid,
    pub position: i32,
    pub time: String,
    pub temperature_2m: f64,
}

/// Unit labels for a snapshot's series
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HourlyUnitsRecord {
    pub forecast_id: Uuid,
    pub time_unit: String,
    pub temperature_2m_unit: String,
}

/// A complete snapshot: always written and read as one unit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForecastRecords {
    pub forecast: ForecastRecord,
    pub hourly: Vec<HourlyRecord>,
    pub units: HourlyUnitsRecord,
}

impl ForecastRecords {
    pub fn location_id(&self) -> Uuid {
        self.forecast.location_id
    }
}

//! Mapping between provider payloads, persisted records and API views

use chrono::Utc;
use uuid::Uuid;

use crate::models::{
    Forecast, ForecastRecord, ForecastRecords, ForecastView, Hourly, HourlyRecord, HourlyUnits,
    HourlyUnitsRecord, Location,
};

/// Build the persistable records for a validated forecast.
///
/// The payload must already have passed [`crate::validate_forecast`]; the
/// series is zipped, so a length mismatch silently truncates to the shorter list.
pub fn to_records(location_id: Uuid, forecast: &Forecast) -> ForecastRecords {
    let forecast_id = Uuid::new_v4();

    let hourly = forecast
        .hourly
        .points()
        .enumerate()
        .map(|(position, (time, temperature_2m))| HourlyRecord {
            forecast_id,
            position: position as i32,
            time: time.to_string(),
            temperature_2m,
        })
        .collect();

    ForecastRecords {
        forecast: ForecastRecord {
            id: forecast_id,
            location_id,
            generationtime_ms: forecast.generationtime_ms,
            utc_offset_seconds: forecast.utc_offset_seconds,
            timezone: forecast.timezone.clone(),
            timezone_abbreviation: forecast.timezone_abbreviation.clone(),
            elevation: forecast.elevation,
            fetched_at: Utc::now(),
        },
        hourly,
        units: HourlyUnitsRecord {
            forecast_id,
            time_unit: forecast.hourly_units.time.clone(),
            temperature_2m_unit: forecast.hourly_units.temperature_2m.clone(),
        },
    }
}

impl ForecastView {
    /// Combine a location with its stored snapshot
    pub fn assemble(location: &Location, records: &ForecastRecords) -> Self {
        let mut rows: Vec<&HourlyRecord> = records.hourly.iter().collect();
        rows.sort_by_key(|row| row.position);

        Self {
            location_id: location.id,
            latitude: location.latitude,
            longitude: location.longitude,
            generationtime_ms: records.forecast.generationtime_ms,
            utc_offset_seconds: records.forecast.utc_offset_seconds,
            timezone: records.forecast.timezone.clone(),
            timezone_abbreviation: records.forecast.timezone_abbreviation.clone(),
            elevation: records.forecast.elevation,
            hourly_units: HourlyUnits {
                time: records.units.time_unit.clone(),
                temperature_2m: records.units.temperature_2m_unit.clone(),
            },
            hourly: Hourly {
                time: rows.iter().map(|row| row.time.clone()).collect(),
                temperature_2m: rows.iter().map(|row| row.temperature_2m).collect(),
            },
        }
    }
}

//! Validation utilities for the forecast tracker
//!
//! Forecast payloads are checked field by field and then across fields. All
//! violations are collected so the error names every offending field at once.

use std::fmt;

use thiserror::Error;

use crate::models::Forecast;
use crate::types::{LATITUDE_RANGE, LONGITUDE_RANGE};

/// A single rule violation on a named field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: &'static str,
    pub rule: &'static str,
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.field, self.rule)
    }
}

/// Forecast payload failed one or more structural rules
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid forecast fields: {}", format_violations(.violations))]
pub struct ForecastValidationError {
    pub violations: Vec<FieldViolation>,
}

impl ForecastValidationError {
    /// Names of the offending fields, in the order they were checked
    pub fn fields(&self) -> Vec<&'static str> {
        self.violations.iter().map(|v| v.field).collect()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }
}

fn format_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// Forecast Validations
// ============================================================================

/// Validate a forecast payload before it is transformed and persisted
pub fn validate_forecast(forecast: &Forecast) -> Result<(), ForecastValidationError> {
    let mut violations = Vec::new();
    let mut require = |ok: bool, field: &'static str, rule: &'static str| {
        if !ok {
            violations.push(FieldViolation { field, rule });
        }
    };

    require(forecast.latitude != 0.0, "latitude", "required");
    require(
        LATITUDE_RANGE.contains(&forecast.latitude),
        "latitude",
        "range",
    );
    require(forecast.longitude != 0.0, "longitude", "required");
    require(
        LONGITUDE_RANGE.contains(&forecast.longitude),
        "longitude",
        "range",
    );
    require(
        forecast.generationtime_ms != 0.0,
        "generationtime_ms",
        "required",
    );
    require(
        forecast.utc_offset_seconds != 0,
        "utc_offset_seconds",
        "required",
    );
    require(!forecast.timezone.is_empty(), "timezone", "required");
    require(
        !forecast.timezone_abbreviation.is_empty(),
        "timezone_abbreviation",
        "required",
    );
    require(forecast.elevation != 0.0, "elevation", "required");

    require(
        !forecast.hourly_units.time.is_empty(),
        "hourly_units.time",
        "required",
    );
    require(
        !forecast.hourly_units.temperature_2m.is_empty(),
        "hourly_units.temperature_2m",
        "required",
    );

    let hourly = &forecast.hourly;
    require(!hourly.time.is_empty(), "hourly.time", "required");
    require(
        !hourly.temperature_2m.is_empty(),
        "hourly.temperature_2m",
        "required",
    );

    // Cross-field: each label must pair with exactly one temperature
    if hourly.time.len() != hourly.temperature_2m.len() {
        require(false, "hourly.time", "len");
        require(false, "hourly.temperature_2m", "len");
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ForecastValidationError { violations })
    }
}

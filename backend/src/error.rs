//! Error handling for the forecast tracker
//!
//! Per-location failures are `ForecastError`s tagged with the location and the
//! stage that failed. `AppError` is what handlers return; it maps every failure
//! onto an HTTP status and a JSON error body.

use std::fmt;
use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::{ForecastValidationError, Location};
use thiserror::Error;
use uuid::Uuid;

use crate::external::ProviderError;
use crate::services::coordinator::AggregateError;
use crate::storage::StorageError;

/// Stage of the per-location pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Validate,
    Persist,
    Load,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetch => "fetch",
            Stage::Validate => "validate",
            Stage::Persist => "persist",
            Stage::Load => "load",
        };
        f.write_str(name)
    }
}

/// Failure of the pipeline for a single location
#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("forecast for location {location_id} failed validation: {source}")]
    Validation {
        location_id: Uuid,
        #[source]
        source: ForecastValidationError,
    },

    #[error("forecast provider request for location {location_id} failed: {source}")]
    Upstream {
        location_id: Uuid,
        #[source]
        source: ProviderError,
    },

    #[error("storage {stage} for location {location_id} failed: {source}")]
    Persistence {
        location_id: Uuid,
        stage: Stage,
        #[source]
        source: StorageError,
    },

    #[error("work for location {location_id} was cancelled before {stage}")]
    Cancelled { location_id: Uuid, stage: Stage },
}

impl ForecastError {
    pub fn location_id(&self) -> Uuid {
        match self {
            ForecastError::Validation { location_id, .. }
            | ForecastError::Upstream { location_id, .. }
            | ForecastError::Persistence { location_id, .. }
            | ForecastError::Cancelled { location_id, .. } => *location_id,
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            ForecastError::Validation { .. } => Stage::Validate,
            ForecastError::Upstream { .. } => Stage::Fetch,
            ForecastError::Persistence { stage, .. } | ForecastError::Cancelled { stage, .. } => {
                *stage
            }
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Request errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Location already tracked at ({}, {})", .existing.latitude, .existing.longitude)]
    LocationConflict { existing: Location },

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Pipeline errors
    #[error(transparent)]
    Forecast(#[from] ForecastError),

    #[error("Timed out after {0:?} waiting for forecast workers")]
    Timeout(Duration),

    // Storage errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl From<AggregateError<ForecastError>> for AppError {
    fn from(err: AggregateError<ForecastError>) -> Self {
        match err {
            AggregateError::Task(err) => AppError::Forecast(err),
            AggregateError::Timeout(deadline) => AppError::Timeout(deadline),
            AggregateError::Join(msg) => AppError::Internal(msg),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by_key(|(field, _)| *field);

        let field = fields
            .iter()
            .map(|(field, _)| *field)
            .collect::<Vec<_>>()
            .join(",");
        let message = fields
            .iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{} is invalid", field))
                })
            })
            .collect::<Vec<_>>()
            .join("; ");

        AppError::Validation { field, message }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl ErrorDetail {
    fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            field: None,
            location: None,
        }
    }
}

impl AppError {
    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::LocationConflict { .. } => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forecast(err) => match err {
                ForecastError::Upstream { .. } | ForecastError::Validation { .. } => {
                    StatusCode::BAD_GATEWAY
                }
                ForecastError::Persistence { .. } | ForecastError::Cancelled { .. } => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            AppError::Timeout(_)
            | AppError::Storage(_)
            | AppError::Internal(_)
            | AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> ErrorDetail {
        match self {
            AppError::Validation { field, message } => ErrorDetail {
                field: Some(field.clone()),
                ..ErrorDetail::new("VALIDATION_ERROR", message.clone())
            },
            AppError::LocationConflict { existing } => ErrorDetail {
                location: Some(existing.clone()),
                ..ErrorDetail::new("LOCATION_CONFLICT", self.to_string())
            },
            AppError::NotFound(resource) => {
                ErrorDetail::new("NOT_FOUND", format!("{} not found", resource))
            }
            AppError::Forecast(err) => match err {
                ForecastError::Upstream { .. } => {
                    ErrorDetail::new("FORECAST_PROVIDER_ERROR", err.to_string())
                }
                ForecastError::Validation { source, .. } => ErrorDetail {
                    field: Some(source.fields().join(",")),
                    ..ErrorDetail::new("FORECAST_VALIDATION_ERROR", err.to_string())
                },
                ForecastError::Persistence { .. } => {
                    ErrorDetail::new("STORAGE_ERROR", err.to_string())
                }
                ForecastError::Cancelled { .. } => {
                    ErrorDetail::new("CANCELLED", err.to_string())
                }
            },
            AppError::Timeout(_) => ErrorDetail::new("AGGREGATION_TIMEOUT", self.to_string()),
            AppError::Storage(_) => {
                ErrorDetail::new("STORAGE_ERROR", "A storage error occurred")
            }
            AppError::Internal(msg) => ErrorDetail::new("INTERNAL_ERROR", msg.clone()),
            AppError::InternalError(_) => {
                ErrorDetail::new("INTERNAL_ERROR", "An internal server error occurred")
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_detail = self.detail();

        // Log the error for debugging
        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;

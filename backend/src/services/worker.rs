//! Per-location forecast pipelines
//!
//! Refresh: fetch -> validate -> transform -> persist.
//! Read: load the stored snapshot and assemble the view.
//! The cancellation token is checked at every stage boundary and raced
//! against every collaborator call.

use std::sync::Arc;

use shared::{to_records, validate_forecast, ForecastView, Location};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, Instrument};

use crate::error::{ForecastError, Stage};
use crate::external::ForecastProvider;
use crate::services::coordinator::until_cancelled;
use crate::storage::{Storage, StorageError};

/// Runs the forecast pipelines for one location at a time
#[derive(Clone)]
pub struct FetchWorker {
    storage: Arc<dyn Storage>,
    provider: Arc<dyn ForecastProvider>,
}

impl FetchWorker {
    pub fn new(storage: Arc<dyn Storage>, provider: Arc<dyn ForecastProvider>) -> Self {
        Self { storage, provider }
    }

    /// Fetch a fresh forecast for `location` and replace its stored snapshot.
    ///
    /// `None` when the location was untracked while its forecast was in flight.
    pub async fn refresh(
        &self,
        location: Location,
        token: CancellationToken,
    ) -> Result<Option<ForecastView>, ForecastError> {
        let span = info_span!("refresh_forecast", location_id = %location.id);
        self.run_refresh(location, token).instrument(span).await
    }

    async fn run_refresh(
        &self,
        location: Location,
        token: CancellationToken,
    ) -> Result<Option<ForecastView>, ForecastError> {
        let location_id = location.id;
        let cancelled = |stage| ForecastError::Cancelled { location_id, stage };

        let forecast = until_cancelled(&token, self.provider.get_forecast(location.coordinates()))
            .await
            .ok_or_else(|| cancelled(Stage::Fetch))?
            .map_err(|source| ForecastError::Upstream {
                location_id,
                source,
            })?;

        if token.is_cancelled() {
            return Err(cancelled(Stage::Validate));
        }
        validate_forecast(&forecast).map_err(|source| ForecastError::Validation {
            location_id,
            source,
        })?;

        let records = to_records(location_id, &forecast);
        debug!(points = records.hourly.len(), "Forecast validated");

        if token.is_cancelled() {
            return Err(cancelled(Stage::Persist));
        }
        let stored = match until_cancelled(&token, self.storage.replace_forecast(records))
            .await
            .ok_or_else(|| cancelled(Stage::Persist))?
        {
            Ok(stored) => stored,
            Err(StorageError::MissingLocation(_)) => {
                debug!("Location deleted during refresh, skipping");
                return Ok(None);
            }
            Err(source) => {
                return Err(ForecastError::Persistence {
                    location_id,
                    stage: Stage::Persist,
                    source,
                })
            }
        };

        debug!(forecast_id = %stored.forecast.id, "Forecast stored");
        Ok(Some(ForecastView::assemble(&location, &stored)))
    }

    /// Load the stored forecast for `location`; `None` when it has none yet
    pub async fn load(
        &self,
        location: Location,
        token: CancellationToken,
    ) -> Result<Option<ForecastView>, ForecastError> {
        let location_id = location.id;
        let span = info_span!("load_forecast", location_id = %location_id);

        let stored = until_cancelled(&token, self.storage.find_forecast(location_id))
            .instrument(span)
            .await
            .ok_or(ForecastError::Cancelled {
                location_id,
                stage: Stage::Load,
            })?
            .map_err(|source| ForecastError::Persistence {
                location_id,
                stage: Stage::Load,
                source,
            })?;

        Ok(stored.map(|records| ForecastView::assemble(&location, &records)))
    }
}

//! Forecast service: refresh and read forecasts across tracked locations

use std::sync::Arc;

use shared::{ForecastView, Location};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::external::ForecastProvider;
use crate::services::coordinator::Coordinator;
use crate::services::worker::FetchWorker;
use crate::storage::{LocationFilter, Storage};

/// Forecast service for all-location operations
#[derive(Clone)]
pub struct ForecastService {
    storage: Arc<dyn Storage>,
    worker: FetchWorker,
    coordinator: Coordinator,
}

impl ForecastService {
    /// Create a new ForecastService instance
    pub fn new(
        storage: Arc<dyn Storage>,
        provider: Arc<dyn ForecastProvider>,
        coordinator: Coordinator,
    ) -> Self {
        Self {
            worker: FetchWorker::new(storage.clone(), provider),
            storage,
            coordinator,
        }
    }

    /// Fetch, validate and store a fresh forecast for every tracked location.
    ///
    /// Returns the stored forecasts in completion order, leaving out
    /// locations that were untracked while their refresh was in flight.
    #[tracing::instrument(skip(self))]
    pub async fn refresh_all(&self) -> AppResult<Vec<ForecastView>> {
        let locations = self.storage.find_locations(LocationFilter::All).await?;
        let count = locations.len();

        let worker = self.worker.clone();
        let forecasts = self
            .coordinator
            .aggregate_all(locations, move |location, token| {
                let worker = worker.clone();
                async move { worker.refresh(location, token).await }
            })
            .await?;

        tracing::info!(locations = count, "Refreshed forecasts");
        // Locations untracked mid-refresh drop out
        Ok(forecasts.into_iter().flatten().collect())
    }

    /// Stored forecasts for every tracked location that has one
    #[tracing::instrument(skip(self))]
    pub async fn read_all(&self) -> AppResult<Vec<ForecastView>> {
        let locations = self.storage.find_locations(LocationFilter::All).await?;

        let worker = self.worker.clone();
        let forecasts = self
            .coordinator
            .aggregate_all(locations, move |location, token| {
                let worker = worker.clone();
                async move { worker.load(location, token).await }
            })
            .await?;

        Ok(forecasts.into_iter().flatten().collect())
    }

    /// Stored forecast for a single location
    pub async fn read_one(&self, location_id: Uuid) -> AppResult<ForecastView> {
        let location = self
            .storage
            .find_locations(LocationFilter::ById(location_id))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound(format!("Location {}", location_id)))?;

        let records = self
            .storage
            .find_forecast(location_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Forecast for location {}", location_id)))?;

        Ok(ForecastView::assemble(&location, &records))
    }

    /// Refresh a single, already stored location under the same deadline
    pub async fn refresh_location(&self, location: Location) -> AppResult<ForecastView> {
        let location_id = location.id;
        let worker = self.worker.clone();
        let mut forecasts = self
            .coordinator
            .aggregate_all(vec![location], move |location, token| {
                let worker = worker.clone();
                async move { worker.refresh(location, token).await }
            })
            .await?;

        match forecasts.pop() {
            Some(Some(forecast)) => Ok(forecast),
            Some(None) => Err(AppError::NotFound(format!("Location {}", location_id))),
            None => Err(AppError::Internal("refresh produced no forecast".to_string())),
        }
    }
}

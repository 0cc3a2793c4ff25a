//! Location management service

use std::sync::Arc;

use shared::{Coordinates, CreateLocationInput, ForecastView, Location};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::forecast::ForecastService;
use crate::storage::{LocationFilter, Storage, StorageError};

/// Location service for tracking and untracking coordinates
#[derive(Clone)]
pub struct LocationService {
    storage: Arc<dyn Storage>,
    forecasts: ForecastService,
}

/// A newly tracked location with its first forecast
#[derive(Debug, Clone, serde::Serialize)]
pub struct CreatedLocation {
    #[serde(flatten)]
    pub location: Location,
    pub forecast: ForecastView,
}

impl LocationService {
    /// Create a new LocationService instance
    pub fn new(storage: Arc<dyn Storage>, forecasts: ForecastService) -> Self {
        Self { storage, forecasts }
    }

    /// Start tracking a location and fetch its first forecast.
    ///
    /// The location stays tracked when the first refresh fails; the refresh
    /// error is returned and the next refresh-all will retry it.
    pub async fn create_location(&self, input: CreateLocationInput) -> AppResult<CreatedLocation> {
        input.validate()?;
        let coords = input.coordinates();

        if let Some(existing) = self.find_by_coordinates(coords).await? {
            return Err(AppError::LocationConflict { existing });
        }

        let location = match self.storage.create_location(coords).await {
            Ok(location) => location,
            // Lost a race with a concurrent create for the same coordinates
            Err(StorageError::DuplicateLocation(_)) => {
                let existing = self.find_by_coordinates(coords).await?.ok_or_else(|| {
                    AppError::Internal(format!("location at {} vanished after conflict", coords))
                })?;
                return Err(AppError::LocationConflict { existing });
            }
            Err(err) => return Err(err.into()),
        };

        tracing::info!(location_id = %location.id, %coords, "Tracking new location");

        let forecast = self.forecasts.refresh_location(location.clone()).await?;
        Ok(CreatedLocation { location, forecast })
    }

    /// All tracked locations
    pub async fn list_locations(&self) -> AppResult<Vec<Location>> {
        Ok(self.storage.find_locations(LocationFilter::All).await?)
    }

    /// Stop tracking a location by ID
    pub async fn delete_location(&self, location_id: Uuid) -> AppResult<()> {
        let removed = self
            .storage
            .delete_locations(LocationFilter::ById(location_id))
            .await?;

        if removed == 0 {
            return Err(AppError::NotFound(format!("Location {}", location_id)));
        }
        Ok(())
    }

    /// Stop tracking the location at the given coordinates
    pub async fn delete_by_coordinates(&self, coords: Coordinates) -> AppResult<()> {
        let removed = self
            .storage
            .delete_locations(LocationFilter::ByCoordinates(coords))
            .await?;

        if removed == 0 {
            return Err(AppError::NotFound(format!("Location at {}", coords)));
        }
        Ok(())
    }

    async fn find_by_coordinates(&self, coords: Coordinates) -> AppResult<Option<Location>> {
        Ok(self
            .storage
            .find_locations(LocationFilter::ByCoordinates(coords))
            .await?
            .into_iter()
            .next())
    }
}

//! In-process storage backend
//!
//! Every operation completes under a single lock acquisition, so a forecast
//! replace is atomic with respect to concurrent readers.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use shared::{Coordinates, ForecastRecords, Location};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{LocationFilter, Storage, StorageError, StorageResult};

#[derive(Default)]
struct MemoryState {
    locations: Vec<Location>,
    forecasts: HashMap<Uuid, ForecastRecords>,
}

/// Storage kept in process memory
#[derive(Default)]
pub struct MemoryStorage {
    state: RwLock<MemoryState>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn find_locations(&self, filter: LocationFilter) -> StorageResult<Vec<Location>> {
        let state = self.state.read().await;
        Ok(state
            .locations
            .iter()
            .filter(|location| filter.matches(location))
            .cloned()
            .collect())
    }

    async fn create_location(&self, coords: Coordinates) -> StorageResult<Location> {
        let mut state = self.state.write().await;
        if state.locations.iter().any(|l| l.coordinates() == coords) {
            return Err(StorageError::DuplicateLocation(coords));
        }

        let location = Location {
            id: Uuid::new_v4(),
            latitude: coords.latitude,
            longitude: coords.longitude,
            created_at: Utc::now(),
        };
        state.locations.push(location.clone());
        Ok(location)
    }

    async fn delete_locations(&self, filter: LocationFilter) -> StorageResult<u64> {
        let mut state = self.state.write().await;
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut state.locations)
            .into_iter()
            .partition(|location| filter.matches(location));
        state.locations = kept;
        for location in &removed {
            state.forecasts.remove(&location.id);
        }
        Ok(removed.len() as u64)
    }

    async fn replace_forecast(&self, records: ForecastRecords) -> StorageResult<ForecastRecords> {
        let mut state = self.state.write().await;
        let location_id = records.location_id();
        if !state.locations.iter().any(|l| l.id == location_id) {
            return Err(StorageError::MissingLocation(location_id));
        }
        state.forecasts.insert(location_id, records.clone());
        Ok(records)
    }

    async fn find_forecast(&self, location_id: Uuid) -> StorageResult<Option<ForecastRecords>> {
        let state = self.state.read().await;
        Ok(state.forecasts.get(&location_id).cloned().map(|mut records| {
            records.hourly.sort_by_key(|row| row.position);
            records
        }))
    }

    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}

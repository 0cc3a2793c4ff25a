//! Test doubles shared by the integration tests
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use forecast_tracker_backend::external::{ForecastProvider, ProviderError};
use forecast_tracker_backend::storage::{
    LocationFilter, MemoryStorage, Storage, StorageError, StorageResult,
};
use shared::{Coordinates, Forecast, ForecastRecords, Hourly, HourlyUnits, Location};
use uuid::Uuid;

/// Build a valid forecast for the given coordinates with `points` hourly samples
pub fn forecast_for(coords: Coordinates, points: usize) -> Forecast {
    Forecast {
        latitude: coords.latitude,
        longitude: coords.longitude,
        generationtime_ms: 0.042,
        utc_offset_seconds: -14400,
        timezone: "America/New_York".to_string(),
        timezone_abbreviation: "EDT".to_string(),
        elevation: 27.0,
        hourly_units: HourlyUnits {
            time: "iso8601".to_string(),
            temperature_2m: "°F".to_string(),
        },
        hourly: Hourly {
            time: (0..points)
                .map(|h| format!("2024-06-01T{:02}:00", h % 24))
                .collect(),
            temperature_2m: (0..points)
                .map(|h| coords.latitude.abs() + h as f64 * 0.5)
                .collect(),
        },
    }
}

/// Canned provider behaviour for one coordinate pair
#[derive(Clone)]
pub enum Reply {
    Forecast(Forecast),
    Delayed(Duration, Forecast),
    Status(u16),
    Hang,
}

/// Forecast provider answering from a table of canned replies
#[derive(Default)]
pub struct StubProvider {
    replies: Mutex<HashMap<String, Reply>>,
    calls: AtomicUsize,
}

fn key(coords: Coordinates) -> String {
    let (lat, lon) = coords.to_query_pair();
    format!("{},{}", lat, lon)
}

impl StubProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, coords: Coordinates, reply: Reply) {
        self.replies.lock().unwrap().insert(key(coords), reply);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ForecastProvider for StubProvider {
    async fn get_forecast(&self, coords: Coordinates) -> Result<Forecast, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self
            .replies
            .lock()
            .unwrap()
            .get(&key(coords))
            .cloned()
            .unwrap_or(Reply::Status(404));

        match reply {
            Reply::Forecast(forecast) => Ok(forecast),
            Reply::Delayed(delay, forecast) => {
                tokio::time::sleep(delay).await;
                Ok(forecast)
            }
            Reply::Status(status) => Err(ProviderError::Status {
                status,
                body: "stubbed failure".to_string(),
            }),
            Reply::Hang => std::future::pending().await,
        }
    }
}

/// Memory storage that can be told to fail writes or reads for chosen locations
#[derive(Default)]
pub struct FlakyStorage {
    inner: MemoryStorage,
    failing_writes: Mutex<HashSet<Uuid>>,
    failing_reads: Mutex<HashSet<Uuid>>,
    deleted_before_write: Mutex<HashSet<Uuid>>,
    down: Mutex<bool>,
}

impl FlakyStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes_for(&self, location_id: Uuid) {
        self.failing_writes.lock().unwrap().insert(location_id);
    }

    pub fn fail_reads_for(&self, location_id: Uuid) {
        self.failing_reads.lock().unwrap().insert(location_id);
    }

    /// Untrack the location just before its forecast write lands
    pub fn delete_before_write(&self, location_id: Uuid) {
        self.deleted_before_write.lock().unwrap().insert(location_id);
    }

    pub fn take_down(&self) {
        *self.down.lock().unwrap() = true;
    }
}

#[async_trait]
impl Storage for FlakyStorage {
    async fn find_locations(&self, filter: LocationFilter) -> StorageResult<Vec<Location>> {
        self.inner.find_locations(filter).await
    }

    async fn create_location(&self, coords: Coordinates) -> StorageResult<Location> {
        self.inner.create_location(coords).await
    }

    async fn delete_locations(&self, filter: LocationFilter) -> StorageResult<u64> {
        self.inner.delete_locations(filter).await
    }

    async fn replace_forecast(&self, records: ForecastRecords) -> StorageResult<ForecastRecords> {
        if self
            .failing_writes
            .lock()
            .unwrap()
            .contains(&records.location_id())
        {
            return Err(StorageError::Unavailable("write rejected".to_string()));
        }
        let location_id = records.location_id();
        if self.deleted_before_write.lock().unwrap().contains(&location_id) {
            self.inner
                .delete_locations(LocationFilter::ById(location_id))
                .await?;
        }
        self.inner.replace_forecast(records).await
    }

    async fn find_forecast(&self, location_id: Uuid) -> StorageResult<Option<ForecastRecords>> {
        if self.failing_reads.lock().unwrap().contains(&location_id) {
            return Err(StorageError::Unavailable("read rejected".to_string()));
        }
        self.inner.find_forecast(location_id).await
    }

    async fn health_check(&self) -> StorageResult<()> {
        if *self.down.lock().unwrap() {
            return Err(StorageError::Unavailable("connection refused".to_string()));
        }
        self.inner.health_check().await
    }
}

/// Track the given coordinates and return the created locations
pub async fn track(storage: &dyn Storage, coords: &[Coordinates]) -> Vec<Location> {
    let mut locations = Vec::new();
    for c in coords {
        locations.push(storage.create_location(*c).await.unwrap());
    }
    locations
}

pub fn three_cities() -> Vec<Coordinates> {
    vec![
        Coordinates::new(40.7128, -74.006),
        Coordinates::new(51.5074, -0.1278),
        Coordinates::new(35.6762, 139.6503),
    ]
}

//! Storage collaborator for locations and forecast snapshots
//!
//! Queries take a closed set of typed filters instead of dynamic predicates.
//! Implementations must tolerate concurrent use from many workers.

use async_trait::async_trait;
use shared::{Coordinates, ForecastRecords, Location};
use thiserror::Error;
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStorage;
pub use postgres::PgStorage;

/// Storage failures
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Location already exists at {0}")]
    DuplicateLocation(Coordinates),

    #[error("Location {0} does not exist")]
    MissingLocation(Uuid),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Exact-match filter for location queries
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocationFilter {
    All,
    ById(Uuid),
    ByCoordinates(Coordinates),
}

impl LocationFilter {
    pub fn matches(&self, location: &Location) -> bool {
        match self {
            LocationFilter::All => true,
            LocationFilter::ById(id) => location.id == *id,
            LocationFilter::ByCoordinates(coords) => location.coordinates() == *coords,
        }
    }
}

#[async_trait]
pub trait Storage: Send + Sync {
    /// Locations matching the filter, oldest first
    async fn find_locations(&self, filter: LocationFilter) -> StorageResult<Vec<Location>>;

    /// Track a new location; a duplicate coordinate pair is rejected
    async fn create_location(&self, coords: Coordinates) -> StorageResult<Location>;

    /// Remove matching locations together with their snapshots
    async fn delete_locations(&self, filter: LocationFilter) -> StorageResult<u64>;

    /// Atomically replace the location's snapshot, series and units
    async fn replace_forecast(&self, records: ForecastRecords) -> StorageResult<ForecastRecords>;

    /// Current snapshot of a location, hourly rows in position order
    async fn find_forecast(&self, location_id: Uuid) -> StorageResult<Option<ForecastRecords>>;

    /// Liveness probe
    async fn health_check(&self) -> StorageResult<()>;
}

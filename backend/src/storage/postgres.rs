//! PostgreSQL storage backend

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::{
    Coordinates, ForecastRecord, ForecastRecords, HourlyRecord, HourlyUnitsRecord, Location,
};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{LocationFilter, Storage, StorageError, StorageResult};

const UNIQUE_VIOLATION: &str = "23505";

/// Storage backed by a PostgreSQL connection pool
#[derive(Clone)]
pub struct PgStorage {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct LocationRow {
    id: Uuid,
    latitude: f64,
    longitude: f64,
    created_at: DateTime<Utc>,
}

impl From<LocationRow> for Location {
    fn from(row: LocationRow) -> Self {
        Location {
            id: row.id,
            latitude: row.latitude,
            longitude: row.longitude,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct ForecastRow {
    id: Uuid,
    location_id: Uuid,
    generationtime_ms: f64,
    utc_offset_seconds: i64,
    timezone: String,
    timezone_abbreviation: String,
    elevation: f64,
    fetched_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct HourlyRow {
    forecast_id: Uuid,
    position: i32,
    time: String,
    temperature_2m: f64,
}

#[derive(Debug, FromRow)]
struct HourlyUnitsRow {
    forecast_id: Uuid,
    time_unit: String,
    temperature_2m_unit: String,
}

impl PgStorage {
    /// Create a new PgStorage over an existing pool
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

/// Append the WHERE clause for a location filter
fn push_location_filter(query: &mut QueryBuilder<'_, Postgres>, filter: LocationFilter) {
    match filter {
        LocationFilter::All => {}
        LocationFilter::ById(id) => {
            query.push(" WHERE id = ").push_bind(id);
        }
        LocationFilter::ByCoordinates(coords) => {
            query
                .push(" WHERE latitude = ")
                .push_bind(coords.latitude)
                .push(" AND longitude = ")
                .push_bind(coords.longitude);
        }
    }
}

fn has_code(err: &sqlx::Error, code: &str) -> bool {
    err.as_database_error()
        .and_then(|e| e.code())
        .map(|c| c == code)
        .unwrap_or(false)
}

#[async_trait]
impl Storage for PgStorage {
    async fn find_locations(&self, filter: LocationFilter) -> StorageResult<Vec<Location>> {
        let mut query =
            QueryBuilder::new("SELECT id, latitude, longitude, created_at FROM locations");
        push_location_filter(&mut query, filter);
        query.push(" ORDER BY created_at, id");

        let rows = query
            .build_query_as::<LocationRow>()
            .fetch_all(&self.db)
            .await?;

        Ok(rows.into_iter().map(Location::from).collect())
    }

    async fn create_location(&self, coords: Coordinates) -> StorageResult<Location> {
        let row = sqlx::query_as::<_, LocationRow>(
            r#"
            INSERT INTO locations (latitude, longitude)
            VALUES ($1, $2)
            RETURNING id, latitude, longitude, created_at
            "#,
        )
        .bind(coords.latitude)
        .bind(coords.longitude)
        .fetch_one(&self.db)
        .await
        .map_err(|e| {
            if has_code(&e, UNIQUE_VIOLATION) {
                StorageError::DuplicateLocation(coords)
            } else {
                StorageError::Database(e)
            }
        })?;

        Ok(row.into())
    }

    async fn delete_locations(&self, filter: LocationFilter) -> StorageResult<u64> {
        let mut query = QueryBuilder::new("DELETE FROM locations");
        push_location_filter(&mut query, filter);

        // Snapshots, series and units go with the location (ON DELETE CASCADE)
        let result = query.build().execute(&self.db).await?;
        Ok(result.rows_affected())
    }

    async fn replace_forecast(&self, records: ForecastRecords) -> StorageResult<ForecastRecords> {
        let location_id = records.location_id();
        let forecast = &records.forecast;

        let mut tx = self.db.begin().await?;

        // Concurrent replaces for one location queue on this row lock
        let locked: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM locations WHERE id = $1 FOR UPDATE")
                .bind(location_id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Err(StorageError::MissingLocation(location_id));
        }

        sqlx::query("DELETE FROM forecasts WHERE location_id = $1")
            .bind(location_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO forecasts (id, location_id, generationtime_ms, utc_offset_seconds,
                                   timezone, timezone_abbreviation, elevation, fetched_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(forecast.id)
        .bind(location_id)
        .bind(forecast.generationtime_ms)
        .bind(forecast.utc_offset_seconds)
        .bind(&forecast.timezone)
        .bind(&forecast.timezone_abbreviation)
        .bind(forecast.elevation)
        .bind(forecast.fetched_at)
        .execute(&mut *tx)
        .await?;

        let positions: Vec<i32> = records.hourly.iter().map(|r| r.position).collect();
        let times: Vec<String> = records.hourly.iter().map(|r| r.time.clone()).collect();
        let temperatures: Vec<f64> = records.hourly.iter().map(|r| r.temperature_2m).collect();

        sqlx::query(
            r#"
            INSERT INTO hourly_temperatures (forecast_id, position, time, temperature_2m)
            SELECT $1, position, time, temperature_2m
            FROM UNNEST($2::int4[], $3::text[], $4::float8[]) AS t(position, time, temperature_2m)
            "#,
        )
        .bind(forecast.id)
        .bind(&positions)
        .bind(&times)
        .bind(&temperatures)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO hourly_units (forecast_id, time_unit, temperature_2m_unit)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(forecast.id)
        .bind(&records.units.time_unit)
        .bind(&records.units.temperature_2m_unit)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(records)
    }

    async fn find_forecast(&self, location_id: Uuid) -> StorageResult<Option<ForecastRecords>> {
        // One snapshot for all three reads so a concurrent replace is never torn
        let mut tx = self.db.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;

        let forecast = sqlx::query_as::<_, ForecastRow>(
            r#"
            SELECT id, location_id, generationtime_ms, utc_offset_seconds,
                   timezone, timezone_abbreviation, elevation, fetched_at
            FROM forecasts
            WHERE location_id = $1
            "#,
        )
        .bind(location_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(forecast) = forecast else {
            tx.commit().await?;
            return Ok(None);
        };

        let hourly = sqlx::query_as::<_, HourlyRow>(
            r#"
            SELECT forecast_id, position, time, temperature_2m
            FROM hourly_temperatures
            WHERE forecast_id = $1
            ORDER BY position
            "#,
        )
        .bind(forecast.id)
        .fetch_all(&mut *tx)
        .await?;

        let units = sqlx::query_as::<_, HourlyUnitsRow>(
            r#"
            SELECT forecast_id, time_unit, temperature_2m_unit
            FROM hourly_units
            WHERE forecast_id = $1
            "#,
        )
        .bind(forecast.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(ForecastRecords {
            forecast: ForecastRecord {
                id: forecast.id,
                location_id: forecast.location_id,
                generationtime_ms: forecast.generationtime_ms,
                utc_offset_seconds: forecast.utc_offset_seconds,
                timezone: forecast.timezone,
                timezone_abbreviation: forecast.timezone_abbreviation,
                elevation: forecast.elevation,
                fetched_at: forecast.fetched_at,
            },
            hourly: hourly
                .into_iter()
                .map(|row| HourlyRecord {
                    forecast_id: row.forecast_id,
                    position: row.position,
                    time: row.time,
                    temperature_2m: row.temperature_2m,
                })
                .collect(),
            units: HourlyUnitsRecord {
                forecast_id: units.forecast_id,
                time_unit: units.time_unit,
                temperature_2m_unit: units.temperature_2m_unit,
            },
        }))
    }

    async fn health_check(&self) -> StorageResult<()> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }
}

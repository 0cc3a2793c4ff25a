//! Forecast Tracker - Backend Server
//!
//! Serves location management and forecast refresh/read endpoints.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use forecast_tracker_backend::{
    config::{Config, StorageBackend},
    create_app,
    external::OpenMeteoClient,
    storage::{MemoryStorage, PgStorage, Storage},
    AppState,
};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "forecast_tracker_backend=debug,forecast_server=debug,tower_http=debug,sqlx=warn"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::load()?;

    tracing::info!("Starting Forecast Tracker Server");
    tracing::info!("Environment: {}", config.environment);

    let storage = connect_storage(&config).await?;

    let provider = OpenMeteoClient::new(
        config.forecast_api.base_url.clone(),
        config.forecast_api.request_timeout(),
    )?;
    tracing::info!("Forecast API: {}", config.forecast_api.base_url);

    // Create application state
    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    let state = AppState::new(storage, Arc::new(provider), config);

    // Build application
    let app = create_app(state);

    // Start server
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the configured storage backend
async fn connect_storage(config: &Config) -> anyhow::Result<Arc<dyn Storage>> {
    match config.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            Ok(Arc::new(MemoryStorage::new()))
        }
        StorageBackend::Postgres => {
            // Create database connection pool
            tracing::info!("Connecting to database...");
            let db_pool = PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .min_connections(config.database.min_connections)
                .acquire_timeout(Duration::from_secs(30))
                .connect(&config.database.url)
                .await?;

            tracing::info!("Database connection established");

            // Run migrations in development
            if config.environment == "development" {
                tracing::info!("Running database migrations...");
                sqlx::migrate!("./migrations").run(&db_pool).await?;
                tracing::info!("Migrations completed");
            }

            Ok(Arc::new(PgStorage::new(db_pool)))
        }
    }
}

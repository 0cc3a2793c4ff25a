//! Configuration management for the forecast tracker
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (config/development.toml, config/production.toml)
//! 3. Environment variable overrides with FORECAST__ prefix

use std::time::Duration;

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Storage backend selection
    pub storage: StorageConfig,

    /// Forecast provider configuration
    pub forecast_api: ForecastApiConfig,

    /// Fan-out settings for the all-locations operations
    pub aggregation: AggregationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    #[serde(default)]
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Postgres,
    Memory,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ForecastApiConfig {
    /// Base URL of the forecast API, without the `/forecast` path
    pub base_url: String,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AggregationConfig {
    /// Wall-clock deadline for an all-locations operation
    pub deadline_secs: u64,

    /// How long cancelled workers get to wind down before they are aborted
    pub cancel_grace_ms: u64,

    /// Upper bound on concurrently running workers (unbounded when absent)
    pub max_concurrency: Option<usize>,
}

impl AggregationConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }

    pub fn cancel_grace(&self) -> Duration {
        Duration::from_millis(self.cancel_grace_ms)
    }
}

impl ForecastApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("FORECAST__ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 8080)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("storage.backend", "postgres")?
            .set_default("forecast_api.base_url", "https://api.open-meteo.com/v1")?
            .set_default("forecast_api.request_timeout_secs", 30)?
            .set_default("aggregation.deadline_secs", 10)?
            .set_default("aggregation.cancel_grace_ms", 500)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (FORECAST__ prefix)
            .add_source(
                Environment::with_prefix("FORECAST")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the server cannot start with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port < 1024 {
            return Err(ConfigError::Message(format!(
                "server.port must be between 1024 and 65535, got {}",
                self.server.port
            )));
        }

        let base_url = self.forecast_api.base_url.as_str();
        match reqwest::Url::parse(base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "forecast_api.base_url must be an http(s) URL, got {:?}",
                    base_url
                )))
            }
        }

        if self.aggregation.deadline_secs == 0 {
            return Err(ConfigError::Message(
                "aggregation.deadline_secs must be positive".to_string(),
            ));
        }

        if self.aggregation.max_concurrency == Some(0) {
            return Err(ConfigError::Message(
                "aggregation.max_concurrency must be positive when set".to_string(),
            ));
        }

        if self.storage.backend == StorageBackend::Postgres && self.database.url.is_empty() {
            return Err(ConfigError::Message(
                "database.url is required for the postgres storage backend".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            server: ServerConfig::default(),
            database: DatabaseConfig {
                url: String::new(),
                max_connections: 10,
                min_connections: 2,
            },
            storage: StorageConfig {
                backend: StorageBackend::Memory,
            },
            forecast_api: ForecastApiConfig {
                base_url: "https://api.open-meteo.com/v1".to_string(),
                request_timeout_secs: 30,
            },
            aggregation: AggregationConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "0.0.0.0".to_string(),
        }
    }
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            deadline_secs: 10,
            cancel_grace_ms: 500,
            max_concurrency: None,
        }
    }
}

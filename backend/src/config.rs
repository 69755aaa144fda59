//! Configuration management for the Fishing Forecast service
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (config/development.toml, config/production.toml)
//! 3. Environment variable overrides with FFC_ prefix

use std::time::Duration;

use config::{ConfigError, Environment, File};
use serde::Deserialize;
use shared::aggregation::MAX_HORIZON_DAYS;
use shared::models::Species;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Upstream weather API configuration
    pub weather: WeatherConfig,

    /// Alert scheduler configuration
    pub scheduler: SchedulerConfig,

    /// Scoring defaults
    pub scoring: ScoringConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WeatherConfig {
    /// Open-Meteo forecast API endpoint
    pub api_endpoint: String,

    /// Open-Meteo marine API endpoint (sea surface temperature)
    pub marine_endpoint: String,

    /// Days of forecast to request
    pub forecast_days: u32,

    /// Per-request timeout in seconds
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SchedulerConfig {
    /// Run alert batches on a timer
    pub enabled: bool,

    /// Minutes between batches
    pub interval_minutes: u64,

    /// Profiles evaluated at the same time
    pub max_concurrency: usize,

    /// Upper bound on one condition fetch
    pub fetch_timeout_seconds: u64,

    /// Decimal places used to share fetches between nearby profiles
    pub coordinate_precision: u32,

    /// Optional JSON file of alert profiles loaded at startup
    #[serde(default)]
    pub profiles_path: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScoringConfig {
    /// Samples per aggregation window (8 x 15 min = 2 h)
    pub window_size_samples: usize,

    /// Species used when a request does not name one
    pub default_species: Species,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("FFC_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("weather.api_endpoint", "https://api.open-meteo.com/v1")?
            .set_default("weather.marine_endpoint", "https://marine-api.open-meteo.com/v1")?
            .set_default("weather.forecast_days", 7)?
            .set_default("weather.request_timeout_seconds", 10)?
            .set_default("scheduler.enabled", true)?
            .set_default("scheduler.interval_minutes", 15)?
            .set_default("scheduler.max_concurrency", 4)?
            .set_default("scheduler.fetch_timeout_seconds", 15)?
            .set_default("scheduler.coordinate_precision", 2)?
            .set_default("scoring.window_size_samples", 8)?
            .set_default("scoring.default_species", "general")?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (FFC_ prefix)
            .add_source(
                Environment::with_prefix("FFC")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the scheduler or aggregator cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.weather.forecast_days == 0 || self.weather.forecast_days as usize > MAX_HORIZON_DAYS {
            return Err(ConfigError::Message(format!(
                "weather.forecast_days must be between 1 and {}",
                MAX_HORIZON_DAYS
            )));
        }
        if self.scheduler.max_concurrency == 0 {
            return Err(ConfigError::Message(
                "scheduler.max_concurrency must be at least 1".into(),
            ));
        }
        if self.scheduler.interval_minutes == 0 {
            return Err(ConfigError::Message(
                "scheduler.interval_minutes must be at least 1".into(),
            ));
        }
        if self.scoring.window_size_samples == 0 {
            return Err(ConfigError::Message(
                "scoring.window_size_samples must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

impl SchedulerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes * 60)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_seconds)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_endpoint: "https://api.open-meteo.com/v1".to_string(),
            marine_endpoint: "https://marine-api.open-meteo.com/v1".to_string(),
            forecast_days: 7,
            request_timeout_seconds: 10,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_minutes: 15,
            max_concurrency: 4,
            fetch_timeout_seconds: 15,
            coordinate_precision: 2,
            profiles_path: None,
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            window_size_samples: 8,
            default_species: Species::General,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            server: ServerConfig::default(),
            weather: WeatherConfig::default(),
            scheduler: SchedulerConfig::default(),
            scoring: ScoringConfig::default(),
        }
    }
}

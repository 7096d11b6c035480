//! Application configuration management.

use chrono::{FixedOffset, Offset, Utc};
use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Reporting configuration.
    #[serde(default)]
    pub reporting: ReportingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Reporting configuration.
///
/// The business calendar runs on a fixed UTC offset, independent of the
/// timezone the server is deployed in.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportingConfig {
    /// Offset of the business calendar from UTC, in minutes.
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
    /// Page size used when a request does not specify one.
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
    /// Largest page size a request may ask for.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
}

fn default_utc_offset_minutes() -> i32 {
    330 // +05:30
}

fn default_page_size() -> u32 {
    100
}

fn default_max_page_size() -> u32 {
    500
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: default_utc_offset_minutes(),
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

impl ReportingConfig {
    /// Returns the business calendar offset.
    ///
    /// # Errors
    ///
    /// Returns an error if the offset is a day or more in either direction.
    pub fn utc_offset(&self) -> Result<FixedOffset, config::ConfigError> {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                config::ConfigError::Message(format!(
                    "reporting.utc_offset_minutes must be within one day of UTC, got {}",
                    self.utc_offset_minutes
                ))
            })
    }

    /// Checks the offset and page sizes.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid setting.
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        self.utc_offset()?;
        if self.max_page_size == 0 {
            return Err(config::ConfigError::Message(
                "reporting.max_page_size must be at least 1".to_string(),
            ));
        }
        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            return Err(config::ConfigError::Message(format!(
                "reporting.default_page_size must be between 1 and {}, got {}",
                self.max_page_size, self.default_page_size
            )));
        }
        Ok(())
    }
}

/// The default business calendar offset, UTC+05:30.
#[must_use]
pub fn business_offset() -> FixedOffset {
    FixedOffset::east_opt(default_utc_offset_minutes() * 60).unwrap_or_else(|| Utc.fix())
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded or the reporting
    /// settings are invalid.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("WARPLINE").separator("__"))
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.reporting.validate()?;
        Ok(config)
    }
}

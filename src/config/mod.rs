//! Configuration management
//!
//! This module handles loading and parsing configuration for Larder.
//! Configuration can be loaded from:
//! - config.yml file
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults.

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Session configuration
    #[serde(default)]
    pub session: SessionConfig,
    /// Validation bounds and download settings
    #[serde(default)]
    pub limits: LimitsConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database driver (sqlite or mysql)
    #[serde(default)]
    pub driver: DatabaseDriver,
    /// Database connection URL
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/larder.db".to_string()
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    /// SQLite (default)
    #[default]
    Sqlite,
    /// MySQL
    Mysql,
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Token lifetime in days
    #[serde(default = "default_session_ttl_days")]
    pub ttl_days: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_days: default_session_ttl_days(),
        }
    }
}

fn default_session_ttl_days() -> i64 {
    30
}

/// Bounds applied when validating recipe submissions, plus the
/// shopping list attachment name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_cooking_time_min")]
    pub cooking_time_min: i64,
    #[serde(default = "default_cooking_time_max")]
    pub cooking_time_max: i64,
    #[serde(default = "default_ingredient_amount_min")]
    pub ingredient_amount_min: i64,
    #[serde(default = "default_ingredient_amount_max")]
    pub ingredient_amount_max: i64,
    #[serde(default = "default_shopping_list_file_name")]
    pub shopping_list_file_name: String,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            cooking_time_min: default_cooking_time_min(),
            cooking_time_max: default_cooking_time_max(),
            ingredient_amount_min: default_ingredient_amount_min(),
            ingredient_amount_max: default_ingredient_amount_max(),
            shopping_list_file_name: default_shopping_list_file_name(),
        }
    }
}

fn default_cooking_time_min() -> i64 {
    1
}

fn default_cooking_time_max() -> i64 {
    32000
}

fn default_ingredient_amount_min() -> i64 {
    1
}

fn default_ingredient_amount_max() -> i64 {
    32000
}

fn default_shopping_list_file_name() -> String {
    "shopping_list.txt".to_string()
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError {
        path: String,
        message: String,
    },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&content).map_err(|e| {
            ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            }
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern:
    /// - LARDER_SERVER_HOST
    /// - LARDER_SERVER_PORT
    /// - LARDER_SERVER_CORS_ORIGIN
    /// - LARDER_DATABASE_DRIVER
    /// - LARDER_DATABASE_URL
    /// - LARDER_SESSION_TTL_DAYS
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Reject bounds that can never be satisfied
    pub fn validate(&self) -> Result<(), ConfigError> {
        let limits = &self.limits;
        if limits.cooking_time_min > limits.cooking_time_max {
            return Err(ConfigError::ValidationError(format!(
                "limits.cooking_time_min ({}) exceeds limits.cooking_time_max ({})",
                limits.cooking_time_min, limits.cooking_time_max
            )));
        }
        if limits.ingredient_amount_min > limits.ingredient_amount_max {
            return Err(ConfigError::ValidationError(format!(
                "limits.ingredient_amount_min ({}) exceeds limits.ingredient_amount_max ({})",
                limits.ingredient_amount_min, limits.ingredient_amount_max
            )));
        }
        if limits.ingredient_amount_min < 1 {
            return Err(ConfigError::ValidationError(
                "limits.ingredient_amount_min must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("LARDER_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("LARDER_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Ok(cors_origin) = std::env::var("LARDER_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }

        if let Ok(driver) = std::env::var("LARDER_DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "mysql" => self.database.driver = DatabaseDriver::Mysql,
                _ => {} // Ignore invalid values
            }
        }
        if let Ok(url) = std::env::var("LARDER_DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(ttl) = std::env::var("LARDER_SESSION_TTL_DAYS") {
            if let Ok(ttl) = ttl.parse::<i64>() {
                self.session.ttl_days = ttl;
            }
        }
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared mutex for all config tests that modify environment variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

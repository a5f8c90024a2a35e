//! # Service Configuration
//!
//! Configuration for the TDS API server.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TDS_PORT=9000                                                      │
//! │     TDS_DATABASE_PATH=/var/lib/tds/tds.db                              │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     $TDS_CONFIG, or ./tds.toml                                         │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     0.0.0.0:8080, ./tds.db, 30,000 / 1,00,000 thresholds               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # tds.toml
//! [server]
//! bind_addr = "127.0.0.1"
//! port = 8080
//!
//! [database]
//! path = "tds.db"
//! max_connections = 5
//! run_migrations = true
//!
//! [thresholds]
//! per_campaign_rupees = 30000
//! cumulative_rupees = 100000
//! warning_percent = 90
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tds_core::validation::{validate_thresholds, validate_warning_percent};
use tds_core::{Money, Thresholds, ValidationError, NEAR_THRESHOLD_WARNING_PERCENT};
use tds_db::DbConfig;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "TDS_CONFIG";

/// Config file looked up in the working directory when none is named.
const DEFAULT_CONFIG_FILE: &str = "tds.toml";

// =============================================================================
// Config Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Invalid configuration: {0}")]
    Validation(#[from] ValidationError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Server Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (default: 0.0.0.0 for all interfaces).
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_addr: default_bind_addr(),
            port: default_port(),
        }
    }
}

// =============================================================================
// Database Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file path. Created if missing.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Apply embedded migrations on startup.
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("tds.db")
}

fn default_max_connections() -> u32 {
    5
}

fn default_true() -> bool {
    true
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            path: default_database_path(),
            max_connections: default_max_connections(),
            run_migrations: true,
        }
    }
}

// =============================================================================
// Threshold Settings
// =============================================================================

/// Regulatory thresholds, in whole rupees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdConfig {
    #[serde(default = "default_per_campaign")]
    pub per_campaign_rupees: i64,

    #[serde(default = "default_cumulative")]
    pub cumulative_rupees: i64,

    /// Near-threshold alerts start at this percentage of the cumulative
    /// threshold.
    #[serde(default = "default_warning_percent")]
    pub warning_percent: u8,
}

fn default_per_campaign() -> i64 {
    tds_core::DEFAULT_PER_CAMPAIGN_THRESHOLD.rupees()
}

fn default_cumulative() -> i64 {
    tds_core::DEFAULT_CUMULATIVE_THRESHOLD.rupees()
}

fn default_warning_percent() -> u8 {
    NEAR_THRESHOLD_WARNING_PERCENT
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        ThresholdConfig {
            per_campaign_rupees: default_per_campaign(),
            cumulative_rupees: default_cumulative(),
            warning_percent: default_warning_percent(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TdsConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub thresholds: ThresholdConfig,
}

impl TdsConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`config_path`, `$TDS_CONFIG`, or `./tds.toml`)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        let path = config_path
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        if path.exists() {
            info!(?path, "Loading config from file");
            let contents = std::fs::read_to_string(&path)?;
            config = toml::from_str(&contents)?;
        } else {
            debug!(?path, "Config file not found, using defaults");
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must be greater than 0".into()));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        validate_thresholds(&self.thresholds())?;
        validate_warning_percent(self.thresholds.warning_percent)?;

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from a key lookup (the process environment in
    /// production). Unparseable values are logged and ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(port) = lookup("TDS_PORT") {
            match port.parse::<u16>() {
                Ok(p) => {
                    debug!(port = p, "Overriding port from environment");
                    self.server.port = p;
                }
                Err(_) => warn!(value = %port, "Ignoring invalid TDS_PORT"),
            }
        }

        if let Some(addr) = lookup("TDS_BIND_ADDR") {
            self.server.bind_addr = addr;
        }

        if let Some(path) = lookup("TDS_DATABASE_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(value) = lookup("TDS_PER_CAMPAIGN_THRESHOLD") {
            match value.parse::<i64>() {
                Ok(rupees) => self.thresholds.per_campaign_rupees = rupees,
                Err(_) => warn!(value = %value, "Ignoring invalid TDS_PER_CAMPAIGN_THRESHOLD"),
            }
        }

        if let Some(value) = lookup("TDS_CUMULATIVE_THRESHOLD") {
            match value.parse::<i64>() {
                Ok(rupees) => self.thresholds.cumulative_rupees = rupees,
                Err(_) => warn!(value = %value, "Ignoring invalid TDS_CUMULATIVE_THRESHOLD"),
            }
        }
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Returns the `addr:port` the listener binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.bind_addr, self.server.port)
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            per_campaign: Money::from_rupees(self.thresholds.per_campaign_rupees),
            cumulative: Money::from_rupees(self.thresholds.cumulative_rupees),
        }
    }

    pub fn warning_percent(&self) -> u8 {
        self.thresholds.warning_percent
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database.path)
            .max_connections(self.database.max_connections)
            .run_migrations(self.database.run_migrations)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

//! Service configuration
//!
//! Loaded from optional TOML files and environment overrides, then turned
//! into typed [`ServiceSettings`] once at startup.

use crate::error::ApiError;
use checkin_core::constants::{
    DEFAULT_METERS_PER_LAP, RECORD_TIME_FORMAT, SCAN_EVENTS_TABLE, USERS_TABLE,
};
use checkin_storage::{DatabaseConfig, TimeColumn};
use chrono::{NaiveDateTime, NaiveTime};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Listening address
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Database file and table allow-list
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub path: String,
    pub max_connections: u32,
    pub allowed_tables: Vec<String>,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: "checkin.db".to_string(),
            max_connections: 10,
            allowed_tables: vec![USERS_TABLE.to_string(), SCAN_EVENTS_TABLE.to_string()],
        }
    }
}

impl DatabaseSettings {
    pub fn to_database_config(&self) -> DatabaseConfig {
        DatabaseConfig::new(self.path.clone())
            .max_connections(self.max_connections)
            .min_connections(self.max_connections.min(2))
            .allow_tables(self.allowed_tables.iter().cloned())
    }
}

/// Daily window in which scans are accepted, as `HH:MM[:SS]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HoursConfig {
    pub open: String,
    pub close: String,
}

impl Default for HoursConfig {
    fn default() -> Self {
        Self {
            open: "07:00".to_string(),
            close: "21:00".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Start of the ranking window, `YYYY-MM-DD HH:MM:SS`
    pub start: String,
    /// Rank by insertion time instead of reader time
    pub display_time_acquisition: bool,
    pub meters_per_lap: i64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            start: "2026-01-01 00:00:00".to_string(),
            display_time_acquisition: false,
            meters_per_lap: DEFAULT_METERS_PER_LAP,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter, overridden by `RUST_LOG`
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseSettings,
    pub hours: HoursConfig,
    pub ranking: RankingConfig,
    pub log: LogConfig,
}

impl AppConfig {
    /// Load configuration; later sources override earlier ones:
    ///
    /// 1. `config/default.toml`
    /// 2. `config/{CHECKIN_ENV}.toml`
    /// 3. environment variables, e.g. `CHECKIN__SERVER__PORT=9000`
    ///
    /// Every file is optional. `CONFIG_DIR` moves the file directory.
    pub fn load() -> Result<Self, ApiError> {
        let env = std::env::var("CHECKIN_ENV").unwrap_or_else(|_| "development".to_string());
        let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());

        let config = Config::builder()
            .add_source(File::from(Path::new(&config_dir).join("default.toml")).required(false))
            .add_source(
                File::from(Path::new(&config_dir).join(format!("{env}.toml"))).required(false),
            )
            .add_source(
                Environment::with_prefix("CHECKIN")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("database.allowed_tables")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Parse the textual settings the handlers need
    pub fn settings(&self) -> Result<ServiceSettings, ApiError> {
        let ranking_start = NaiveDateTime::parse_from_str(&self.ranking.start, RECORD_TIME_FORMAT)
            .map_err(|e| ApiError::InvalidSetting {
                key: "ranking.start".to_string(),
                reason: e.to_string(),
            })?;

        if self.ranking.meters_per_lap < 0 {
            return Err(ApiError::InvalidSetting {
                key: "ranking.meters_per_lap".to_string(),
                reason: "must not be negative".to_string(),
            });
        }

        Ok(ServiceSettings {
            hours: OpeningHours::parse(&self.hours.open, &self.hours.close)?,
            ranking_start,
            time_column: TimeColumn::from_record_time_flag(self.ranking.display_time_acquisition),
            meters_per_lap: self.ranking.meters_per_lap,
        })
    }
}

/// Typed settings shared by the request handlers
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceSettings {
    pub hours: OpeningHours,
    pub ranking_start: NaiveDateTime,
    pub time_column: TimeColumn,
    pub meters_per_lap: i64,
}

/// Half-open daily window `[open, close)`
///
/// When `close` is before `open` the window spans midnight. Equal bounds
/// never open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpeningHours {
    pub open: NaiveTime,
    pub close: NaiveTime,
}

impl OpeningHours {
    pub fn new(open: NaiveTime, close: NaiveTime) -> Self {
        Self { open, close }
    }

    pub fn parse(open: &str, close: &str) -> Result<Self, ApiError> {
        Ok(Self {
            open: parse_time("hours.open", open)?,
            close: parse_time("hours.close", close)?,
        })
    }

    pub fn is_open(&self, now: NaiveTime) -> bool {
        if self.open <= self.close {
            self.open <= now && now < self.close
        } else {
            now >= self.open || now < self.close
        }
    }
}

fn parse_time(key: &str, value: &str) -> Result<NaiveTime, ApiError> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map_err(|e| ApiError::InvalidSetting {
            key: key.to_string(),
            reason: format!("'{value}': {e}"),
        })
}

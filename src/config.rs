use chrono::{FixedOffset, NaiveTime, Offset, Utc};
use config::ConfigError;
use secrecy::Secret;
use serde::de::DeserializeOwned;
use std::time::Duration;

pub const DEFAULT_LATE_THRESHOLD: &str = "08:00:00";
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 7;
pub const DEFAULT_STORAGE_TIMEOUT_MS: u64 = 5_000;
const STORAGE_TIMEOUT_GRACE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Secret<String>,
    pub database_max_connections: u32,
    pub host: String,
    pub port: u16,

    // Directory served at /uploads (member photos)
    pub uploads_dir: String,

    pub policy: AttendancePolicy,
}

/// Settings the attendance core reads on every scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttendancePolicy {
    /// Opening a cycle after this time-of-day is late
    pub late_threshold: NaiveTime,
    /// Whether a scan exactly at the threshold counts as late
    pub late_at_threshold: bool,
    pub utc_offset: FixedOffset,
    /// Ceiling for each storage call made while resolving a scan
    pub storage_timeout: Duration,
}

impl Default for AttendancePolicy {
    fn default() -> Self {
        Self {
            late_threshold: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default(),
            late_at_threshold: false,
            utc_offset: offset_from_hours(DEFAULT_UTC_OFFSET_HOURS).unwrap_or(Utc.fix()),
            storage_timeout: Duration::from_millis(DEFAULT_STORAGE_TIMEOUT_MS),
        }
    }
}

impl AttendancePolicy {
    /// Client-side ceiling for a storage call. It outlasts the server-side
    /// `statement_timeout` so the database aborts a slow statement first.
    pub fn call_timeout(&self) -> Duration {
        self.storage_timeout + STORAGE_TIMEOUT_GRACE
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if it exists (for local development)
        let _ = dotenvy::dotenv();

        let config = config::Config::builder()
            .add_source(config::Environment::default().separator("__"))
            .build()?;

        Self::from_settings(&config)
    }

    /// Reads every key from already-built settings. Absent keys take their
    /// defaults; present but malformed ones are errors.
    pub fn from_settings(config: &config::Config) -> Result<Self, ConfigError> {
        let late_threshold = parse_threshold(
            &optional::<String>(config, "late_threshold")?
                .unwrap_or_else(|| DEFAULT_LATE_THRESHOLD.to_string()),
        )?;

        let utc_offset_hours = optional::<i64>(config, "utc_offset_hours")?
            .unwrap_or(DEFAULT_UTC_OFFSET_HOURS as i64);
        let utc_offset = i32::try_from(utc_offset_hours)
            .ok()
            .and_then(offset_from_hours)
            .ok_or_else(|| {
                ConfigError::Message(format!(
                    "UTC_OFFSET_HOURS must be between -23 and 23, got {}",
                    utc_offset_hours
                ))
            })?;

        Ok(Self {
            database_url: Secret::new(config.get("database_url")?),
            database_max_connections: optional(config, "database_max_connections")?.unwrap_or(10),
            host: optional(config, "host")?.unwrap_or_else(|| "0.0.0.0".to_string()),
            port: optional(config, "port")?.unwrap_or(5000),

            uploads_dir: optional(config, "uploads_dir")?.unwrap_or_else(|| "uploads".to_string()),

            policy: AttendancePolicy {
                late_threshold,
                late_at_threshold: optional(config, "late_at_threshold")?.unwrap_or(false),
                utc_offset,
                storage_timeout: Duration::from_millis(
                    optional(config, "storage_timeout_ms")?.unwrap_or(DEFAULT_STORAGE_TIMEOUT_MS),
                ),
            },
        })
    }
}

fn optional<T: DeserializeOwned>(
    config: &config::Config,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    match config.get::<T>(key) {
        Ok(value) => Ok(Some(value)),
        Err(ConfigError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Parses an `HH:MM:SS` time-of-day
pub fn parse_threshold(value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M:%S").map_err(|e| {
        ConfigError::Message(format!(
            "LATE_THRESHOLD must be HH:MM:SS, got {:?}: {}",
            value, e
        ))
    })
}

pub fn offset_from_hours(hours: i32) -> Option<FixedOffset> {
    if !(-23..=23).contains(&hours) {
        return None;
    }
    FixedOffset::east_opt(hours * 3600)
}

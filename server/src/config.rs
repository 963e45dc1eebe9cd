use chrono::{FixedOffset, Local, Offset, Utc};
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_SOURCE_URL: &str = "https://www.wind24.it/cattolica/history";

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_source_url")]
    pub source_url: String,
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_duplicate_tolerance_ms")]
    pub duplicate_tolerance_ms: u64,
    #[serde(default = "default_retention_limit")]
    pub retention_limit: usize,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// Attempts per scrape, including the first.
    #[serde(default = "default_fetch_attempts")]
    pub fetch_attempts: u32,
    /// Offset of the wall-clock times published by the source.
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
}

fn default_source_url() -> String {
    DEFAULT_SOURCE_URL.to_string()
}

fn default_refresh_interval_secs() -> u64 {
    60
}

fn default_duplicate_tolerance_ms() -> u64 {
    30_000
}

fn default_retention_limit() -> usize {
    60
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

fn default_fetch_attempts() -> u32 {
    3
}

fn default_utc_offset_minutes() -> i32 {
    Local::now().offset().fix().local_minus_utc() / 60
}

impl Default for Config {
    fn default() -> Self {
        Config {
            source_url: default_source_url(),
            refresh_interval_secs: default_refresh_interval_secs(),
            duplicate_tolerance_ms: default_duplicate_tolerance_ms(),
            retention_limit: default_retention_limit(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            fetch_attempts: default_fetch_attempts(),
            utc_offset_minutes: default_utc_offset_minutes(),
        }
    }
}

impl Config {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Falls back to UTC when the configured offset is out of range.
    pub fn source_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).unwrap_or_else(|| {
            log::warn!(
                "Invalid WINDLOG_UTC_OFFSET_MINUTES={}, using UTC",
                self.utc_offset_minutes
            );
            Utc.fix()
        })
    }
}

pub static CONFIG: Lazy<Config> = Lazy::new(|| {
    envy::prefixed("WINDLOG_")
        .from_env::<Config>()
        .unwrap_or_else(|e| {
            log::warn!("Invalid WINDLOG_* configuration ({}), using defaults", e);
            Config::default()
        })
});

pub fn config() -> &'static Config {
    &CONFIG
}

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::domain::errors::{ConfigError, ConfigResult};
use crate::domain::models::time_unit::TimeUnit;

/// Main configuration structure for carapace
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Timing wrapper configuration
    #[serde(default)]
    pub timing: TimingConfig,

    /// Retry policy configuration
    #[serde(default)]
    pub retry: RetryConfig,

    /// TTL cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for log files (logs only to stderr when unset)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Log file rotation policy
    #[serde(default)]
    pub rotation: RotationPolicy,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: RotationPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    #[default]
    Daily,
    Hourly,
    Never,
}

/// Timing wrapper configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TimingConfig {
    /// Label used in report lines
    #[serde(default)]
    pub label: Option<String>,

    /// Reporting unit: s, ms or us
    #[serde(default = "default_time_unit")]
    pub unit: String,
}

fn default_time_unit() -> String {
    TimeUnit::default().as_str().to_string()
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            label: None,
            unit: default_time_unit(),
        }
    }
}

impl TimingConfig {
    pub fn time_unit(&self) -> ConfigResult<TimeUnit> {
        self.unit.parse()
    }
}

/// Retry policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    /// Delay before the second attempt, in milliseconds
    #[serde(default)]
    pub delay_ms: u64,

    /// Multiplier applied to the delay after every failed attempt
    #[serde(default = "default_backoff")]
    pub backoff: f64,

    /// Upper bound of the random delay added to every wait, in milliseconds
    #[serde(default)]
    pub jitter_ms: u64,
}

const fn default_attempts() -> u32 {
    3
}

const fn default_backoff() -> f64 {
    1.0
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            delay_ms: 0,
            backoff: default_backoff(),
            jitter_ms: 0,
        }
    }
}

impl RetryConfig {
    pub const fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub const fn jitter(&self) -> Duration {
        Duration::from_millis(self.jitter_ms)
    }
}

/// TTL cache configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CacheConfig {
    /// Entry lifetime in milliseconds; entries never expire when unset
    #[serde(default)]
    pub ttl_ms: Option<u64>,
}

impl CacheConfig {
    pub fn ttl(&self) -> ConfigResult<Option<Duration>> {
        match self.ttl_ms {
            Some(0) => Err(ConfigError::InvalidTtl(
                "ttl_ms must be positive; leave it unset for entries that never expire"
                    .to_string(),
            )),
            Some(ms) => Ok(Some(Duration::from_millis(ms))),
            None => Ok(None),
        }
    }
}

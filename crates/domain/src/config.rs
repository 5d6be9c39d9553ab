//! Configuration structures
//!
//! Every section and field has a default so that a partial file (or no file
//! at all) still produces a usable configuration. Durations are expressed in
//! whole seconds.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BACKOFF_JITTER, DEFAULT_BACKOFF_MAX, DEFAULT_BACKOFF_MIN, DEFAULT_ERROR_TIME,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_USER_AGENT, DEFAULT_WARNING_TIME, DEFAULT_WATCHDOG_DIR,
    DORMANT_INTERVAL_MAX, DORMANT_INTERVAL_MIN, STILL_RUNNING_INTERVAL,
};
use crate::errors::{DeferqError, Result};

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub deferred: DeferredConfig,
    pub transport: TransportConfig,
    pub watchdog: WatchdogConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Validate cross-field constraints.
    ///
    /// # Errors
    /// Returns `DeferqError::Config` describing the first violated
    /// constraint.
    pub fn validate(&self) -> Result<()> {
        self.deferred.validate()?;
        self.transport.validate()
    }
}

/// Deferred queue timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeferredConfig {
    pub backoff_min_seconds: u64,
    pub backoff_max_seconds: u64,
    pub jitter: f64,
    pub idle_min_seconds: u64,
    pub idle_max_seconds: u64,
    pub still_running_seconds: u64,
    pub warning_seconds: u64,
    pub error_seconds: u64,
}

impl Default for DeferredConfig {
    fn default() -> Self {
        Self {
            backoff_min_seconds: DEFAULT_BACKOFF_MIN.as_secs(),
            backoff_max_seconds: DEFAULT_BACKOFF_MAX.as_secs(),
            jitter: DEFAULT_BACKOFF_JITTER,
            idle_min_seconds: DORMANT_INTERVAL_MIN.as_secs(),
            idle_max_seconds: DORMANT_INTERVAL_MAX.as_secs(),
            still_running_seconds: STILL_RUNNING_INTERVAL.as_secs(),
            warning_seconds: DEFAULT_WARNING_TIME.as_secs(),
            error_seconds: DEFAULT_ERROR_TIME.as_secs(),
        }
    }
}

impl DeferredConfig {
    pub fn backoff_min(&self) -> Duration {
        Duration::from_secs(self.backoff_min_seconds)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_secs(self.backoff_max_seconds)
    }

    pub fn idle_min(&self) -> Duration {
        Duration::from_secs(self.idle_min_seconds)
    }

    pub fn idle_max(&self) -> Duration {
        Duration::from_secs(self.idle_max_seconds)
    }

    pub fn still_running_interval(&self) -> Duration {
        Duration::from_secs(self.still_running_seconds)
    }

    pub fn warning_time(&self) -> Duration {
        Duration::from_secs(self.warning_seconds)
    }

    pub fn error_time(&self) -> Duration {
        Duration::from_secs(self.error_seconds)
    }

    fn validate(&self) -> Result<()> {
        if self.backoff_min_seconds == 0 {
            return Err(DeferqError::Config("backoff_min_seconds must be positive".into()));
        }
        if self.backoff_min_seconds > self.backoff_max_seconds {
            return Err(DeferqError::Config(format!(
                "backoff_min_seconds ({}) exceeds backoff_max_seconds ({})",
                self.backoff_min_seconds, self.backoff_max_seconds
            )));
        }
        if self.idle_min_seconds > self.idle_max_seconds {
            return Err(DeferqError::Config(format!(
                "idle_min_seconds ({}) exceeds idle_max_seconds ({})",
                self.idle_min_seconds, self.idle_max_seconds
            )));
        }
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(DeferqError::Config(format!(
                "jitter must be within [0, 1], got {}",
                self.jitter
            )));
        }
        if self.still_running_seconds == 0 {
            return Err(DeferqError::Config("still_running_seconds must be positive".into()));
        }
        if self.warning_seconds > self.error_seconds {
            return Err(DeferqError::Config(format!(
                "warning_seconds ({}) exceeds error_seconds ({})",
                self.warning_seconds, self.error_seconds
            )));
        }
        Ok(())
    }
}

/// Transmission settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Local addresses to bind outgoing requests to, one per uplink. Empty
    /// means a single client using the default route.
    pub interfaces: Vec<String>,
    pub request_timeout_seconds: u64,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            interfaces: Vec::new(),
            request_timeout_seconds: DEFAULT_REQUEST_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl TransportConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    fn validate(&self) -> Result<()> {
        if self.request_timeout_seconds == 0 {
            return Err(DeferqError::Config("request_timeout_seconds must be positive".into()));
        }
        Ok(())
    }
}

/// File watchdog settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchdogConfig {
    pub directory: String,
    pub enabled: bool,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self { directory: DEFAULT_WATCHDOG_DIR.to_string(), enabled: true }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence when set.
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_queue_constants() {
        let config = Config::default();
        assert_eq!(config.deferred.backoff_min(), Duration::from_secs(60));
        assert_eq!(config.deferred.backoff_max(), Duration::from_secs(900));
        assert!((config.deferred.jitter - 0.3).abs() < f64::EPSILON);
        assert_eq!(config.deferred.idle_min(), Duration::from_secs(86_400));
        assert_eq!(config.deferred.idle_max(), Duration::from_secs(172_800));
        assert_eq!(config.deferred.still_running_interval(), Duration::from_secs(25));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_inverted_backoff_range() {
        let mut config = Config::default();
        config.deferred.backoff_min_seconds = 1_000;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, DeferqError::Config(msg) if msg.contains("backoff_min_seconds")));
    }

    #[test]
    fn rejects_out_of_range_jitter() {
        let mut config = Config::default();
        config.deferred.jitter = 1.5;
        assert!(config.validate().is_err());
        config.deferred.jitter = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_request_timeout() {
        let mut config = Config::default();
        config.transport.request_timeout_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{ "deferred": { "backoff_max_seconds": 300 } }"#).unwrap();
        assert_eq!(config.deferred.backoff_max_seconds, 300);
        assert_eq!(config.deferred.backoff_min_seconds, 60);
        assert_eq!(config.watchdog, WatchdogConfig::default());
    }
}

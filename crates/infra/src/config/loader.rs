//! Configuration loader
//!
//! ## Loading Strategy
//! 1. If any `DEFERQ_*` variable is set, build the configuration from the
//!    environment, overlaid on defaults
//! 2. Otherwise load from a file
//! 3. Search multiple paths for config files
//! 4. Support JSON and TOML formats
//!
//! Whatever the source, the result is validated before it is returned.
//!
//! ## Environment Variables
//! - `DEFERQ_BACKOFF_MIN_SECONDS`, `DEFERQ_BACKOFF_MAX_SECONDS`: active retry
//!   range
//! - `DEFERQ_JITTER`: jitter fraction in `[0, 1]`
//! - `DEFERQ_IDLE_MIN_SECONDS`, `DEFERQ_IDLE_MAX_SECONDS`: dormant range
//! - `DEFERQ_STILL_RUNNING_SECONDS`: liveness report period
//! - `DEFERQ_WARNING_SECONDS`, `DEFERQ_ERROR_SECONDS`: round budgets
//! - `DEFERQ_INTERFACES`: comma-separated local bind addresses
//! - `DEFERQ_REQUEST_TIMEOUT_SECONDS`: per-request timeout
//! - `DEFERQ_USER_AGENT`: HTTP user agent
//! - `DEFERQ_WATCHDOG_DIR`: directory for watchdog touch files
//! - `DEFERQ_WATCHDOG_ENABLED`: whether touch files are written (true/false)
//! - `DEFERQ_LOG_LEVEL`: default log filter
//! - `DEFERQ_LOG_JSON`: JSON log output (true/false)
//!
//! ## File Locations
//! The loader searches the following paths (in order):
//! 1. `./deferq.toml`, `./deferq.json`, `./config.toml`, `./config.json`
//! 2. The same names in `..` and `../..`
//! 3. The same names relative to the executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use deferq_domain::{Config, DeferqError, Result};

use crate::errors::InfraError;

const ENV_PREFIX: &str = "DEFERQ_";
const CONFIG_FILE_NAMES: [&str; 4] = ["deferq.toml", "deferq.json", "config.toml", "config.json"];

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `DeferqError::Config` if:
/// - Neither the environment nor a file provides a configuration
/// - File format is invalid
/// - A value fails validation
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from `DEFERQ_*` environment variables
///
/// Unset variables keep their defaults, but at least one variable must be
/// present.
///
/// # Errors
/// Returns `DeferqError::Config` if no variable is set, a value cannot be
/// parsed, or the result fails validation.
pub fn load_from_env() -> Result<Config> {
    if !std::env::vars_os().any(|(key, _)| key.to_string_lossy().starts_with(ENV_PREFIX)) {
        return Err(DeferqError::Config(format!("no {ENV_PREFIX}* environment variables set")));
    }

    let mut config = Config::default();

    let deferred = &mut config.deferred;
    overlay(&mut deferred.backoff_min_seconds, "DEFERQ_BACKOFF_MIN_SECONDS")?;
    overlay(&mut deferred.backoff_max_seconds, "DEFERQ_BACKOFF_MAX_SECONDS")?;
    overlay(&mut deferred.jitter, "DEFERQ_JITTER")?;
    overlay(&mut deferred.idle_min_seconds, "DEFERQ_IDLE_MIN_SECONDS")?;
    overlay(&mut deferred.idle_max_seconds, "DEFERQ_IDLE_MAX_SECONDS")?;
    overlay(&mut deferred.still_running_seconds, "DEFERQ_STILL_RUNNING_SECONDS")?;
    overlay(&mut deferred.warning_seconds, "DEFERQ_WARNING_SECONDS")?;
    overlay(&mut deferred.error_seconds, "DEFERQ_ERROR_SECONDS")?;

    let transport = &mut config.transport;
    if let Some(list) = env_opt("DEFERQ_INTERFACES") {
        transport.interfaces = list
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(str::to_string)
            .collect();
    }
    overlay(&mut transport.request_timeout_seconds, "DEFERQ_REQUEST_TIMEOUT_SECONDS")?;
    if let Some(agent) = env_opt("DEFERQ_USER_AGENT") {
        transport.user_agent = agent;
    }

    if let Some(dir) = env_opt("DEFERQ_WATCHDOG_DIR") {
        config.watchdog.directory = dir;
    }
    config.watchdog.enabled = env_bool("DEFERQ_WATCHDOG_ENABLED", config.watchdog.enabled);

    if let Some(level) = env_opt("DEFERQ_LOG_LEVEL") {
        config.logging.level = level;
    }
    config.logging.json = env_bool("DEFERQ_LOG_JSON", config.logging.json);

    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, searches the standard locations with
/// [`find_config_path`]. Format is detected by file extension.
///
/// # Errors
/// Returns `DeferqError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - A value fails validation
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(DeferqError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => find_config_path().ok_or_else(|| {
            DeferqError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| DeferqError::Config(format!("Failed to read config file: {e}")))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents).map_err(|e| InfraError::from(e).into()),
        "json" => serde_json::from_str(contents).map_err(|e| InfraError::from(e).into()),
        _ => Err(DeferqError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Search multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn find_config_path() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.extend(cwd.ancestors().take(3).map(Path::to_path_buf));
    }

    if let Some(exe_dir) = std::env::current_exe().ok().and_then(|p| p.parent().map(Path::to_path_buf)) {
        roots.push(exe_dir);
    }

    roots
        .iter()
        .flat_map(|root| CONFIG_FILE_NAMES.iter().map(move |name| root.join(name)))
        .find(|path| path.exists())
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Replace `slot` with the parsed value of `key`, if set.
fn overlay<T>(slot: &mut T, key: &str) -> Result<()>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(raw) = env_opt(key) {
        *slot = raw
            .trim()
            .parse()
            .map_err(|e| DeferqError::Config(format!("Invalid value for {key}: {e}")))?;
    }
    Ok(())
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

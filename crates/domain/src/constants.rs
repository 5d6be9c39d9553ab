//! Queue constants
//!
//! Centralized defaults for the deferred queue, the backoff timer and the
//! background loop.

use std::time::Duration;

// Active regime: try every minute, backing off to every 15 minutes
pub const DEFAULT_BACKOFF_MIN: Duration = Duration::from_secs(60);
pub const DEFAULT_BACKOFF_MAX: Duration = Duration::from_secs(15 * 60);
pub const DEFAULT_BACKOFF_JITTER: f64 = 0.3;

// Dormant regime. The ticker is never torn down, it just fires so rarely
// that it never matters while the store is empty.
pub const DORMANT_INTERVAL_MIN: Duration = Duration::from_secs(24 * 60 * 60);
pub const DORMANT_INTERVAL_MAX: Duration = Duration::from_secs(48 * 60 * 60);

// Background loop liveness
pub const STILL_RUNNING_INTERVAL: Duration = Duration::from_secs(25);
pub const DEFAULT_WARNING_TIME: Duration = Duration::from_secs(40);
pub const DEFAULT_ERROR_TIME: Duration = Duration::from_secs(120);

// Transport
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_USER_AGENT: &str = concat!("deferq/", env!("CARGO_PKG_VERSION"));

// Watchdog
pub const DEFAULT_WATCHDOG_DIR: &str = "/run/watchdog/file";
pub const WATCHDOG_FILE_SUFFIX: &str = ".touch";

// Shutdown
pub const WORKER_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

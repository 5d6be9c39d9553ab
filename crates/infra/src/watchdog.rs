//! Touch-file watchdog
//!
//! Each registered task owns `<directory>/<name>.touch`. A task that keeps
//! calling `still_running` keeps its file fresh; an external watchdog daemon
//! treats a stale file as a hung process.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use deferq_core::LivenessRegistrar;
use deferq_domain::constants::WATCHDOG_FILE_SUFFIX;
use deferq_domain::{DeferqError, Result, WatchdogConfig};
use tokio::time::Instant;
use tracing::{debug, error, warn};

use crate::errors::InfraError;

/// [`LivenessRegistrar`] backed by touch files.
#[derive(Debug)]
pub struct FileWatchdog {
    directory: PathBuf,
    enabled: bool,
    last_seen: Mutex<HashMap<String, Instant>>,
}

impl FileWatchdog {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self { directory: directory.into(), enabled: true, last_seen: Mutex::new(HashMap::new()) }
    }

    pub fn from_config(config: &WatchdogConfig) -> Self {
        let mut watchdog = Self::new(&config.directory);
        watchdog.enabled = config.enabled;
        watchdog
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path of the touch file for `name`.
    pub fn touch_path(&self, name: &str) -> PathBuf {
        self.directory.join(format!("{name}{WATCHDOG_FILE_SUFFIX}"))
    }

    fn last_seen(&self) -> MutexGuard<'_, HashMap<String, Instant>> {
        self.last_seen.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn touch(&self, name: &str) -> Result<()> {
        let path = self.touch_path(name);
        tokio::fs::write(&path, Utc::now().to_rfc3339()).await.map_err(|err| {
            let mapped: DeferqError = InfraError::from(err).into();
            DeferqError::Watchdog(format!("failed to touch {}: {mapped}", path.display()))
        })
    }
}

#[async_trait]
impl LivenessRegistrar for FileWatchdog {
    async fn register_watchdog(&self, name: &str) -> Result<()> {
        if !self.enabled {
            debug!(watchdog = name, "watchdog disabled, not registering");
            return Ok(());
        }

        tokio::fs::create_dir_all(&self.directory).await.map_err(|err| {
            let mapped: DeferqError = InfraError::from(err).into();
            DeferqError::Watchdog(format!(
                "failed to create {}: {mapped}",
                self.directory.display()
            ))
        })?;
        self.touch(name).await?;
        debug!(watchdog = name, path = %self.touch_path(name).display(), "watchdog registered");
        Ok(())
    }

    async fn still_running(&self, name: &str, warning: Duration, error: Duration) -> Result<()> {
        let now = Instant::now();
        let previous = self.last_seen().insert(name.to_string(), now);

        if let Some(previous) = previous {
            let gap = now.saturating_duration_since(previous);
            if gap > error {
                error!(watchdog = name, gap = ?gap, budget = ?error, "task stalled past error budget");
            } else if gap > warning {
                warn!(watchdog = name, gap = ?gap, budget = ?warning, "task stalled past warning budget");
            }
        }

        if !self.enabled {
            return Ok(());
        }
        self.touch(name).await
    }

    fn check_max_time(
        &self,
        agent: &str,
        context: &str,
        elapsed: Duration,
        warning: Duration,
        error: Duration,
    ) {
        if elapsed > error {
            error!(agent, context, elapsed = ?elapsed, budget = ?error, "work took longer than error budget");
        } else if elapsed > warning {
            warn!(agent, context, elapsed = ?elapsed, budget = ?warning, "work took longer than warning budget");
        }
    }
}

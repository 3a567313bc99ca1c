//! Global runtime configuration.
//!
//! Provides [`Config`]: centralized settings for the supervisor runtime.
//!
//! Config is used in two ways:
//! 1. **Supervisor creation**: `Supervisor::new(config, subscribers)`
//! 2. **Path derivation**: registry and log file locations for a named
//!    service instance all hang off [`Config::base_dir`]
//!
//! ## Environment overrides
//! [`Config::apply_env`] folds in the recognized environment variables:
//!
//! | Variable                        | Field               |
//! |---------------------------------|---------------------|
//! | `PROCVISOR_BASE_DIR`            | `base_dir`          |
//! | `PROCVISOR_POLL_INTERVAL_SECS`  | `poll_interval`     |
//! | `PROCVISOR_MAX_RESTARTS`        | `restart.max_restarts_per_window` |
//! | `PROCVISOR_RESTART_WINDOW_SECS` | `restart.window`    |
//! | `PROCVISOR_UNBUFFERED`          | `unbuffered`        |
//!
//! Unparseable values are logged and ignored; overrides never make a start
//! fail.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::policies::RestartPolicy;

/// Global configuration for the supervision runtime.
///
/// ## Field semantics
/// - `base_dir`: directory holding the pid record and all log files
/// - `poll_interval`: watchdog liveness check spacing
/// - `restart`: bounded restart policy applied by the watchdog
/// - `stop_checks` / `stop_check_interval`: liveness polling budget for each
///   phase of a stop request (graceful wait, then post-escalation wait)
/// - `bus_capacity`: event bus ring buffer size (min 1, clamped)
/// - `unbuffered`: ask the child for immediate-flush output so external log
///   tails observe lines promptly
#[derive(Clone, Debug)]
pub struct Config {
    /// Base directory for the pid record and log files.
    pub base_dir: PathBuf,

    /// Watchdog poll interval.
    pub poll_interval: Duration,

    /// Restart policy for the watchdog.
    pub restart: RestartPolicy,

    /// Liveness checks per stop phase before moving on.
    pub stop_checks: u32,

    /// Spacing between stop-phase liveness checks.
    pub stop_check_interval: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,

    /// Request immediate-flush output from the supervised process.
    pub unbuffered: bool,
}

impl Config {
    /// Registry record path for a named service instance.
    pub fn pid_path(&self, name: &str) -> PathBuf {
        self.base_dir.join(format!("{name}.pid"))
    }

    /// Service stdout log path.
    pub fn stdout_path(&self, name: &str) -> PathBuf {
        self.base_dir.join(format!("{name}.stdout.log"))
    }

    /// Service stderr log path.
    pub fn stderr_path(&self, name: &str) -> PathBuf {
        self.base_dir.join(format!("{name}.stderr.log"))
    }

    /// Watchdog event log path.
    pub fn event_log_path(&self, name: &str) -> PathBuf {
        self.base_dir.join(format!("{name}.events.log"))
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Folds recognized `PROCVISOR_*` environment variables into `self`.
    ///
    /// Returns `self` for chaining. Invalid values are logged at `warn` and
    /// skipped.
    pub fn apply_env(mut self) -> Self {
        if let Ok(dir) = std::env::var("PROCVISOR_BASE_DIR") {
            self.base_dir = PathBuf::from(dir);
        }
        if let Some(secs) = parse_env_u64("PROCVISOR_POLL_INTERVAL_SECS") {
            self.poll_interval = Duration::from_secs(secs);
        }
        if let Some(max) = parse_env_u64("PROCVISOR_MAX_RESTARTS") {
            self.restart.max_restarts_per_window = max.min(u64::from(u32::MAX)) as u32;
        }
        if let Some(secs) = parse_env_u64("PROCVISOR_RESTART_WINDOW_SECS") {
            self.restart.window = Duration::from_secs(secs);
        }
        if let Ok(v) = std::env::var("PROCVISOR_UNBUFFERED") {
            self.unbuffered = matches!(v.as_str(), "1" | "true" | "yes");
        }
        self
    }

    /// Default base directory: the platform data-local dir, or the system
    /// temp dir when none is available (containers, stripped-down CI).
    pub fn default_base_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("procvisor")
    }

    /// Replaces the base directory, for callers that manage their own layout.
    pub fn with_base_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.base_dir = dir.as_ref().to_path_buf();
        self
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `poll_interval = 10s`
    /// - `restart = RestartPolicy::default()` (5 restarts per 60s window)
    /// - `stop_checks = 5`, `stop_check_interval = 1s`
    /// - `bus_capacity = 1024`
    /// - `unbuffered = false`
    fn default() -> Self {
        Self {
            base_dir: Self::default_base_dir(),
            poll_interval: Duration::from_secs(10),
            restart: RestartPolicy::default(),
            stop_checks: 5,
            stop_check_interval: Duration::from_secs(1),
            bus_capacity: 1024,
            unbuffered: false,
        }
    }
}

fn parse_env_u64(key: &str) -> Option<u64> {
    let raw = std::env::var(key).ok()?;
    match raw.parse::<u64>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(%key, value = %raw, "ignoring unparseable override");
            None
        }
    }
}

//! Error types used by the supervisor runtime.
//!
//! A single [`SupervisorError`] enum covers every failure the lifecycle
//! operations can surface:
//!
//! - `start` path: [`AlreadyRunning`](SupervisorError::AlreadyRunning),
//!   [`SpawnFailure`](SupervisorError::SpawnFailure),
//!   [`EnvironmentUnavailable`](SupervisorError::EnvironmentUnavailable),
//!   [`StorageFailure`](SupervisorError::StorageFailure),
//!   [`WatchdogActive`](SupervisorError::WatchdogActive);
//! - `stop` path: [`StopFailed`](SupervisorError::StopFailed);
//! - monitoring: [`CrashLoopDetected`](SupervisorError::CrashLoopDetected).
//!
//! Helper methods (`as_label`, `as_message`) provide stable strings for
//! logs/metrics, and [`exit_code`](SupervisorError::exit_code) maps each
//! variant to the process exit code used by the CLI. Stale-record cleanup and
//! the single environment-recovery retry are handled internally and never
//! appear here.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors produced by the supervision runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SupervisorError {
    /// A live pid record already exists; starting again would spawn a
    /// duplicate process writing to the same log files.
    #[error("service already running (pid {pid})")]
    AlreadyRunning {
        /// Pid recorded in the registry.
        pid: u32,
    },

    /// The OS refused to create the process (missing executable, resource
    /// limits). Not retried beyond the single environment recovery attempt.
    #[error("failed to spawn service process: {source}")]
    SpawnFailure {
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// The capability probe failed and the one-shot recovery action did not
    /// fix it. No process was started.
    #[error("service environment unavailable: {reason}")]
    EnvironmentUnavailable {
        /// What the probe/recovery reported.
        reason: String,
    },

    /// The registry record or a log file could not be written.
    #[error("storage failure at {path}: {source}")]
    StorageFailure {
        /// Path that could not be written.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// The watchdog hit the restart budget and gave up. The service is left
    /// stopped; a new `start` is required.
    #[error("crash loop detected: {restarts} restarts within {window:?}; monitoring stopped")]
    CrashLoopDetected {
        /// Restarts performed inside the window before giving up.
        restarts: u32,
        /// The policy window the budget applies to.
        window: Duration,
    },

    /// The process survived both the graceful signal and the forced
    /// escalation. The pid record is left intact so the problem stays
    /// visible; operator intervention is required.
    #[error("process {pid} still alive after escalation; registry record kept")]
    StopFailed {
        /// Pid of the unkillable process.
        pid: u32,
    },

    /// A second monitoring loop was requested while one is already active
    /// for this supervisor.
    #[error("a watchdog is already active for this service")]
    WatchdogActive,
}

impl SupervisorError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            SupervisorError::AlreadyRunning { .. } => "already_running",
            SupervisorError::SpawnFailure { .. } => "spawn_failure",
            SupervisorError::EnvironmentUnavailable { .. } => "environment_unavailable",
            SupervisorError::StorageFailure { .. } => "storage_failure",
            SupervisorError::CrashLoopDetected { .. } => "crash_loop_detected",
            SupervisorError::StopFailed { .. } => "stop_failed",
            SupervisorError::WatchdogActive => "watchdog_active",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            SupervisorError::AlreadyRunning { pid } => {
                format!("already running with pid {pid}")
            }
            SupervisorError::SpawnFailure { source } => format!("spawn failed: {source}"),
            SupervisorError::EnvironmentUnavailable { reason } => {
                format!("environment unavailable: {reason}")
            }
            SupervisorError::StorageFailure { path, source } => {
                format!("cannot write {}: {source}", path.display())
            }
            SupervisorError::CrashLoopDetected { restarts, window } => {
                format!("gave up after {restarts} restarts within {window:?}")
            }
            SupervisorError::StopFailed { pid } => {
                format!("pid {pid} survived SIGTERM and SIGKILL escalation")
            }
            SupervisorError::WatchdogActive => "watchdog already active".to_string(),
        }
    }

    /// Process exit code for the CLI.
    ///
    /// `status` never fails (exit 0 always); `stop` exits non-zero only for
    /// [`StopFailed`](SupervisorError::StopFailed).
    pub fn exit_code(&self) -> i32 {
        match self {
            SupervisorError::AlreadyRunning { .. } => 2,
            SupervisorError::SpawnFailure { .. } => 3,
            SupervisorError::EnvironmentUnavailable { .. } => 4,
            SupervisorError::StorageFailure { .. } => 5,
            SupervisorError::CrashLoopDetected { .. } => 6,
            SupervisorError::StopFailed { .. } => 7,
            SupervisorError::WatchdogActive => 2,
        }
    }
}

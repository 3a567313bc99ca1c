//! Shutdown: the stop state machine and OS signal handling.
//!
//! [`ShutdownCoordinator`] drives one stop request through its states:
//!
//! ```text
//! RUNNING ──TERM──► SIGNALED ──► WAIT ──┬─► TERMINATED   (record cleared)
//!                                       └─► ESCALATED ──KILL──► WAIT ──┬─► TERMINATED
//!                                                                     └─► FAILED
//! ```
//!
//! ## Rules
//! - **Idempotent**: no record, or a stale record, is success — any stale
//!   record is cleared and the coordinator reports "not running".
//! - **Bounded waits**: each WAIT phase polls liveness `checks` times spaced
//!   `check_interval` apart; the caller is blocked for at most
//!   `2 × checks × check_interval`.
//! - **FAILED keeps the record**: a process that survives SIGKILL is a
//!   problem to surface, not to mask; the registry entry stays so `status`
//!   keeps naming the pid.
//! - The caller must suspend an active watchdog **before** invoking the
//!   coordinator, or the watchdog may observe the intentional kill as a
//!   crash and relaunch mid-shutdown.
//!
//! [`wait_for_shutdown_signal`] is the cross-platform helper the
//! persistent-mode supervisor uses to notice SIGINT/SIGTERM/SIGQUIT.

use std::sync::Arc;
use std::time::Duration;

use tokio::time;

use crate::core::alive;
use crate::core::registry::PidRegistry;
use crate::error::SupervisorError;
use crate::events::{Bus, Event, EventKind};

/// Terminal result of a successful stop request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopOutcome {
    /// A live process was terminated and its record cleared.
    Terminated {
        /// Pid that was stopped.
        pid: u32,
        /// True when SIGKILL escalation was needed.
        escalated: bool,
    },
    /// Nothing was running (no record, or a stale record that was cleared).
    NotRunning,
}

/// Terminates the registered process, escalating once, then clears the
/// registry record.
pub struct ShutdownCoordinator {
    registry: Arc<PidRegistry>,
    bus: Bus,
    checks: u32,
    check_interval: Duration,
}

impl ShutdownCoordinator {
    /// Creates a coordinator with the given per-phase wait budget.
    pub fn new(registry: Arc<PidRegistry>, bus: Bus, checks: u32, check_interval: Duration) -> Self {
        Self {
            registry,
            bus,
            checks,
            check_interval,
        }
    }

    /// Runs one stop request to a terminal state.
    ///
    /// Returns [`StopOutcome`] on both terminal success states, or
    /// [`SupervisorError::StopFailed`] when the process survives escalation
    /// (the record is left intact in that case).
    pub async fn stop(&self) -> Result<StopOutcome, SupervisorError> {
        let Some(record) = self.registry.read() else {
            return Ok(StopOutcome::NotRunning);
        };
        if !self.registry.is_live(&record) {
            self.registry.clear()?;
            self.bus
                .publish(Event::now(EventKind::StaleRecordCleared).with_pid(record.pid));
            return Ok(StopOutcome::NotRunning);
        }

        let pid = record.pid;
        send_term(pid);
        self.bus.publish(Event::now(EventKind::TermSignalSent).with_pid(pid));

        if self.wait_until_dead(pid).await {
            self.registry.clear()?;
            self.bus.publish(Event::now(EventKind::Terminated).with_pid(pid));
            return Ok(StopOutcome::Terminated {
                pid,
                escalated: false,
            });
        }

        send_kill(pid);
        self.bus.publish(Event::now(EventKind::KillEscalated).with_pid(pid));

        if self.wait_until_dead(pid).await {
            self.registry.clear()?;
            self.bus.publish(Event::now(EventKind::Terminated).with_pid(pid));
            return Ok(StopOutcome::Terminated {
                pid,
                escalated: true,
            });
        }

        self.bus.publish(Event::now(EventKind::StopFailed).with_pid(pid));
        Err(SupervisorError::StopFailed { pid })
    }

    /// One bounded WAIT phase: polls liveness `checks` times.
    async fn wait_until_dead(&self, pid: u32) -> bool {
        for _ in 0..self.checks {
            time::sleep(self.check_interval).await;
            if !alive::is_pid_alive(pid) {
                return true;
            }
        }
        false
    }
}

#[cfg(unix)]
fn send_term(pid: u32) {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;
    // ESRCH here means the process exited between the liveness check and the
    // signal; the WAIT phase will confirm.
    let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
}

#[cfg(unix)]
fn send_kill(pid: u32) {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;
    let _ = kill(Pid::from_raw(pid as i32), Signal::SIGKILL);
}

#[cfg(not(unix))]
fn send_term(_pid: u32) {}

#[cfg(not(unix))]
fn send_kill(_pid: u32) {}

/// Waits for a termination signal.
///
/// Each call creates independent signal listeners. Returns `Ok(())` when any
/// signal is received, or `Err` if signal registration fails.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = sigint.recv()  => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

/// Waits for a termination signal (Ctrl-C on non-Unix platforms).
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

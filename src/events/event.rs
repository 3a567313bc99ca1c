//! Runtime events emitted by the supervisor, launcher, shutdown coordinator,
//! and watchdog.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Launch events**: probe/recovery and process creation
//! - **Monitoring events**: crash detection, restarts, crash-loop give-up
//! - **Shutdown events**: the stop state machine transitions
//!
//! The [`Event`] struct carries the metadata a line in the watchdog event log
//! needs: timestamp, pid, restart attempt, backoff delay, free-form reason.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore the exact order when events are
//! delivered out of order.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Launch events ===
    /// Capability probe failed; a recovery attempt may follow.
    ///
    /// Sets: `reason`.
    ProbeFailed,

    /// One-shot recovery action is being run before the single retry.
    ///
    /// Sets: `reason` (the recovery command line).
    RecoveryAttempted,

    /// A process was spawned and its pid record written.
    ///
    /// Sets: `pid`; `attempt` when spawned by the watchdog.
    ProcessStarted,

    // === Monitoring events ===
    /// The watchdog loop began polling.
    WatchdogStarted,

    /// The recorded pid is no longer alive and the exit was not requested.
    ///
    /// Sets: `pid`.
    CrashDetected,

    /// A relaunch was scheduled after a crash.
    ///
    /// Sets: `delay_ms`, `attempt` (restart count within the current window).
    RestartScheduled,

    /// The restart budget for the current window is exhausted; monitoring
    /// stops and the service stays down until an explicit new start.
    ///
    /// Sets: `attempt` (restarts performed), `reason`.
    CrashLoopDetected,

    /// The watchdog was asked to suspend (intentional stop in progress).
    WatchdogSuspended,

    /// The watchdog exited because the registry holds no record.
    WatchdogIdle,

    // === Shutdown events ===
    /// A stop request began and the graceful signal was sent.
    ///
    /// Sets: `pid`.
    TermSignalSent,

    /// The graceful wait budget ran out; a forced kill was sent.
    ///
    /// Sets: `pid`.
    KillEscalated,

    /// The process is confirmed gone and the registry record cleared.
    ///
    /// Sets: `pid` when a process was actually terminated.
    Terminated,

    /// The process survived escalation; the record was left intact.
    ///
    /// Sets: `pid`.
    StopFailed,

    /// A record naming a dead pid was dropped so a fresh start can proceed.
    ///
    /// Sets: `pid`.
    StaleRecordCleared,
}

impl EventKind {
    /// Short stable label for log lines, `[label]` style.
    pub fn as_label(&self) -> &'static str {
        match self {
            EventKind::ProbeFailed => "probe-failed",
            EventKind::RecoveryAttempted => "recovery",
            EventKind::ProcessStarted => "started",
            EventKind::WatchdogStarted => "watchdog-started",
            EventKind::CrashDetected => "crash-detected",
            EventKind::RestartScheduled => "restart-scheduled",
            EventKind::CrashLoopDetected => "crash-loop",
            EventKind::WatchdogSuspended => "watchdog-suspended",
            EventKind::WatchdogIdle => "watchdog-idle",
            EventKind::TermSignalSent => "term-sent",
            EventKind::KillEscalated => "kill-escalated",
            EventKind::Terminated => "terminated",
            EventKind::StopFailed => "stop-failed",
            EventKind::StaleRecordCleared => "stale-record-cleared",
        }
    }
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// OS process id, if applicable.
    pub pid: Option<u32>,
    /// Backoff delay before the next relaunch, in milliseconds.
    pub delay_ms: Option<u64>,
    /// Restart count within the current policy window.
    pub attempt: Option<u32>,
    /// Human-readable reason (probe output, error text, command line).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with the current timestamp and
    /// next sequence number.
    pub fn now(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            pid: None,
            delay_ms: None,
            attempt: None,
            reason: None,
        }
    }

    /// Attaches a process id.
    #[inline]
    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = Some(pid);
        self
    }

    /// Attaches a backoff delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay_ms = Some(d.as_millis().min(u128::from(u64::MAX)) as u64);
        self
    }

    /// Attaches a restart count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_is_monotonic() {
        let a = Event::now(EventKind::ProcessStarted);
        let b = Event::now(EventKind::CrashDetected);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn builders_attach_metadata() {
        let ev = Event::now(EventKind::RestartScheduled)
            .with_pid(4242)
            .with_delay(Duration::from_millis(1500))
            .with_attempt(2)
            .with_reason("exit status 1");

        assert_eq!(ev.pid, Some(4242));
        assert_eq!(ev.delay_ms, Some(1500));
        assert_eq!(ev.attempt, Some(2));
        assert_eq!(ev.reason.as_deref(), Some("exit status 1"));
        assert_eq!(ev.kind.as_label(), "restart-scheduled");
    }
}

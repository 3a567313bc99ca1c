//! Stdout mirror of runtime events.
//!
//! [`LogWriter`] prints events in a compact human-readable form; the CLI
//! installs it so operators watching the terminal see what the event log
//! records.
//!
//! ## Output format
//! ```text
//! [started] pid=4242
//! [crash-detected] pid=4242
//! [restart-scheduled] attempt=1 delay=1s
//! [crash-loop] restarts=3
//! [terminated] pid=4242
//! ```

use async_trait::async_trait;
use std::time::Duration;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Simple stdout logging subscriber.
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let label = e.kind.as_label();
        match e.kind {
            EventKind::ProcessStarted
            | EventKind::CrashDetected
            | EventKind::TermSignalSent
            | EventKind::KillEscalated
            | EventKind::Terminated
            | EventKind::StopFailed
            | EventKind::StaleRecordCleared => {
                if let Some(pid) = e.pid {
                    println!("[{label}] pid={pid}");
                } else {
                    println!("[{label}]");
                }
            }
            EventKind::RestartScheduled => {
                let delay = Duration::from_millis(e.delay_ms.unwrap_or(0));
                println!(
                    "[{label}] attempt={} delay={delay:?}",
                    e.attempt.unwrap_or(0)
                );
            }
            EventKind::CrashLoopDetected => {
                println!("[{label}] restarts={}", e.attempt.unwrap_or(0));
            }
            EventKind::ProbeFailed | EventKind::RecoveryAttempted => {
                println!("[{label}] cmd={:?}", e.reason.as_deref().unwrap_or(""));
            }
            EventKind::WatchdogStarted | EventKind::WatchdogSuspended | EventKind::WatchdogIdle => {
                println!("[{label}]");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}

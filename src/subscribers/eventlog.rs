//! Append-only event log file.
//!
//! [`EventLog`] writes one line per runtime event to the watchdog event log,
//! giving operators a durable history of launches, crashes, restarts, and
//! stops that survives supervisor restarts (the bus itself keeps nothing).
//!
//! ## Line format
//! ```text
//! 2026-08-07T09:15:02Z [started] pid=4242
//! 2026-08-07T09:21:44Z [crash-detected] pid=4242
//! 2026-08-07T09:21:45Z [restart-scheduled] attempt=1 delay_ms=1000
//! 2026-08-07T09:21:46Z [started] pid=4310 attempt=1
//! ```

use std::fmt::Write as _;
use std::fs::{File, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::SupervisorError;
use crate::events::Event;
use crate::subscribers::Subscribe;

/// File-backed event log subscriber.
pub struct EventLog {
    file: Mutex<File>,
    path: PathBuf,
}

impl EventLog {
    /// Opens (or creates) the log file in append mode, creating parent
    /// directories as needed.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, SupervisorError> {
        let path = path.into();
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|source| SupervisorError::StorageFailure {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&path)
            .map_err(|source| SupervisorError::StorageFailure {
                path: path.clone(),
                source,
            })?;
        Ok(Self {
            file: Mutex::new(file),
            path,
        })
    }

    /// Log file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn format_line(event: &Event) -> String {
        let ts: DateTime<Utc> = event.at.into();
        let mut line = format!(
            "{} [{}]",
            ts.to_rfc3339_opts(SecondsFormat::Secs, true),
            event.kind.as_label()
        );
        if let Some(pid) = event.pid {
            let _ = write!(line, " pid={pid}");
        }
        if let Some(attempt) = event.attempt {
            let _ = write!(line, " attempt={attempt}");
        }
        if let Some(delay) = event.delay_ms {
            let _ = write!(line, " delay_ms={delay}");
        }
        if let Some(reason) = &event.reason {
            let _ = write!(line, " reason={reason:?}");
        }
        line
    }
}

#[async_trait]
impl Subscribe for EventLog {
    async fn on_event(&self, event: &Event) {
        let line = Self::format_line(event);
        // The write is tiny and append-only; losing one line on a full disk
        // must not take the supervisor down with it.
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "{line}");
            let _ = file.flush();
        }
    }

    fn name(&self) -> &'static str {
        "event-log"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use std::time::Duration;

    #[tokio::test]
    async fn lines_are_appended_with_metadata() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("svc.events.log");
        let log = EventLog::create(&path).expect("create");

        log.on_event(&Event::now(EventKind::ProcessStarted).with_pid(77))
            .await;
        log.on_event(
            &Event::now(EventKind::RestartScheduled)
                .with_attempt(2)
                .with_delay(Duration::from_millis(500)),
        )
        .await;

        let contents = std::fs::read_to_string(&path).expect("read log");
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("[started] pid=77"));
        assert!(lines[1].contains("[restart-scheduled] attempt=2 delay_ms=500"));
    }

    #[tokio::test]
    async fn reopening_appends_instead_of_truncating() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("svc.events.log");

        {
            let log = EventLog::create(&path).expect("create");
            log.on_event(&Event::now(EventKind::WatchdogStarted)).await;
        }
        {
            let log = EventLog::create(&path).expect("reopen");
            log.on_event(&Event::now(EventKind::WatchdogSuspended)).await;
        }

        let contents = std::fs::read_to_string(&path).expect("read log");
        assert_eq!(contents.lines().count(), 2);
    }
}

//! Pid registry: the persisted identity of the supervised process.
//!
//! [`PidRegistry`] owns a single record file holding the pid and write
//! timestamp of the currently supervised process. It is the only state
//! shared between supervisor invocations, so its contracts are strict:
//!
//! ## Rules
//! - **Atomic replace**: `write` serializes to a temp file in the same
//!   directory and renames it over the record path. A concurrent reader
//!   never observes a partially written record.
//! - **At most one record** exists per service instance; `write` overwrites
//!   any prior record.
//! - **Corruption is recoverable**: an unparseable record is logged and
//!   treated as absent, never as an error, so recovery can start fresh.
//! - **Stale means absent**: a record naming a dead pid is not an error
//!   condition; callers drop it and move on.
//! - **`clear` is idempotent**: removing a missing record succeeds.
//!
//! Pid-reuse caveat: see [`alive::is_pid_alive`](crate::core::alive::is_pid_alive).

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::core::alive;
use crate::error::SupervisorError;
use crate::service::ProcessHandle;

/// The persisted record: one pid, one write timestamp.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct PidRecord {
    /// Pid of the supervised process at write time.
    pub pid: u32,
    /// When the record was written.
    pub written_at: SystemTime,
}

/// File-backed pid registry.
#[derive(Debug)]
pub struct PidRegistry {
    path: PathBuf,
}

impl PidRegistry {
    /// Creates a registry over the given record path. Nothing touches the
    /// filesystem until the first `write`/`read`/`clear`.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Record file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persists the handle's pid atomically, overwriting any prior record.
    pub fn write(&self, handle: &ProcessHandle) -> Result<(), SupervisorError> {
        let record = PidRecord {
            pid: handle.pid(),
            written_at: SystemTime::now(),
        };
        self.write_record(&record)
    }

    fn write_record(&self, record: &PidRecord) -> Result<(), SupervisorError> {
        let dir = self.path.parent().unwrap_or(Path::new("."));
        fs::create_dir_all(dir).map_err(|source| SupervisorError::StorageFailure {
            path: dir.to_path_buf(),
            source,
        })?;

        let storage_err = |source: std::io::Error| SupervisorError::StorageFailure {
            path: self.path.clone(),
            source,
        };

        // Temp file in the record's own directory: rename stays on one
        // filesystem, which is what makes the replace atomic.
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(storage_err)?;
        let json = serde_json::to_string(record).map_err(std::io::Error::other).map_err(storage_err)?;
        tmp.write_all(json.as_bytes()).map_err(storage_err)?;
        tmp.persist(&self.path)
            .map_err(|e| storage_err(e.error))
            .map(|_| ())
    }

    /// Returns the current record, or `None` when no readable record exists.
    ///
    /// A corrupted record is logged at `warn` and reported absent.
    pub fn read(&self) -> Option<PidRecord> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "pid record unreadable; treating as absent");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "pid record corrupted; treating as absent");
                None
            }
        }
    }

    /// True iff the OS reports a process with the recorded id.
    pub fn is_live(&self, record: &PidRecord) -> bool {
        alive::is_pid_alive(record.pid)
    }

    /// Returns the record only when its pid is alive; a stale record reads
    /// as `None` (it is not cleared here).
    pub fn read_live(&self) -> Option<PidRecord> {
        self.read().filter(|r| self.is_live(r))
    }

    /// Removes the record. Clearing an absent record is not an error.
    pub fn clear(&self) -> Result<(), SupervisorError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(SupervisorError::StorageFailure {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn handle_with_pid(pid: u32) -> ProcessHandle {
        ProcessHandle::new(pid, vec!["svc".into()], PathBuf::new(), PathBuf::new())
    }

    #[test]
    fn write_then_read_roundtrips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let reg = PidRegistry::new(dir.path().join("svc.pid"));

        reg.write(&handle_with_pid(std::process::id())).expect("write");
        let record = reg.read().expect("record");
        assert_eq!(record.pid, std::process::id());
        assert!(reg.is_live(&record));
    }

    #[test]
    fn write_overwrites_prior_record() {
        let dir = tempfile::tempdir().expect("tempdir");
        let reg = PidRegistry::new(dir.path().join("svc.pid"));

        reg.write(&handle_with_pid(1111)).expect("write");
        reg.write(&handle_with_pid(2222)).expect("write");
        assert_eq!(reg.read().expect("record").pid, 2222);
    }

    #[test]
    fn missing_record_reads_as_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let reg = PidRegistry::new(dir.path().join("svc.pid"));
        assert!(reg.read().is_none());
    }

    #[test]
    fn corrupted_record_reads_as_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("svc.pid");
        fs::write(&path, "not json at all").expect("write garbage");

        let reg = PidRegistry::new(path);
        assert!(reg.read().is_none());
    }

    #[test]
    fn clear_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let reg = PidRegistry::new(dir.path().join("svc.pid"));

        reg.clear().expect("clear absent");
        reg.write(&handle_with_pid(42)).expect("write");
        reg.clear().expect("clear present");
        reg.clear().expect("clear again");
        assert!(reg.read().is_none());
    }

    #[test]
    fn write_creates_missing_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let reg = PidRegistry::new(dir.path().join("nested/deeper/svc.pid"));
        reg.write(&handle_with_pid(42)).expect("write");
        assert!(reg.read().is_some());
    }

    #[cfg(unix)]
    #[test]
    fn stale_record_is_filtered_by_read_live() {
        let dir = tempfile::tempdir().expect("tempdir");
        let reg = PidRegistry::new(dir.path().join("svc.pid"));

        let mut child = std::process::Command::new("true").spawn().expect("spawn");
        let dead_pid = child.id();
        child.wait().expect("wait");

        reg.write(&handle_with_pid(dead_pid)).expect("write");
        assert!(reg.read().is_some());
        assert!(reg.read_live().is_none());
    }
}

//! Handle to one launched OS process.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// One OS process launched by the supervisor.
///
/// Created by the launcher, handed to the registry and shutdown coordinator
/// by reference. Deliberately not `Clone`: two handles with divergent state
/// for the same pid would defeat the single-owner invariant.
#[derive(Debug)]
pub struct ProcessHandle {
    pid: u32,
    started_at: SystemTime,
    command: Vec<String>,
    stdout_path: PathBuf,
    stderr_path: PathBuf,
}

impl ProcessHandle {
    pub(crate) fn new(
        pid: u32,
        command: Vec<String>,
        stdout_path: PathBuf,
        stderr_path: PathBuf,
    ) -> Self {
        Self {
            pid,
            started_at: SystemTime::now(),
            command,
            stdout_path,
            stderr_path,
        }
    }

    /// OS process id.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Wall-clock launch time.
    pub fn started_at(&self) -> SystemTime {
        self.started_at
    }

    /// The command this process was launched with.
    pub fn command(&self) -> &[String] {
        &self.command
    }

    /// Where stdout is redirected (empty path in attached mode).
    pub fn stdout_path(&self) -> &Path {
        &self.stdout_path
    }

    /// Where stderr is redirected (empty path in attached mode).
    pub fn stderr_path(&self) -> &Path {
        &self.stderr_path
    }

    /// Time elapsed since launch.
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed().unwrap_or(Duration::ZERO)
    }
}

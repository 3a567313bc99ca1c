//! Launcher: brings the supervised process up.
//!
//! Executes one launch attempt end to end and publishes lifecycle events
//! around it:
//!
//! ```text
//! launch()
//!   ├─► ensure_environment()        probe ─► (recovery ─► re-probe, once)
//!   ├─► open append-mode log files  (detached) / inherit stdio (attached)
//!   ├─► spawn child in its own process group
//!   ├─► PidRegistry::write(handle)  (spawn is rolled back if this fails)
//!   └─► publish ProcessStarted
//! ```
//!
//! ## Rules
//! - The launcher is a conduit for output, never a parser: streams go to
//!   append-mode files (or straight through in attached mode) untouched.
//! - The recovery action runs **at most once** per launch; a second probe
//!   failure is `EnvironmentUnavailable` and nothing is spawned.
//! - "Launched" means the OS confirmed process creation. Readiness of the
//!   service behind the pid is the service's own concern.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use tokio::process::{Child, Command};

use crate::config::Config;
use crate::core::registry::PidRegistry;
use crate::error::SupervisorError;
use crate::events::{Bus, Event, EventKind};
use crate::service::{ProcessHandle, ServiceSpec};

/// Launches the supervised process and registers it.
#[derive(Clone)]
pub struct Launcher {
    cfg: Config,
    registry: Arc<PidRegistry>,
    bus: Bus,
}

impl Launcher {
    /// Creates a launcher writing successful launches into `registry`.
    pub fn new(cfg: Config, registry: Arc<PidRegistry>, bus: Bus) -> Self {
        Self { cfg, registry, bus }
    }

    /// Launches detached: output appended to the service log files, the
    /// child in its own process group so it survives this process exiting.
    ///
    /// The child is handed to a background reaper; callers get the handle
    /// only. `attempt` tags the `ProcessStarted` event for watchdog
    /// relaunches.
    pub async fn launch_detached(
        &self,
        spec: &ServiceSpec,
        attempt: Option<u32>,
    ) -> Result<ProcessHandle, SupervisorError> {
        let (handle, child) = self.launch_inner(spec, attempt, false).await?;
        reap(child);
        Ok(handle)
    }

    /// Launches attached to the caller's terminal (debug mode): stdio is
    /// inherited instead of redirected, and the caller owns the child.
    pub async fn launch_attached(
        &self,
        spec: &ServiceSpec,
    ) -> Result<(ProcessHandle, Child), SupervisorError> {
        self.launch_inner(spec, None, true).await
    }

    async fn launch_inner(
        &self,
        spec: &ServiceSpec,
        attempt: Option<u32>,
        attached: bool,
    ) -> Result<(ProcessHandle, Child), SupervisorError> {
        self.ensure_environment(spec).await?;

        let program = spec.program().ok_or_else(|| SupervisorError::SpawnFailure {
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty service command"),
        })?;

        let mut cmd = Command::new(program);
        cmd.args(spec.args());
        for (key, value) in spec.env() {
            cmd.env(key, value);
        }
        if self.cfg.unbuffered {
            if let Some(var) = spec.flush_env() {
                cmd.env(var, "1");
            }
        }

        let (stdout_path, stderr_path) = if attached {
            cmd.stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit());
            (PathBuf::new(), PathBuf::new())
        } else {
            let stdout_path = self.cfg.stdout_path(spec.name());
            let stderr_path = self.cfg.stderr_path(spec.name());
            cmd.stdin(Stdio::null())
                .stdout(Stdio::from(open_append(&stdout_path)?))
                .stderr(Stdio::from(open_append(&stderr_path)?));
            #[cfg(unix)]
            cmd.process_group(0);
            (stdout_path, stderr_path)
        };

        let mut child = cmd
            .spawn()
            .map_err(|source| SupervisorError::SpawnFailure { source })?;
        let pid = child.id().ok_or_else(|| SupervisorError::SpawnFailure {
            source: std::io::Error::other("spawned process exited before its pid was observed"),
        })?;

        let handle = ProcessHandle::new(pid, spec.command().to_vec(), stdout_path, stderr_path);
        if let Err(e) = self.registry.write(&handle) {
            // A process nobody can find again is worse than a failed start.
            let _ = child.start_kill();
            return Err(e);
        }

        let mut ev = Event::now(EventKind::ProcessStarted).with_pid(pid);
        if let Some(n) = attempt {
            ev = ev.with_attempt(n);
        }
        self.bus.publish(ev);

        Ok((handle, child))
    }

    /// Capability probe with a one-shot recovery retry.
    async fn ensure_environment(&self, spec: &ServiceSpec) -> Result<(), SupervisorError> {
        let Some(probe) = spec.probe() else {
            return Ok(());
        };
        if run_quiet(probe).await {
            return Ok(());
        }
        self.bus.publish(
            Event::now(EventKind::ProbeFailed).with_reason(probe.join(" ")),
        );

        let Some(recovery) = spec.recovery() else {
            return Err(SupervisorError::EnvironmentUnavailable {
                reason: "capability probe failed and no recovery action is configured".to_string(),
            });
        };
        self.bus.publish(
            Event::now(EventKind::RecoveryAttempted).with_reason(recovery.join(" ")),
        );
        if !run_quiet(recovery).await {
            return Err(SupervisorError::EnvironmentUnavailable {
                reason: "recovery action failed".to_string(),
            });
        }
        if run_quiet(probe).await {
            Ok(())
        } else {
            Err(SupervisorError::EnvironmentUnavailable {
                reason: "capability probe still failing after recovery".to_string(),
            })
        }
    }
}

/// Waits on a detached child so its pid leaves the process table promptly.
///
/// Without this, an exited child lingers as a zombie while the supervisor
/// process is resident, and `kill(pid, 0)` keeps reporting it alive.
pub(crate) fn reap(mut child: Child) {
    tokio::spawn(async move {
        let _ = child.wait().await;
    });
}

/// Runs a helper command with all stdio silenced; true iff it exited zero.
/// A command that cannot even be spawned counts as a failed check.
async fn run_quiet(argv: &[String]) -> bool {
    let Some(program) = argv.first() else {
        return false;
    };
    Command::new(program)
        .args(&argv[1..])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|status| status.success())
        .unwrap_or(false)
}

fn open_append(path: &std::path::Path) -> Result<std::fs::File, SupervisorError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| SupervisorError::StorageFailure {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .map_err(|source| SupervisorError::StorageFailure {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn launcher(dir: &std::path::Path) -> Launcher {
        let cfg = Config::default().with_base_dir(dir);
        let registry = Arc::new(PidRegistry::new(cfg.pid_path("svc")));
        Launcher::new(cfg, registry, Bus::new(16))
    }

    fn sh(script: &str) -> Vec<String> {
        vec!["/bin/sh".into(), "-c".into(), script.into()]
    }

    #[tokio::test]
    async fn launch_writes_registry_and_redirects_output() {
        let dir = tempfile::tempdir().expect("tempdir");
        let launcher = launcher(dir.path());

        let spec = ServiceSpec::new("svc", sh("echo out; echo err 1>&2; sleep 30"));
        let handle = launcher.launch_detached(&spec, None).await.expect("launch");

        let record = launcher.registry.read().expect("record");
        assert_eq!(record.pid, handle.pid());
        assert!(handle.stdout_path().exists());
        assert!(handle.stderr_path().exists());

        // Cleanup: the child outlives the test otherwise.
        let _ = nix::sys::signal::kill(
            nix::unistd::Pid::from_raw(handle.pid() as i32),
            nix::sys::signal::Signal::SIGKILL,
        );
    }

    #[tokio::test]
    async fn missing_executable_is_a_spawn_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let launcher = launcher(dir.path());

        let spec = ServiceSpec::new("svc", vec!["/definitely/not/a/binary".into()]);
        let err = launcher.launch_detached(&spec, None).await.unwrap_err();
        assert!(matches!(err, SupervisorError::SpawnFailure { .. }));
        assert!(launcher.registry.read().is_none());
    }

    #[tokio::test]
    async fn empty_command_is_rejected_before_spawning() {
        let dir = tempfile::tempdir().expect("tempdir");
        let launcher = launcher(dir.path());

        let err = launcher
            .launch_detached(&ServiceSpec::new("svc", Vec::new()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, SupervisorError::SpawnFailure { .. }));
    }

    #[tokio::test]
    async fn passing_probe_skips_recovery() {
        let dir = tempfile::tempdir().expect("tempdir");
        let launcher = launcher(dir.path());

        let spec = ServiceSpec::new("svc", sh("sleep 30")).with_probe(sh("true"));
        let handle = launcher.launch_detached(&spec, None).await.expect("launch");

        let _ = nix::sys::signal::kill(
            nix::unistd::Pid::from_raw(handle.pid() as i32),
            nix::sys::signal::Signal::SIGKILL,
        );
    }

    #[tokio::test]
    async fn recovery_runs_once_and_unblocks_the_probe() {
        let dir = tempfile::tempdir().expect("tempdir");
        let launcher = launcher(dir.path());
        let marker = dir.path().join("ready.marker");

        let spec = ServiceSpec::new("svc", sh("sleep 30"))
            .with_probe(sh(&format!("test -f {}", marker.display())))
            .with_recovery(sh(&format!("touch {}", marker.display())));

        let handle = launcher.launch_detached(&spec, None).await.expect("launch");
        assert!(marker.exists());

        let _ = nix::sys::signal::kill(
            nix::unistd::Pid::from_raw(handle.pid() as i32),
            nix::sys::signal::Signal::SIGKILL,
        );
    }

    #[tokio::test]
    async fn failed_recovery_is_environment_unavailable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let launcher = launcher(dir.path());

        let spec = ServiceSpec::new("svc", sh("sleep 30"))
            .with_probe(sh("false"))
            .with_recovery(sh("false"));

        let err = launcher.launch_detached(&spec, None).await.unwrap_err();
        assert!(matches!(err, SupervisorError::EnvironmentUnavailable { .. }));
        assert!(launcher.registry.read().is_none());
    }

    #[tokio::test]
    async fn probe_failure_without_recovery_is_environment_unavailable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let launcher = launcher(dir.path());

        let spec = ServiceSpec::new("svc", sh("sleep 30")).with_probe(sh("false"));
        let err = launcher.launch_detached(&spec, None).await.unwrap_err();
        assert!(matches!(err, SupervisorError::EnvironmentUnavailable { .. }));
    }

    #[tokio::test]
    async fn unbuffered_mode_sets_the_flush_env_var() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut cfg = Config::default().with_base_dir(dir.path());
        cfg.unbuffered = true;
        let registry = Arc::new(PidRegistry::new(cfg.pid_path("svc")));
        let launcher = Launcher::new(cfg, registry, Bus::new(16));

        let out = dir.path().join("flush.txt");
        let spec = ServiceSpec::new(
            "svc",
            sh(&format!("printf %s \"$FORCE_FLUSH\" > {}", out.display())),
        )
        .with_flush_env("FORCE_FLUSH");

        launcher.launch_detached(&spec, None).await.expect("launch");
        // Give the short-lived child a moment to write and exit.
        tokio::time::sleep(std::time::Duration::from_millis(300)).await;
        assert_eq!(std::fs::read_to_string(&out).expect("marker"), "1");
    }
}

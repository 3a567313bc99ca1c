//! Supervisor: wires launcher, registry, shutdown, and watchdog together.
//!
//! The [`Supervisor`] owns the event bus, a [`SubscriberSet`], the pid
//! registry, and the launcher, and exposes the three lifecycle operations:
//!
//! ```text
//! start(spec, mode)
//!   ├─► guard: live record?            ─► AlreadyRunning
//!   ├─► stale record? clear + publish
//!   ├─► Basic      : launch detached
//!   ├─► Persistent : launch detached + spawn Watchdog (one slot only)
//!   └─► Debug      : launch attached, wait inline, clear record
//!
//! stop()
//!   ├─► suspend + join watchdog        (BEFORE any signal is sent)
//!   └─► ShutdownCoordinator::stop()
//!
//! status()
//!   └─► registry.read() + liveness     (never fails; stale = NOT_RUNNING)
//! ```
//!
//! ## Rules
//! - `start` fails fast instead of spawning a duplicate; the supervised
//!   log files stay single-writer because of this guard.
//! - One watchdog slot per supervisor: a second persistent start while the
//!   loop is active is rejected with `WatchdogActive`.
//! - A stop that has begun signaling runs to a terminal state before the
//!   registry is free for the next start.
//!
//! ## Example
//! ```no_run
//! use procvisor::{Config, ServiceSpec, StartMode, Supervisor};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sup = Supervisor::new(Config::default(), "memory", Vec::new());
//!     let spec = ServiceSpec::new("memory", vec!["./memory-server".into()]);
//!
//!     sup.start(&spec, StartMode::Persistent).await?;
//!     sup.run_until_shutdown().await?;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;
use std::time::SystemTime;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::core::launcher::Launcher;
use crate::core::registry::PidRegistry;
use crate::core::shutdown::{self, ShutdownCoordinator, StopOutcome};
use crate::core::watchdog::{Watchdog, WatchdogExit};
use crate::error::SupervisorError;
use crate::events::{Bus, Event, EventKind};
use crate::service::ServiceSpec;
use crate::subscribers::{Subscribe, SubscriberSet};

/// How `start` should run the service.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartMode {
    /// Launch without monitoring.
    Basic,
    /// Launch and start the watchdog loop.
    Persistent,
    /// Launch attached to the caller's terminal and wait for exit.
    Debug,
}

/// Result of a successful `start`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartOutcome {
    /// A detached process is running.
    Launched {
        /// Pid of the launched process.
        pid: u32,
    },
    /// Debug mode: the attached process ran to completion.
    DebugExited {
        /// The child's exit code (1 when it died to a signal).
        exit_code: i32,
    },
}

/// Non-blocking liveness report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceStatus {
    /// A live record exists.
    Running {
        /// Recorded pid.
        pid: u32,
        /// When the record was written (launch or last relaunch).
        since: SystemTime,
    },
    /// No record, or only a stale one.
    NotRunning,
}

struct WatchdogSlot {
    token: CancellationToken,
    join: JoinHandle<Result<WatchdogExit, SupervisorError>>,
}

/// Composition root for one supervised service instance.
///
/// Must be created inside a Tokio runtime (subscriber workers are spawned
/// eagerly). The spec passed to [`start`](Supervisor::start) should carry the
/// same service name the supervisor was created with; the registry is keyed
/// by the supervisor's name, log files by the spec's.
pub struct Supervisor {
    cfg: Config,
    bus: Bus,
    subs: Arc<SubscriberSet>,
    registry: Arc<PidRegistry>,
    launcher: Launcher,
    watchdog: Mutex<Option<WatchdogSlot>>,
}

impl Supervisor {
    /// Creates a supervisor for the named service with the given subscribers.
    pub fn new(cfg: Config, name: impl Into<String>, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        let name = name.into();
        let bus = Bus::new(cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(subscribers));
        let registry = Arc::new(PidRegistry::new(cfg.pid_path(&name)));
        let launcher = Launcher::new(cfg.clone(), registry.clone(), bus.clone());

        let sup = Self {
            cfg,
            bus,
            subs,
            registry,
            launcher,
            watchdog: Mutex::new(None),
        };
        sup.subscriber_listener();
        sup
    }

    /// Subscribes to the bus and forwards events to the subscriber set.
    fn subscriber_listener(&self) {
        let mut rx = self.bus.subscribe();
        let subs = Arc::clone(&self.subs);
        tokio::spawn(async move {
            while let Ok(ev) = rx.recv().await {
                subs.emit(&ev);
            }
        });
    }

    /// Event bus handle, for additional listeners.
    pub fn bus(&self) -> Bus {
        self.bus.clone()
    }

    /// Registry handle, for callers needing non-blocking reads directly.
    pub fn registry(&self) -> Arc<PidRegistry> {
        Arc::clone(&self.registry)
    }

    /// Starts the service in the given mode.
    ///
    /// Fails fast with [`SupervisorError::AlreadyRunning`] when a live
    /// record exists; a stale record is cleared first and never blocks the
    /// start.
    pub async fn start(
        &self,
        spec: &ServiceSpec,
        mode: StartMode,
    ) -> Result<StartOutcome, SupervisorError> {
        if let Some(record) = self.registry.read() {
            if self.registry.is_live(&record) {
                return Err(SupervisorError::AlreadyRunning { pid: record.pid });
            }
            self.registry.clear()?;
            self.bus
                .publish(Event::now(EventKind::StaleRecordCleared).with_pid(record.pid));
        }

        match mode {
            StartMode::Basic => {
                let handle = self.launcher.launch_detached(spec, None).await?;
                Ok(StartOutcome::Launched { pid: handle.pid() })
            }
            StartMode::Persistent => {
                // Claim the slot before launching: two active monitoring
                // loops must never race over one registry.
                let mut slot = self.watchdog.lock().await;
                if let Some(active) = slot.as_ref() {
                    if !active.join.is_finished() {
                        return Err(SupervisorError::WatchdogActive);
                    }
                }

                let handle = self.launcher.launch_detached(spec, None).await?;
                let token = CancellationToken::new();
                let watchdog = Watchdog::new(
                    spec.clone(),
                    self.cfg.clone(),
                    self.launcher.clone(),
                    self.registry.clone(),
                    self.bus.clone(),
                );
                let join = tokio::spawn(watchdog.run(token.clone()));
                *slot = Some(WatchdogSlot { token, join });
                Ok(StartOutcome::Launched { pid: handle.pid() })
            }
            StartMode::Debug => {
                let (_handle, mut child) = self.launcher.launch_attached(spec).await?;
                let status = child
                    .wait()
                    .await
                    .map_err(|source| SupervisorError::SpawnFailure { source })?;
                self.registry.clear()?;
                Ok(StartOutcome::DebugExited {
                    exit_code: status.code().unwrap_or(1),
                })
            }
        }
    }

    /// Stops the service: suspends the watchdog, then runs the shutdown
    /// coordinator to a terminal state.
    ///
    /// Idempotent: with no record, or a stale one, returns
    /// [`StopOutcome::NotRunning`].
    pub async fn stop(&self) -> Result<StopOutcome, SupervisorError> {
        self.suspend_watchdog().await;
        self.coordinator().stop().await
    }

    /// Cancels and joins the watchdog, if one is active. The join means the
    /// loop has fully exited before any signal goes out; the watchdog can
    /// never observe the intentional kill as a crash.
    async fn suspend_watchdog(&self) {
        let slot = self.watchdog.lock().await.take();
        if let Some(slot) = slot {
            slot.token.cancel();
            let _ = slot.join.await;
        }
    }

    fn coordinator(&self) -> ShutdownCoordinator {
        ShutdownCoordinator::new(
            self.registry.clone(),
            self.bus.clone(),
            self.cfg.stop_checks,
            self.cfg.stop_check_interval,
        )
    }

    /// Reports liveness from the registry. Never fails; a stale record reads
    /// as [`ServiceStatus::NotRunning`].
    pub fn status(&self) -> ServiceStatus {
        match self.registry.read() {
            Some(record) if self.registry.is_live(&record) => ServiceStatus::Running {
                pid: record.pid,
                since: record.written_at,
            },
            _ => ServiceStatus::NotRunning,
        }
    }

    /// Waits for the active watchdog to finish and returns its result.
    ///
    /// `None` when no watchdog is active (or it panicked).
    pub async fn join_watchdog(&self) -> Option<Result<WatchdogExit, SupervisorError>> {
        let slot = self.watchdog.lock().await.take()?;
        slot.join.await.ok()
    }

    /// Foreground driver for persistent mode: blocks until a termination
    /// signal arrives (then stops the service) or the watchdog ends on its
    /// own (crash loop surfaces as the error).
    pub async fn run_until_shutdown(&self) -> Result<(), SupervisorError> {
        let slot = self.watchdog.lock().await.take();
        match slot {
            Some(mut slot) => {
                tokio::select! {
                    _ = shutdown::wait_for_shutdown_signal() => {
                        slot.token.cancel();
                        let _ = (&mut slot.join).await;
                        self.coordinator().stop().await?;
                        Ok(())
                    }
                    res = &mut slot.join => match res {
                        Ok(Ok(_exit)) => Ok(()),
                        Ok(Err(e)) => Err(e),
                        Err(_) => Ok(()),
                    }
                }
            }
            None => {
                let _ = shutdown::wait_for_shutdown_signal().await;
                self.stop().await.map(|_| ())
            }
        }
    }
}

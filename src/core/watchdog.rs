//! Watchdog: liveness polling with bounded restarts.
//!
//! Supervises one registered process by polling, not by exit notification
//! (portable across platforms without process-exit primitives). Each tick:
//!
//! ```text
//! loop {
//!   ├─► cancelled?              ─► exit Suspended   (intentional stop)
//!   ├─► sleep(poll_interval)    (cancellable)
//!   ├─► registry.read()
//!   │     ├─ None               ─► exit Idle        (nothing to supervise)
//!   │     └─ Some(record)
//!   │          ├─ pid alive     ─► next tick
//!   │          └─ pid dead      ─► crash:
//!   │               ├─► RestartWindow::assess()
//!   │               │     ├─ GiveUp          ─► clear record, CrashLoopDetected
//!   │               │     └─ Restart{delay}  ─► sleep(delay) (cancellable)
//!   │               │                           relaunch via Launcher
//!   │               └─► continue monitoring the new pid
//! }
//! ```
//!
//! ## Rules
//! - Cancellation is cooperative: the token is checked at the top of each
//!   tick and during every sleep, never mid-relaunch.
//! - Relaunches reuse the original [`ServiceSpec`] unchanged.
//! - The restart budget is windowed; exhausting it ends monitoring with
//!   [`CrashLoopDetected`](SupervisorError::CrashLoopDetected) instead of
//!   restarting again. The service stays down until an explicit new start.
//! - Exactly one watchdog loop may supervise a service instance; the
//!   supervisor enforces this with its watchdog slot.

use std::sync::Arc;
use std::time::Instant;

use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::core::launcher::Launcher;
use crate::core::registry::PidRegistry;
use crate::error::SupervisorError;
use crate::events::{Bus, Event, EventKind};
use crate::policies::{RestartDecision, RestartWindow};
use crate::service::ServiceSpec;

/// Why a watchdog loop ended without error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatchdogExit {
    /// Suspended by an intentional stop.
    Suspended,
    /// The registry held no record; nothing left to supervise.
    Idle,
}

/// Polling monitor for one supervised service.
pub struct Watchdog {
    spec: ServiceSpec,
    cfg: Config,
    launcher: Launcher,
    registry: Arc<PidRegistry>,
    bus: Bus,
}

impl Watchdog {
    /// Creates a watchdog relaunching `spec` through `launcher`.
    pub fn new(
        spec: ServiceSpec,
        cfg: Config,
        launcher: Launcher,
        registry: Arc<PidRegistry>,
        bus: Bus,
    ) -> Self {
        Self {
            spec,
            cfg,
            launcher,
            registry,
            bus,
        }
    }

    /// Runs the monitoring loop until suspension, an empty registry, a crash
    /// loop, or a relaunch failure.
    pub async fn run(self, token: CancellationToken) -> Result<WatchdogExit, SupervisorError> {
        self.bus.publish(Event::now(EventKind::WatchdogStarted));
        let mut window = RestartWindow::new(Instant::now());

        loop {
            tokio::select! {
                _ = token.cancelled() => return self.suspend(),
                _ = time::sleep(self.cfg.poll_interval) => {}
            }

            let Some(record) = self.registry.read() else {
                self.bus.publish(Event::now(EventKind::WatchdogIdle));
                return Ok(WatchdogExit::Idle);
            };
            if self.registry.is_live(&record) {
                continue;
            }

            self.bus
                .publish(Event::now(EventKind::CrashDetected).with_pid(record.pid));

            match window.assess(&self.cfg.restart, Instant::now()) {
                RestartDecision::GiveUp => {
                    // The record names a dead pid; drop it so status reads
                    // NOT_RUNNING and a fresh start skips the stale path.
                    if let Err(e) = self.registry.clear() {
                        tracing::warn!(error = %e, "could not clear record after crash loop");
                    }
                    let restarts = window.count();
                    self.bus.publish(
                        Event::now(EventKind::CrashLoopDetected)
                            .with_attempt(restarts)
                            .with_reason("restart budget exhausted"),
                    );
                    return Err(SupervisorError::CrashLoopDetected {
                        restarts,
                        window: self.cfg.restart.window,
                    });
                }
                RestartDecision::Restart { delay } => {
                    self.bus.publish(
                        Event::now(EventKind::RestartScheduled)
                            .with_delay(delay)
                            .with_attempt(window.count()),
                    );
                    tokio::select! {
                        _ = token.cancelled() => return self.suspend(),
                        _ = time::sleep(delay) => {}
                    }
                    self.launcher
                        .launch_detached(&self.spec, Some(window.count()))
                        .await?;
                }
            }
        }
    }

    fn suspend(&self) -> Result<WatchdogExit, SupervisorError> {
        self.bus.publish(Event::now(EventKind::WatchdogSuspended));
        Ok(WatchdogExit::Suspended)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::policies::{BackoffPolicy, JitterPolicy, RestartPolicy};

    fn fast_config(dir: &std::path::Path, max_restarts: u32) -> Config {
        let mut cfg = Config::default().with_base_dir(dir);
        cfg.poll_interval = Duration::from_millis(40);
        cfg.restart = RestartPolicy {
            max_restarts_per_window: max_restarts,
            window: Duration::from_secs(60),
            backoff: BackoffPolicy {
                base: Duration::from_millis(10),
                factor: 2.0,
                max: Duration::from_millis(80),
                jitter: JitterPolicy::None,
            },
        };
        cfg
    }

    fn wire(cfg: &Config) -> (Launcher, Arc<PidRegistry>, Bus) {
        let bus = Bus::new(64);
        let registry = Arc::new(PidRegistry::new(cfg.pid_path("svc")));
        let launcher = Launcher::new(cfg.clone(), registry.clone(), bus.clone());
        (launcher, registry, bus)
    }

    fn sh(script: &str) -> Vec<String> {
        vec!["/bin/sh".into(), "-c".into(), script.into()]
    }

    #[tokio::test]
    async fn empty_registry_ends_the_loop() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = fast_config(dir.path(), 3);
        let (launcher, registry, bus) = wire(&cfg);

        let watchdog = Watchdog::new(ServiceSpec::new("svc", sh("true")), cfg, launcher, registry, bus);
        let exit = watchdog.run(CancellationToken::new()).await.expect("run");
        assert_eq!(exit, WatchdogExit::Idle);
    }

    #[tokio::test]
    async fn suspension_wins_over_crash_detection() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = fast_config(dir.path(), 3);
        let (launcher, registry, bus) = wire(&cfg);

        // A spec that would crash instantly if it were ever relaunched.
        let spec = ServiceSpec::new("svc", sh("exit 1"));
        launcher.launch_detached(&spec, None).await.expect("launch");

        let token = CancellationToken::new();
        token.cancel();
        let watchdog = Watchdog::new(spec, cfg, launcher, registry.clone(), bus);
        let exit = watchdog.run(token).await.expect("run");
        assert_eq!(exit, WatchdogExit::Suspended);
        // No relaunch happened: the record still names the dead first pid.
        assert!(registry.read_live().is_none());
    }

    #[tokio::test]
    async fn crash_loop_stops_after_the_budget() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = fast_config(dir.path(), 3);
        let (launcher, registry, bus) = wire(&cfg);

        let spec = ServiceSpec::new("svc", sh("exit 1"));
        launcher.launch_detached(&spec, None).await.expect("launch");

        let watchdog = Watchdog::new(spec, cfg.clone(), launcher, registry.clone(), bus.clone());
        let mut rx = bus.subscribe();

        let err = tokio::time::timeout(
            Duration::from_secs(10),
            watchdog.run(CancellationToken::new()),
        )
        .await
        .expect("watchdog should give up well within the timeout")
        .unwrap_err();

        match err {
            SupervisorError::CrashLoopDetected { restarts, .. } => assert_eq!(restarts, 3),
            other => panic!("expected CrashLoopDetected, got {other:?}"),
        }

        // Exactly three relaunches were published before the give-up.
        let mut started = 0;
        let mut gave_up = false;
        while let Ok(ev) = rx.try_recv() {
            match ev.kind {
                EventKind::ProcessStarted => started += 1,
                EventKind::CrashLoopDetected => gave_up = true,
                _ => {}
            }
        }
        assert_eq!(started, 3);
        assert!(gave_up);

        // Record cleared: status reads NOT_RUNNING, a fresh start is clean.
        assert!(registry.read().is_none());
    }
}

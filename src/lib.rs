//! # procvisor
//!
//! **Procvisor** launches a long-running service as an OS process, tracks it
//! by process identity, detects crashes, restarts it under a bounded policy,
//! and tears it down cleanly on request.
//!
//! The supervised program is opaque: one entry command, stdout/stderr to
//! redirect, an OS pid. Its readiness and protocol health are out of scope —
//! only OS-level liveness is used.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!              ┌───────────────┐
//!              │  ServiceSpec  │ (command, env, probe, recovery)
//!              └───────┬───────┘
//!                      ▼
//! ┌───────────────────────────────────────────────────────────┐
//! │  Supervisor (composition root)                            │
//! │  - Bus (broadcast events)                                 │
//! │  - SubscriberSet (fans out to subscribers)                │
//! │  - PidRegistry (persisted pid record, atomic replace)     │
//! │  - Launcher (probe → recovery → spawn → register)         │
//! └───┬───────────────────┬───────────────────┬───────────────┘
//!     ▼                   ▼                   ▼
//! ┌─────────┐      ┌─────────────┐    ┌──────────────────────┐
//! │  start  │      │  Watchdog   │    │ ShutdownCoordinator  │
//! │ (modes) │      │ (poll loop) │    │ (TERM → wait → KILL) │
//! └─────────┘      └──────┬──────┘    └──────────┬───────────┘
//!                         │ Publishes            │ Publishes
//!                         │ - CrashDetected      │ - TermSignalSent
//!                         │ - RestartScheduled   │ - KillEscalated
//!                         │ - CrashLoopDetected  │ - Terminated / StopFailed
//!                         ▼                      ▼
//! ┌───────────────────────────────────────────────────────────┐
//! │                 Bus (broadcast channel)                   │
//! └───────────────────────────┬───────────────────────────────┘
//!                             ▼
//!                   SubscriberSet workers
//!                  (EventLog file, stdout)
//! ```
//!
//! ### Lifecycle
//! ```text
//! start ──► Launcher spawns process ──► PidRegistry records it
//!       └─► persistent mode: Watchdog polls liveness
//!
//! Watchdog tick:
//!   ├─► record absent          ─► loop exits
//!   ├─► pid alive              ─► next tick
//!   └─► pid dead               ─► crash:
//!        ├─► budget left       ─► backoff, relaunch, keep monitoring
//!        └─► budget exhausted  ─► CrashLoopDetected, loop exits
//!
//! stop ──► suspend Watchdog (join first!) ──► SIGTERM ──► bounded wait
//!      └─► still alive: SIGKILL ──► bounded wait ──► Terminated | FAILED
//!
//! status ──► registry record + OS liveness (stale record = NOT_RUNNING)
//! ```
//!
//! ## Features
//! | Area            | Description                                              | Key types                              |
//! |-----------------|----------------------------------------------------------|----------------------------------------|
//! | **Lifecycle**   | Start (basic/persistent/debug), stop, status.            | [`Supervisor`], [`StartMode`]          |
//! | **Registry**    | Atomic pid record with staleness detection.              | [`PidRegistry`], [`PidRecord`]         |
//! | **Policies**    | Bounded windowed restarts with backoff and jitter.       | [`RestartPolicy`], [`BackoffPolicy`]   |
//! | **Monitoring**  | Polling watchdog with cooperative suspension.            | [`Watchdog`], [`WatchdogExit`]         |
//! | **Shutdown**    | Graceful-then-forced termination state machine.          | [`ShutdownCoordinator`], [`StopOutcome`] |
//! | **Subscribers** | Event log file and stdout mirror, custom sinks.          | [`Subscribe`], [`EventLog`]            |
//! | **Errors**      | Typed failures with stable labels and CLI exit codes.    | [`SupervisorError`]                    |
//!
//! ## Example
//! ```no_run
//! use procvisor::{Config, ServiceSpec, StartMode, StartOutcome, Supervisor};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config::default().apply_env();
//!     let sup = Supervisor::new(cfg, "memory", Vec::new());
//!
//!     let spec = ServiceSpec::new("memory", vec!["./memory-server".into()])
//!         .with_flush_env("PYTHONUNBUFFERED");
//!
//!     match sup.start(&spec, StartMode::Basic).await? {
//!         StartOutcome::Launched { pid } => println!("started pid={pid}"),
//!         StartOutcome::DebugExited { .. } => unreachable!("basic mode"),
//!     }
//!     Ok(())
//! }
//! ```

mod config;
mod core;
mod error;
mod events;
mod policies;
mod service;
mod subscribers;

// ---- Public re-exports ----

pub use config::Config;
pub use crate::core::{
    Launcher, PidRecord, PidRegistry, ServiceStatus, ShutdownCoordinator, StartMode, StartOutcome,
    StopOutcome, Supervisor, Watchdog, WatchdogExit, wait_for_shutdown_signal,
};
pub use error::SupervisorError;
pub use events::{Bus, Event, EventKind};
pub use policies::{BackoffPolicy, JitterPolicy, RestartDecision, RestartPolicy, RestartWindow};
pub use service::{ProcessHandle, ServiceSpec};
pub use subscribers::{EventLog, LogWriter, Subscribe, SubscriberSet};

//! Runtime core: process lifecycle orchestration.
//!
//! This module contains the supervision machinery. The composition root is
//! [`Supervisor`]; the other pieces are exported for callers that drive them
//! directly (non-blocking registry reads, standalone watchdog runs).
//!
//! Internal layout:
//! - [`alive`]: OS-level pid liveness probing;
//! - [`registry`]: the persisted pid record with atomic-replace writes;
//! - [`launcher`]: environment probe/recovery and process creation;
//! - [`shutdown`]: the graceful-stop state machine and signal handling;
//! - [`watchdog`]: the polling monitor with bounded restarts;
//! - [`supervisor`]: wiring plus the start/stop/status surface.

pub mod alive;
mod launcher;
mod registry;
mod shutdown;
mod supervisor;
mod watchdog;

pub use launcher::Launcher;
pub use registry::{PidRecord, PidRegistry};
pub use shutdown::{ShutdownCoordinator, StopOutcome, wait_for_shutdown_signal};
pub use supervisor::{ServiceStatus, StartMode, StartOutcome, Supervisor};
pub use watchdog::{Watchdog, WatchdogExit};

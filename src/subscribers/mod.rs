//! Event subscribers for the supervision runtime.
//!
//! This module provides the [`Subscribe`] trait and the built-in
//! implementations the CLI wires up.
//!
//! ## Architecture
//! ```text
//! Launcher/Watchdog/Shutdown ── publish(Event) ──► Bus
//!                                                    │
//!                                     Supervisor listener ──► SubscriberSet
//!                                                    ┌─────────┼─────────┐
//!                                                    ▼         ▼         ▼
//!                                                 EventLog  LogWriter  custom
//! ```
//!
//! - [`EventLog`] — durable append-only event log file
//! - [`LogWriter`] — stdout mirror for interactive use
//! - [`SubscriberSet`] — bounded-queue fan-out with panic isolation

mod eventlog;
mod log;
mod set;
mod subscribe;

pub use eventlog::EventLog;
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;

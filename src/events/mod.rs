//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to lifecycle events emitted by the launcher, watchdog,
//! shutdown coordinator, and supervisor.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] — event classification and payload metadata
//! - [`Bus`] — thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Launcher`, `Watchdog`, `ShutdownCoordinator`,
//!   `Supervisor`, subscriber workers (overflow/panic).
//! - **Consumers**: the supervisor's fan-out listener, which forwards to the
//!   [`SubscriberSet`](crate::subscribers::SubscriberSet).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};

//! Bounded restart policy for the watchdog.
//!
//! [`RestartPolicy`] caps how many relaunches may happen inside a rolling
//! window, so a service that dies immediately on every launch ends in
//! [`CrashLoopDetected`](crate::SupervisorError::CrashLoopDetected) instead of
//! an unbounded spawn/log-file storm.
//!
//! [`RestartWindow`] is the mutable accounting half: it lives inside the
//! watchdog loop, tracks the current window and restart count, and turns each
//! observed crash into a [`RestartDecision`].
//!
//! ## Wiring
//! ```text
//! Watchdog tick: pid dead ──► window.assess(&policy, Instant::now())
//!                                   ├─► Restart { delay } ─► sleep, relaunch
//!                                   └─► GiveUp            ─► CrashLoopDetected
//! ```

use std::time::{Duration, Instant};

use crate::policies::BackoffPolicy;

/// Policy bounding watchdog restarts.
///
/// `max_restarts_per_window = 0` means the watchdog never restarts: the first
/// crash is reported as a crash loop immediately.
#[derive(Clone, Copy, Debug)]
pub struct RestartPolicy {
    /// Maximum relaunches allowed inside one window.
    pub max_restarts_per_window: u32,
    /// Rolling window the budget applies to.
    pub window: Duration,
    /// Delay schedule between consecutive relaunches.
    pub backoff: BackoffPolicy,
}

impl Default for RestartPolicy {
    /// Returns 5 restarts per 60-second window with the default backoff.
    fn default() -> Self {
        Self {
            max_restarts_per_window: 5,
            window: Duration::from_secs(60),
            backoff: BackoffPolicy::default(),
        }
    }
}

/// Outcome of consulting the policy after a crash.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RestartDecision {
    /// Relaunch after waiting `delay`.
    Restart {
        /// Backoff delay before the relaunch.
        delay: Duration,
    },
    /// Budget exhausted; stop monitoring and report a crash loop.
    GiveUp,
}

/// Restart accounting for the current window.
///
/// Owned by a single watchdog loop; not shared and not persisted.
#[derive(Clone, Copy, Debug)]
pub struct RestartWindow {
    window_start: Instant,
    count: u32,
}

impl RestartWindow {
    /// Opens a fresh window at `now` with a zero restart count.
    pub fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            count: 0,
        }
    }

    /// Restarts performed in the current window so far.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Records a crash at `now` and decides whether to relaunch.
    ///
    /// A crash arriving after the window has elapsed rolls the window over
    /// (the count resets); within the window, the `count`-th relaunch uses
    /// `backoff.delay_for(count)` and bumps the counter. Once the counter
    /// reaches the cap the answer is [`RestartDecision::GiveUp`] and stays
    /// that way until the window rolls over again.
    pub fn assess(&mut self, policy: &RestartPolicy, now: Instant) -> RestartDecision {
        if now.duration_since(self.window_start) >= policy.window {
            self.window_start = now;
            self.count = 0;
        }
        if self.count >= policy.max_restarts_per_window {
            return RestartDecision::GiveUp;
        }
        let delay = policy.backoff.delay_for(self.count);
        self.count += 1;
        RestartDecision::Restart { delay }
    }
}

//! Backoff schedule between relaunches.
//!
//! [`BackoffPolicy`] controls how the delay before the next relaunch grows as
//! crashes repeat inside one restart window:
//! - [`BackoffPolicy::base`] — delay before the first relaunch;
//! - [`BackoffPolicy::factor`] — multiplicative growth factor;
//! - [`BackoffPolicy::max`] — hard cap.
//!
//! The delay for relaunch `n` (0-indexed within the window) is
//! `base × factor^n`, clamped to `max`, with jitter applied last. The base is
//! derived purely from the relaunch index, so jitter output never feeds back
//! into later delays.

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Relaunch delay schedule.
#[derive(Clone, Copy, Debug)]
pub struct BackoffPolicy {
    /// Delay before the first relaunch.
    pub base: Duration,
    /// Multiplicative growth factor (`>= 1.0` recommended).
    pub factor: f64,
    /// Maximum delay cap.
    pub max: Duration,
    /// Randomization applied to the clamped delay.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// Returns `base = 1s`, `factor = 2.0`, `max = 30s`, no jitter.
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            factor: 2.0,
            max: Duration::from_secs(30),
            jitter: JitterPolicy::None,
        }
    }
}

impl BackoffPolicy {
    /// Computes the delay before relaunch `n` (0-indexed).
    ///
    /// Overflowing or non-finite intermediate values clamp to
    /// [`BackoffPolicy::max`].
    pub fn delay_for(&self, n: u32) -> Duration {
        let max_secs = self.max.as_secs_f64();
        let exp = n.min(i32::MAX as u32) as i32;
        let raw_secs = self.base.as_secs_f64() * self.factor.powi(exp);

        let clamped = if !raw_secs.is_finite() || raw_secs < 0.0 || raw_secs > max_secs {
            self.max
        } else {
            Duration::from_secs_f64(raw_secs)
        };

        self.jitter.apply(clamped)
    }
}

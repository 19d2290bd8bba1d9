//! Exponential backoff with symmetric jitter.

use rand::Rng;
use std::time::Duration;

/// Wait between failed attempts: `initial * multiplier^(n-1)`, capped at
/// `max`, then moved by up to `±jitter` of itself (never above `max`).
#[derive(Clone, Debug, PartialEq)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub multiplier: f64,
    pub max: Duration,
    /// Fraction in `[0, 1)`.
    pub jitter: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(5),
            multiplier: 2.0,
            max: Duration::from_secs(180),
            jitter: 0.2,
        }
    }
}

impl BackoffPolicy {
    /// Un-jittered wait after failed attempt number `attempt` (1-based).
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let ms = self.initial.as_millis() as f64 * self.multiplier.powi(exponent);
        let max_ms = self.max.as_millis() as f64;
        Duration::from_millis(ms.min(max_ms) as u64)
    }

    /// `base` moved by up to ±`jitter`, never above `max`. At the cap the
    /// spread is therefore one-sided (`max * (1 - jitter)..=max`).
    pub fn jittered<R: Rng + ?Sized>(&self, base: Duration, rng: &mut R) -> Duration {
        if self.jitter <= 0.0 {
            return base.min(self.max);
        }
        let base_ms = base.as_millis() as f64;
        let spread = base_ms * self.jitter;
        let offset = rng.gen_range(-spread..=spread);
        let ms = (base_ms + offset).max(0.0) as u64;
        Duration::from_millis(ms).min(self.max)
    }

    /// Jittered wait after failed attempt number `attempt`.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.jittered(self.base_delay(attempt), &mut rand::thread_rng())
    }
}

//! Exponential backoff between readiness checks.

use crate::config::ReadinessConfig;
use rand::Rng;
use std::time::Duration;

/// Delay schedule for polling a starting server.
#[derive(Debug, Clone, PartialEq)]
pub struct Backoff {
    /// Delay after the first failed check.
    pub initial: Duration,
    /// Cap on any single delay.
    pub max: Duration,
    /// Growth factor per attempt (typically 2.0).
    pub multiplier: f64,
    /// Randomize each delay by a factor in 0.5..1.5.
    pub jitter: bool,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: ReadinessConfig::INITIAL_INTERVAL,
            max: ReadinessConfig::MAX_INTERVAL,
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl Backoff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_initial(mut self, delay: Duration) -> Self {
        self.initial = delay;
        self
    }

    pub fn with_max(mut self, delay: Duration) -> Self {
        self.max = delay;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay after the given failed attempt (0-indexed).
    pub fn delay(&self, attempt: u32) -> Duration {
        let multiplier = self.multiplier.powi(attempt.min(i32::MAX as u32) as i32);
        let capped = (self.initial.as_secs_f64() * multiplier).min(self.max.as_secs_f64());

        let secs = if self.jitter {
            let factor = rand::rng().random_range(0.5..1.5);
            (capped * factor).min(self.max.as_secs_f64())
        } else {
            capped
        };

        // Negative schedules clamp to zero, overflowing ones to the cap
        Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_doubles_without_jitter() {
        let backoff = Backoff::new()
            .with_initial(Duration::from_millis(250))
            .with_max(Duration::from_secs(60))
            .with_jitter(false);

        assert_eq!(backoff.delay(0), Duration::from_millis(250));
        assert_eq!(backoff.delay(1), Duration::from_millis(500));
        assert_eq!(backoff.delay(2), Duration::from_secs(1));
    }

    #[test]
    fn test_delay_capped_at_max() {
        let backoff = Backoff::new()
            .with_initial(Duration::from_secs(1))
            .with_max(Duration::from_secs(2))
            .with_jitter(false);

        assert_eq!(backoff.delay(10), Duration::from_secs(2));
        assert_eq!(backoff.delay(u32::MAX), Duration::from_secs(2));
    }

    #[test]
    fn test_uncapped_delay_saturates() {
        let backoff = Backoff::new()
            .with_max(Duration::MAX)
            .with_jitter(false);

        assert_eq!(backoff.delay(70), Duration::MAX);
        assert_eq!(backoff.delay(u32::MAX), Duration::MAX);

        let jittered = backoff.with_jitter(true).delay(70);
        assert!(jittered >= Duration::from_secs(u64::MAX / 2 - 1));
    }

    #[test]
    fn test_negative_multiplier_does_not_panic() {
        let backoff = Backoff {
            multiplier: -2.0,
            ..Backoff::new().with_jitter(false)
        };

        assert_eq!(backoff.delay(0), Duration::from_millis(250));
        assert_eq!(backoff.delay(1), Duration::ZERO);
    }

    #[test]
    fn test_jitter_stays_in_bounds() {
        let backoff = Backoff::new()
            .with_initial(Duration::from_secs(1))
            .with_max(Duration::from_secs(10));

        for _ in 0..100 {
            let delay = backoff.delay(0);
            assert!(delay >= Duration::from_millis(500));
            assert!(delay <= Duration::from_millis(1500));
        }
    }
}

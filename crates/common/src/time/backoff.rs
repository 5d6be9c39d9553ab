//! Backoff delay calculation
//!
//! Delays grow as `min * 2^attempt`, are capped at `max`, and are then
//! randomized by a jitter factor so that many agents started together do not
//! retry in lockstep.

use std::time::Duration;

use rand::Rng;

/// Largest exponent worth computing; `2^20` minutes is already far beyond
/// any sensible cap.
const MAX_EXPONENT: u32 = 20;

/// Exponential backoff bounded to `[min, max]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialBackoff {
    min: Duration,
    max: Duration,
    jitter: f64,
}

impl ExponentialBackoff {
    /// Create a backoff sequence.
    ///
    /// `jitter` is clamped to `[0.0, 1.0]` and `max` is raised to `min` if
    /// the bounds are inverted.
    pub fn new(min: Duration, max: Duration, jitter: f64) -> Self {
        Self { min, max: max.max(min), jitter: jitter.clamp(0.0, 1.0) }
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    /// Un-jittered delay for the given attempt (0-based).
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.min(MAX_EXPONENT));
        self.min.saturating_mul(factor).min(self.max)
    }

    /// Jittered delay for the given attempt using the thread-local RNG.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.delay_with(attempt, &mut rand::thread_rng())
    }

    /// Jittered delay for the given attempt using the supplied RNG.
    ///
    /// The jitter spans `-jitter/2 .. +jitter/2` of the base delay and the
    /// result never leaves `[min, max]`.
    pub fn delay_with<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let base = self.base_delay(attempt);
        if self.jitter == 0.0 {
            return base;
        }

        let base_secs = base.as_secs_f64();
        let jitter_range = base_secs * self.jitter;
        let offset = rng.gen_range(-jitter_range / 2.0..=jitter_range / 2.0);
        let jittered = Duration::from_secs_f64((base_secs + offset).max(0.0));

        jittered.clamp(self.min, self.max)
    }
}

/// Uniform random duration in `[min, max]`.
pub fn random_between(min: Duration, max: Duration) -> Duration {
    random_between_with(min, max, &mut rand::thread_rng())
}

/// Uniform random duration in `[min, max]` using the supplied RNG.
pub fn random_between_with<R: Rng + ?Sized>(min: Duration, max: Duration, rng: &mut R) -> Duration {
    if max <= min {
        return min;
    }
    let nanos = rng.gen_range(min.as_nanos()..=max.as_nanos());
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    //! Unit tests for time::backoff.
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    /// Validates `ExponentialBackoff::base_delay` behavior for the doubling
    /// sequence scenario.
    ///
    /// Assertions:
    /// - Delays double from `min` until they reach `max`.
    /// - Attempts past the cap stay at `max`, including absurdly large ones.
    #[test]
    fn test_base_delay_doubles_until_cap() {
        let backoff =
            ExponentialBackoff::new(Duration::from_secs(60), Duration::from_secs(900), 0.3);

        assert_eq!(backoff.base_delay(0), Duration::from_secs(60));
        assert_eq!(backoff.base_delay(1), Duration::from_secs(120));
        assert_eq!(backoff.base_delay(2), Duration::from_secs(240));
        assert_eq!(backoff.base_delay(3), Duration::from_secs(480));
        assert_eq!(backoff.base_delay(4), Duration::from_secs(900));
        assert_eq!(backoff.base_delay(u32::MAX), Duration::from_secs(900));
    }

    /// Validates `ExponentialBackoff::delay_with` behavior for the jitter
    /// bounds scenario.
    ///
    /// Assertions:
    /// - Every jittered delay lies within `[min, max]`.
    /// - Jittered delays for attempt 1 stay within 15% of the base.
    #[test]
    fn test_jittered_delay_stays_in_bounds() {
        let backoff =
            ExponentialBackoff::new(Duration::from_secs(60), Duration::from_secs(900), 0.3);
        let mut rng = StdRng::seed_from_u64(7);

        for attempt in 0..10 {
            for _ in 0..50 {
                let delay = backoff.delay_with(attempt, &mut rng);
                assert!(delay >= Duration::from_secs(60), "{delay:?} below min");
                assert!(delay <= Duration::from_secs(900), "{delay:?} above max");
            }
        }

        for _ in 0..50 {
            let secs = backoff.delay_with(1, &mut rng).as_secs_f64();
            assert!((102.0..=138.0).contains(&secs), "{secs} outside 120s +/- 15%");
        }
    }

    /// Validates `ExponentialBackoff::new` behavior for the argument
    /// normalization scenario.
    ///
    /// Assertions:
    /// - Inverted bounds collapse to `min`.
    /// - Jitter is clamped into `[0, 1]`.
    #[test]
    fn test_new_normalizes_arguments() {
        let backoff = ExponentialBackoff::new(Duration::from_secs(10), Duration::from_secs(5), 4.0);
        assert_eq!(backoff.max(), Duration::from_secs(10));
        assert!((backoff.jitter() - 1.0).abs() < f64::EPSILON);
        assert_eq!(backoff.delay(3), Duration::from_secs(10));
    }

    #[test]
    fn test_random_between_bounds() {
        let mut rng = StdRng::seed_from_u64(42);
        let min = Duration::from_secs(24 * 3600);
        let max = Duration::from_secs(48 * 3600);

        for _ in 0..100 {
            let d = random_between_with(min, max, &mut rng);
            assert!(d >= min && d <= max);
        }
        assert_eq!(random_between(max, min), max);
    }
}

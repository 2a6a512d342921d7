//! Backoff policy implementations

use super::Backoff;
use rand::Rng;
use std::time::Duration;

/// Upper bound (exclusive) of the jitter added to exponential waits
pub const MAX_JITTER: Duration = Duration::from_millis(500);

/// Never retries
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopBackoff;

impl NoopBackoff {
    pub fn new() -> Self {
        Self
    }
}

impl Backoff for NoopBackoff {
    fn next_delay(&mut self) -> Option<Duration> {
        None
    }
}

/// Always waits `base` and never exhausts
///
/// Combined with a retry policy that never says stop, this retries forever.
/// Bounding the sequence (through the context or the policy) is up to the
/// caller.
#[derive(Debug, Clone, Copy)]
pub struct InfiniteBackoff {
    base: Duration,
}

impl InfiniteBackoff {
    pub fn new(base: Duration) -> Self {
        Self { base }
    }
}

impl Backoff for InfiniteBackoff {
    fn next_delay(&mut self) -> Option<Duration> {
        Some(self.base)
    }
}

/// Waits `base` between retries, at most `retries` times
///
/// A zero base is allowed and retries immediately.
#[derive(Debug, Clone, Copy)]
pub struct LimitedTriesBackoff {
    base: Duration,
    done: u32,
    retries: u32,
}

impl LimitedTriesBackoff {
    pub fn new(base: Duration, retries: u32) -> Self {
        Self {
            base,
            done: 0,
            retries,
        }
    }

    /// Retries handed out so far
    pub fn attempts_done(&self) -> u32 {
        self.done
    }
}

impl Backoff for LimitedTriesBackoff {
    fn next_delay(&mut self) -> Option<Duration> {
        if self.done >= self.retries {
            return None;
        }
        self.done += 1;
        Some(self.base)
    }
}

/// Doubling wait with jitter, capped at `max`, at most `retries` times
///
/// The first wait is `base`, then `2 * base`, `4 * base` and so on. Every
/// wait gets a uniform jitter in `[0, 500ms)`. Once the un-jittered wait
/// reaches `max`, `max` plus jitter is returned instead.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    base: Duration,
    max: Duration,
    done: u32,
    retries: u32,
    jitter: fn() -> Duration,
}

impl ExponentialBackoff {
    /// Create an exponential backoff
    ///
    /// # Panics
    ///
    /// Panics if `base` is zero. An exponential policy that starts at zero
    /// retries instantly, which is never what a caller wants.
    pub fn new(base: Duration, max: Duration, retries: u32) -> Self {
        assert!(
            !base.is_zero(),
            "exponential backoff base duration must be greater than 0"
        );

        Self {
            base,
            max,
            done: 0,
            retries,
            jitter: random_jitter,
        }
    }

    /// Replace the jitter source
    #[must_use]
    pub fn with_jitter(mut self, jitter: fn() -> Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Retries handed out so far
    pub fn attempts_done(&self) -> u32 {
        self.done
    }

    fn raw_delay(&self) -> Option<Duration> {
        if self.done == 0 {
            return Some(self.base);
        }
        let factor = 2u32.checked_pow(self.done)?;
        self.base.checked_mul(factor)
    }
}

impl Backoff for ExponentialBackoff {
    fn next_delay(&mut self) -> Option<Duration> {
        if self.done >= self.retries {
            return None;
        }

        // Overflow means we are far past the cap
        let raw = self.raw_delay().unwrap_or(self.max);
        self.done += 1;

        let jitter = (self.jitter)();
        if raw >= self.max {
            return Some(self.max.saturating_add(jitter));
        }
        Some(raw.saturating_add(jitter))
    }
}

fn random_jitter() -> Duration {
    let millis = rand::thread_rng().gen_range(0..MAX_JITTER.as_millis() as u64);
    Duration::from_millis(millis)
}

#[cfg(test)]
mod policy_tests {
    use super::*;

    #[test]
    fn test_random_jitter_bounds() {
        for _ in 0..1000 {
            assert!(random_jitter() < MAX_JITTER);
        }
    }

    #[test]
    #[should_panic(expected = "base duration must be greater than 0")]
    fn test_exponential_zero_base_panics() {
        let _ = ExponentialBackoff::new(Duration::ZERO, Duration::from_secs(1), 3);
    }

    #[test]
    fn test_exponential_overflow_caps() {
        let mut backoff =
            ExponentialBackoff::new(Duration::from_secs(1), Duration::from_secs(10), 64)
                .with_jitter(|| Duration::ZERO);
        for _ in 0..64 {
            assert!(backoff.next_delay().unwrap() <= Duration::from_secs(10));
        }
        assert_eq!(backoff.next_delay(), None);
    }

    #[test]
    fn test_exponential_jitter_saturates_near_duration_max() {
        let mut backoff = ExponentialBackoff::new(Duration::from_secs(1), Duration::MAX, 3)
            .with_jitter(|| Duration::from_millis(499));
        assert_eq!(
            backoff.next_delay(),
            Some(Duration::from_secs(1) + Duration::from_millis(499))
        );

        let mut backoff = ExponentialBackoff::new(Duration::MAX, Duration::MAX, 2)
            .with_jitter(|| Duration::from_millis(499));
        assert_eq!(backoff.next_delay(), Some(Duration::MAX));
        assert_eq!(backoff.next_delay(), Some(Duration::MAX));
    }
}

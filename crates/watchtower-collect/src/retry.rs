//! Bounded retry with exponential backoff
//!
//! A collector cycle is attempt `0` plus up to `max_retries` retries. After
//! a failed attempt the policy either names the delay before the next one
//! or declares the cycle failed.

use std::time::Duration;
use watchtower_core::AppConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
}

/// What to do after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryStep {
    /// Sleep `delay`, then run attempt `next_attempt`
    Retry { next_attempt: u32, delay: Duration },
    /// The failed attempt was the last one
    GiveUp,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base: Duration::from_millis(500),
            backoff_max: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff_base: Duration, backoff_max: Duration) -> Self {
        Self {
            max_retries,
            backoff_base,
            backoff_max,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.max_retries, config.backoff_base, config.backoff_max)
    }

    /// `min(base * 2^attempt, max)`, saturating
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.backoff_base
            .checked_mul(factor)
            .unwrap_or(self.backoff_max)
            .min(self.backoff_max)
    }

    pub fn is_final(&self, attempt: u32) -> bool {
        attempt >= self.max_retries
    }

    pub fn after_failure(&self, attempt: u32) -> RetryStep {
        if self.is_final(attempt) {
            RetryStep::GiveUp
        } else {
            RetryStep::Retry {
                next_attempt: attempt + 1,
                delay: self.delay_for_attempt(attempt),
            }
        }
    }

    /// Total attempts a cycle may make
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(500), Duration::from_millis(1500))
    }

    #[test]
    fn test_backoff_doubles_then_caps() {
        let policy = policy();
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(500));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(1500));
        assert_eq!(policy.delay_for_attempt(40), Duration::from_millis(1500));
    }

    #[test]
    fn test_schedule_ends_in_give_up() {
        let policy = policy();
        let mut attempt = 0;
        let mut delays = Vec::new();
        while let RetryStep::Retry { next_attempt, delay } = policy.after_failure(attempt) {
            delays.push(delay.as_millis());
            attempt = next_attempt;
        }
        assert_eq!(delays, vec![500, 1000, 1500]);
        assert_eq!(attempt, 3);
        assert_eq!(policy.max_attempts(), 4);
    }

    #[test]
    fn test_zero_retries_gives_up_immediately() {
        let policy = RetryPolicy::new(0, Duration::from_millis(10), Duration::from_millis(10));
        assert!(policy.is_final(0));
        assert_eq!(policy.after_failure(0), RetryStep::GiveUp);
    }
}

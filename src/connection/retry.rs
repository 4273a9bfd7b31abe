//! Exponential backoff policy for retryable driver failures.

use std::thread;
use std::time::Duration;

use rand::Rng;

/// Backoff schedule: `initial * multiplier^(attempt-1)`, capped at
/// `max_delay_ms`, with optional ±50% jitter applied when sleeping.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 100,
            max_delay_ms: 5000,
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    pub fn with_initial_delay_ms(mut self, delay: u64) -> Self {
        self.initial_delay_ms = delay;
        self
    }

    pub fn with_max_delay_ms(mut self, delay: u64) -> Self {
        self.max_delay_ms = delay;
        self
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    /// Nominal delay before the retry following failed attempt `attempt`
    /// (1-based), before jitter.
    pub fn delay_for_attempt(&self, attempt: u32) -> u64 {
        let exponent = attempt.saturating_sub(1).min(63);
        let nominal = self.initial_delay_ms as f64 * self.multiplier.powi(exponent as i32);
        (nominal as u64).min(self.max_delay_ms)
    }

    /// Block for the backoff delay, jittered to a uniform factor in
    /// [0.5, 1.5) so simultaneous clients do not retry in lockstep.
    pub fn sleep_before_retry(&self, attempt: u32) {
        let mut delay = self.delay_for_attempt(attempt);
        if self.jitter {
            let factor: f64 = rand::thread_rng().gen_range(0.5..1.5);
            delay = (delay as f64 * factor) as u64;
        }
        log::debug!("retry attempt {} backing off {}ms", attempt, delay);
        thread::sleep(Duration::from_millis(delay));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_doubles_then_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for_attempt(1), 100);
        assert_eq!(policy.delay_for_attempt(2), 200);
        assert_eq!(policy.delay_for_attempt(3), 400);
        assert_eq!(policy.delay_for_attempt(4), 800);
        assert_eq!(policy.delay_for_attempt(7), 5000);
        assert_eq!(policy.delay_for_attempt(20), 5000);
    }

    #[test]
    fn test_large_attempt_does_not_overflow() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for_attempt(u32::MAX), 5000);
    }

    #[test]
    fn test_builder_overrides() {
        let policy = RetryPolicy::new(5)
            .with_initial_delay_ms(10)
            .with_multiplier(3.0)
            .with_max_delay_ms(100);
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.delay_for_attempt(1), 10);
        assert_eq!(policy.delay_for_attempt(2), 30);
        assert_eq!(policy.delay_for_attempt(3), 90);
        assert_eq!(policy.delay_for_attempt(4), 100);
    }
}

//! Retry policy for timed-out requests
//!
//! The sync engine retries a request that timed out with the same cursor and
//! filter. The budget counts consecutive timeouts only; any other outcome
//! resets it.

use std::time::Duration;

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of retries after the initial attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound on any single delay
    pub max_delay: Duration,
    /// Multiplier for exponential backoff (2.0 doubles the delay each retry)
    pub backoff_multiplier: f64,
    /// Jitter factor (0.0 to 1.0) applied around the computed delay
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Constant delay between retries
    pub fn fixed_delay(max_retries: u32, delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay: delay,
            max_delay: delay,
            backoff_multiplier: 1.0,
            jitter_factor: 0.0,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Delay before retry number `attempt` (1-based; 0 means no delay)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let exponent = attempt.min(30) as i32 - 1;
        let base = self.initial_delay.as_millis() as f64 * self.backoff_multiplier.powi(exponent);
        let capped = base.min(self.max_delay.as_millis() as f64);

        // deterministic jitter so tests stay reproducible
        let jitter = if self.jitter_factor > 0.0 {
            let spread = capped * self.jitter_factor;
            let phase = (attempt as f64 * 0.618033988749895) % 1.0;
            spread * (phase - 0.5) * 2.0
        } else {
            0.0
        };

        Duration::from_millis((capped + jitter).max(0.0) as u64)
    }
}

/// Tracks consecutive retries of one request.
#[derive(Debug, Clone)]
pub struct RetryGuard {
    config: RetryConfig,
    attempt: u32,
}

impl RetryGuard {
    pub fn new(config: RetryConfig) -> Self {
        Self { config, attempt: 0 }
    }

    /// Record a failed attempt. Returns the delay before retrying, or `None`
    /// once the budget is spent.
    pub fn record_attempt(&mut self) -> Option<Duration> {
        self.attempt += 1;
        if self.attempt <= self.config.max_retries {
            Some(self.config.delay_for_attempt(self.attempt))
        } else {
            None
        }
    }

    /// Retries used so far
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn max_retries(&self) -> u32 {
        self.config.max_retries
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

//! Rate-limit retry policy and jittered backoff
//!
//! Delays follow "full jitter": a uniform draw in `[0, min(max, initial * 2^attempt))`.

use rand::Rng;
use std::time::Duration;

/// Default delay ceiling for the first retry
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(1000);

/// Default upper bound for any retry delay
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(45_000);

/// Exponential backoff bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    /// Ceiling of the delay before the first retry
    pub initial_delay: Duration,
    /// Ceiling of every delay
    pub max_delay: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial_delay: DEFAULT_INITIAL_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

impl Backoff {
    /// Create backoff bounds
    pub fn new(initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            initial_delay,
            max_delay,
        }
    }

    /// Un-jittered delay ceiling for a given attempt
    pub fn ceiling(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        let raw = self.initial_delay.saturating_mul(factor);
        std::cmp::min(raw, self.max_delay)
    }

    /// Jittered delay before retrying the send numbered `attempt` (0-based)
    pub fn delay(&self, attempt: u32) -> Duration {
        let unit: f64 = rand::thread_rng().gen();
        self.ceiling(attempt).mul_f64(unit)
    }
}

/// Compute the jittered delay before retrying a failed send
pub fn compute_delay(attempt: u32, backoff: &Backoff) -> Duration {
    backoff.delay(attempt)
}

/// When a rate-limited (429) response is retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Never retry; 429 surfaces as `TOO_MANY_REQUESTS`
    Disabled,
    /// Retry until the overall request timeout fires
    Unbounded(Backoff),
    /// Retry at most `max_retries` resends
    Bounded { max_retries: u32, backoff: Backoff },
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::Unbounded(Backoff::default())
    }
}

impl RetryPolicy {
    /// Bounded policy with explicit delays
    pub fn bounded(max_retries: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self::Bounded {
            max_retries,
            backoff: Backoff::new(initial_delay, max_delay),
        }
    }

    /// Check if retrying is enabled at all
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::Disabled)
    }

    /// Backoff to use once a send numbered `attempt` was rate limited,
    /// or `None` when no further resend is allowed
    pub fn backoff_for(&self, attempt: u32) -> Option<&Backoff> {
        match self {
            Self::Disabled => None,
            Self::Unbounded(backoff) => Some(backoff),
            Self::Bounded {
                max_retries,
                backoff,
            } => (attempt < *max_retries).then_some(backoff),
        }
    }

    /// Maximum number of resends, `None` when unbounded
    pub fn max_retries(&self) -> Option<u32> {
        match self {
            Self::Disabled => Some(0),
            Self::Unbounded(_) => None,
            Self::Bounded { max_retries, .. } => Some(*max_retries),
        }
    }
}

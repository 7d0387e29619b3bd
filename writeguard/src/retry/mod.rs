//! Retry policy with exponential backoff and optional jitter.
//!
//! The first attempt runs immediately. Retry `n` (1-based) waits
//! `retry_delay * 2^(n-1)` before running, optionally capped and jittered.

use crate::errors::OperationError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Environment variable overriding [`RetryPolicy::max_retries`].
pub const ENV_MAX_RETRIES: &str = "WRITEGUARD_MAX_RETRIES";
/// Environment variable overriding [`RetryPolicy::retry_delay_ms`].
pub const ENV_RETRY_DELAY_MS: &str = "WRITEGUARD_RETRY_DELAY_MS";

/// Jitter strategy to prevent thundering herd.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JitterStrategy {
    /// Exact exponential delays.
    #[default]
    None,
    /// Random from 0 to delay
    Full,
    /// Half fixed, half random
    Equal,
}

impl JitterStrategy {
    /// Applies jitter to a delay.
    #[must_use]
    pub fn apply(self, delay: Duration) -> Duration {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        match self {
            Self::None => delay,
            Self::Full => {
                if millis == 0 {
                    delay
                } else {
                    Duration::from_millis(rand::thread_rng().gen_range(0..=millis))
                }
            }
            Self::Equal => {
                let half = millis / 2;
                if half == 0 {
                    delay
                } else {
                    Duration::from_millis(half + rand::thread_rng().gen_range(0..=half))
                }
            }
        }
    }
}

/// Retry budget and backoff shape shared by every step of one save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt. Total attempts = `max_retries + 1`.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base delay before the first retry, in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Upper bound on any single delay, in milliseconds.
    #[serde(default)]
    pub max_delay_ms: Option<u64>,
    /// Jitter applied after capping.
    #[serde(default)]
    pub jitter: JitterStrategy,
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_retry_delay_ms() -> u64 {
    1000
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            max_delay_ms: None,
            jitter: JitterStrategy::None,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with the default budget (3 retries, 1s base delay).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A policy that never retries.
    #[must_use]
    pub fn no_retry() -> Self {
        Self::default().with_max_retries(0)
    }

    /// Parses a policy from JSON, filling omitted fields with defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Returns the default policy with environment overrides applied.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides from a key lookup (see [`ENV_MAX_RETRIES`] and
    /// [`ENV_RETRY_DELAY_MS`]). Unparseable values are ignored.
    #[must_use]
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_MAX_RETRIES) {
            match raw.trim().parse() {
                Ok(value) => self.max_retries = value,
                Err(_) => warn!(key = ENV_MAX_RETRIES, value = %raw, "Ignoring invalid override"),
            }
        }
        if let Some(raw) = lookup(ENV_RETRY_DELAY_MS) {
            match raw.trim().parse() {
                Ok(value) => self.retry_delay_ms = value,
                Err(_) => warn!(key = ENV_RETRY_DELAY_MS, value = %raw, "Ignoring invalid override"),
            }
        }
        self
    }

    /// Sets the retry budget.
    #[must_use]
    pub const fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Sets the base delay.
    #[must_use]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Caps every delay.
    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay_ms = Some(u64::try_from(delay.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Sets the jitter strategy.
    #[must_use]
    pub const fn with_jitter(mut self, jitter: JitterStrategy) -> Self {
        self.jitter = jitter;
        self
    }

    /// Base delay as a [`Duration`].
    #[must_use]
    pub const fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Total attempts allowed per operation.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before retry number `retry` (1-based).
    #[must_use]
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(63);
        let factor = 1u64.checked_shl(exponent).unwrap_or(u64::MAX);
        let mut millis = self.retry_delay_ms.saturating_mul(factor);
        if let Some(max) = self.max_delay_ms {
            millis = millis.min(max);
        }
        self.jitter.apply(Duration::from_millis(millis))
    }

    /// Decides what to do after `attempts_made` attempts, the last of which
    /// failed with `error`.
    #[must_use]
    pub fn decide(&self, attempts_made: u32, error: &OperationError) -> RetryDecision {
        if !error.is_retryable() {
            return RetryDecision::NotRetryable;
        }
        if attempts_made >= self.max_attempts() {
            return RetryDecision::GiveUp;
        }
        RetryDecision::Retry(self.backoff_delay(attempts_made))
    }
}

/// Outcome of a retry decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry(Duration),
    /// No more retries, give up.
    GiveUp,
    /// Don't retry, the error is not retryable.
    NotRetryable,
}

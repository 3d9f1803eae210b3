//! Retry and pacing policy for the fetcher

use crate::config::{DelayRange, FetcherConfig};
use std::time::Duration;

/// Flat retry policy applied to every logical fetch
///
/// Delays are constant between attempts, not exponential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Attempts per logical fetch, challenge pages included
    pub max_attempts: u32,

    /// Pause after a non-200 status or transport error
    pub retry_delay: Duration,

    /// Pause after a CAPTCHA or rate-limit page
    pub challenge_cooldown: Duration,

    /// Randomized pause before every attempt
    pub politeness: DelayRange,

    /// Upper bound on a single request
    pub request_timeout: Duration,
}

impl BackoffPolicy {
    pub fn from_config(config: &FetcherConfig) -> Self {
        Self {
            max_attempts: config.max_retries.max(1),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            challenge_cooldown: Duration::from_millis(config.challenge_cooldown_ms),
            politeness: config.politeness_delay,
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }

    /// A policy with every delay set to zero, for deterministic tests
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            retry_delay: Duration::ZERO,
            challenge_cooldown: Duration::ZERO,
            politeness: DelayRange::ZERO,
            request_timeout: Duration::from_secs(15),
        }
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from_config(&FetcherConfig::default())
    }
}

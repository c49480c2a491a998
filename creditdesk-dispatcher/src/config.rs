//! Poll configuration
//!
//! Bounds how long the poller waits for a remote run and how it reacts to
//! failed status queries.

use creditdesk_client::ConfigError;
use std::time::Duration;

/// How transport failures during status queries are handled
///
/// With `max_transport_retries = 0` the first failed status query fails the
/// job. Otherwise up to that many failures are tolerated, each followed by
/// an exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_transport_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Fail on the first transport error
    pub fn fail_fast() -> Self {
        Self {
            max_transport_retries: 0,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
        }
    }

    pub fn with_retries(mut self, max_transport_retries: u32) -> Self {
        self.max_transport_retries = max_transport_retries;
        self
    }

    /// Delay after the `retry`-th consecutive failure (1-based)
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fail_fast()
    }
}

/// Poll loop configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Status queries made before giving up; failed queries count too
    pub max_attempts: u32,

    /// Wait between two status queries while the run is in progress
    pub interval: Duration,

    pub retry: RetryPolicy,
}

impl PollConfig {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - POLL_MAX_ATTEMPTS (optional, default: 30)
    /// - POLL_INTERVAL_MS (optional, milliseconds, default: 1000)
    /// - POLL_TRANSPORT_RETRIES (optional, default: 0)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let max_attempts = parse_or(&lookup, "POLL_MAX_ATTEMPTS", defaults.max_attempts)?;
        let interval = parse_or(
            &lookup,
            "POLL_INTERVAL_MS",
            defaults.interval.as_millis() as u64,
        )
        .map(Duration::from_millis)?;
        let retries = parse_or(
            &lookup,
            "POLL_TRANSPORT_RETRIES",
            defaults.retry.max_transport_retries,
        )?;

        let config = Self::new(max_attempts, interval).with_retry(defaults.retry.with_retries(retries));
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                field: "POLL_MAX_ATTEMPTS",
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.retry.initial_backoff > self.retry.max_backoff {
            return Err(ConfigError::Invalid {
                field: "POLL_TRANSPORT_RETRIES",
                reason: "initial backoff exceeds maximum backoff".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::new(30, Duration::from_secs(1))
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    field: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(field).filter(|v| !v.trim().is_empty()) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            field,
            reason: format!("'{}' is not a valid number", raw),
        }),
        None => Ok(default),
    }
}

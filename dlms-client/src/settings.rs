//! Reader configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default reply wait time in milliseconds
pub const DEFAULT_WAIT_TIME_MS: u64 = 5000;
/// Default number of receive attempts per exchange
pub const DEFAULT_RETRY_COUNT: u32 = 3;
/// Default back-off before repeating a rejected exchange, in milliseconds
pub const DEFAULT_REJECTED_BACKOFF_MS: u64 = 1000;

/// Timing and retry behaviour of a [`DlmsReader`](crate::DlmsReader)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderSettings {
    /// How long each receive waits for the device, in milliseconds
    pub wait_time_ms: u64,
    /// Receive attempts per exchange before giving up
    pub retry_count: u32,
    /// How many times an exchange answered with "rejected" is repeated
    pub max_rejected_retries: u32,
    /// Pause before repeating a rejected exchange, in milliseconds
    pub rejected_backoff_ms: u64,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            wait_time_ms: DEFAULT_WAIT_TIME_MS,
            retry_count: DEFAULT_RETRY_COUNT,
            max_rejected_retries: 1,
            rejected_backoff_ms: DEFAULT_REJECTED_BACKOFF_MS,
        }
    }
}

impl ReaderSettings {
    /// Set the wait time; zero falls back to the default
    pub fn with_wait_time(mut self, wait_time: Duration) -> Self {
        self.wait_time_ms = match wait_time.as_millis() {
            0 => DEFAULT_WAIT_TIME_MS,
            ms => u64::try_from(ms).unwrap_or(u64::MAX),
        };
        self
    }

    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    pub fn with_max_rejected_retries(mut self, retries: u32) -> Self {
        self.max_rejected_retries = retries;
        self
    }

    pub fn with_rejected_backoff(mut self, backoff: Duration) -> Self {
        self.rejected_backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn wait_time(&self) -> Duration {
        match self.wait_time_ms {
            0 => Duration::from_millis(DEFAULT_WAIT_TIME_MS),
            ms => Duration::from_millis(ms),
        }
    }

    /// Receive attempts per exchange, never less than one
    pub fn attempts(&self) -> u32 {
        self.retry_count.max(1)
    }

    pub fn rejected_backoff(&self) -> Duration {
        Duration::from_millis(self.rejected_backoff_ms)
    }
}

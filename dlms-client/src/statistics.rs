//! Exchange statistics collection

/// Counters kept by a reader across its exchanges
///
/// Updated by the transaction engine; callers may read or clear them at any
/// time between operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExchangeStatistics {
    /// Frames handed to the media, resends included
    pub frames_sent: u64,
    /// Successful receive calls
    pub frames_received: u64,
    /// Receive calls that ran out of wait time
    pub timeouts: u64,
    /// Frames sent again after a timeout
    pub resends: u64,
    /// Exchanges repeated because the device rejected them
    pub rejected_retries: u64,
    /// Unsolicited notifications delivered to the handler
    pub notifications: u64,
}

impl ExchangeStatistics {
    /// Create new statistics with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all counters to zero
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Share of receive calls that timed out, as a percentage
    ///
    /// Returns 0.0 if nothing has been received or timed out yet.
    pub fn timeout_rate(&self) -> f64 {
        let total = self.frames_received + self.timeouts;
        if total == 0 {
            0.0
        } else {
            (self.timeouts as f64 / total as f64) * 100.0
        }
    }
}

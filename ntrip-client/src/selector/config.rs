//! Selector configuration.

use std::time::Duration;

/// Default jitter guard on reference-location updates, in degrees.
pub const DEFAULT_SIGNIFICANT_CHANGE_DEG: f64 = 0.01;

/// Configuration for mountpoint selection and the streaming session.
#[derive(Debug, Clone)]
pub struct SelectorConfig {
    /// Location updates moving less than this on both axes are ignored.
    pub significant_change_deg: f64,

    /// Depth of the output channel handed to the consumer.
    pub buffer_depth: usize,

    /// Wait before reopening a source that stopped on its own.
    pub reconnect_delay: Duration,

    /// Consecutive failures after which the session stops reconnecting
    /// and waits for the next swap. `None` retries forever.
    pub max_reconnect_attempts: Option<u32>,
}

impl SelectorConfig {
    /// Set the significant-change threshold.
    pub fn with_significant_change(mut self, degrees: f64) -> Self {
        self.significant_change_deg = degrees;
        self
    }

    /// Set the output channel depth.
    pub fn with_buffer_depth(mut self, depth: usize) -> Self {
        self.buffer_depth = depth;
        self
    }

    /// Set the reconnect delay.
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Limit consecutive reconnect attempts.
    pub fn with_max_reconnect_attempts(mut self, attempts: Option<u32>) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            significant_change_deg: DEFAULT_SIGNIFICANT_CHANGE_DEG,
            buffer_depth: 4,
            reconnect_delay: Duration::from_secs(1),
            max_reconnect_attempts: None,
        }
    }
}

//! Session timing and retry configuration.

use core::time::Duration;

use crate::{
    DEFAULT_INTER_CHAR_TIMEOUT_MS, DEFAULT_LISTEN_POLL_INTERVAL_MS, DEFAULT_MAX_RETRIES,
    DEFAULT_TIMEOUT_MS,
};

/// Timing and retry settings shared by master and slave sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// How long a master waits for a response to one transmission.
    pub timeout: Duration,
    /// Retransmissions after the first attempt.
    pub max_retries: u8,
    /// Longest silence allowed between two characters of one frame.
    pub inter_char_timeout: Duration,
    /// How often an idle slave wakes up to check for shutdown.
    pub listen_poll_interval: Duration,
}

impl SessionConfig {
    /// Settings with the crate defaults.
    pub const fn new() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            max_retries: DEFAULT_MAX_RETRIES,
            inter_char_timeout: Duration::from_millis(DEFAULT_INTER_CHAR_TIMEOUT_MS),
            listen_poll_interval: Duration::from_millis(DEFAULT_LISTEN_POLL_INTERVAL_MS),
        }
    }

    /// Sets the per-attempt response timeout.
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the number of retransmissions.
    pub const fn with_max_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries;
        self
    }

    /// Sets the inter-character timeout.
    pub const fn with_inter_char_timeout(mut self, gap: Duration) -> Self {
        self.inter_char_timeout = gap;
        self
    }

    /// Sets the slave listen poll interval.
    pub const fn with_listen_poll_interval(mut self, interval: Duration) -> Self {
        self.listen_poll_interval = interval;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

use orgpulse_core::push_frame::DEFAULT_MAX_FRAME_BYTES;
use std::time::Duration;

pub const REFRESH_DELAY_MS: u64 = 500;
pub const RECONNECT_DELAY_SECS: u64 = 5;
pub const POLL_INTERVAL_SECS: u64 = 30;
pub const TOAST_TTL_SECS: u64 = 5;

/// Timing knobs of the feed. The defaults are the production contract: 500 ms
/// between a push and the count refresh, a flat 5 s reconnect delay and a 30 s
/// background poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    pub refresh_delay: Duration,
    pub reconnect_delay: Duration,
    /// `None` disables the periodic poll; the initial load still happens.
    pub poll_interval: Option<Duration>,
    pub toast_ttl: Duration,
    pub max_frame_bytes: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            refresh_delay: Duration::from_millis(REFRESH_DELAY_MS),
            reconnect_delay: Duration::from_secs(RECONNECT_DELAY_SECS),
            poll_interval: Some(Duration::from_secs(POLL_INTERVAL_SECS)),
            toast_ttl: Duration::from_secs(TOAST_TTL_SECS),
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

impl FeedConfig {
    pub fn with_poll_secs(mut self, secs: u64) -> Self {
        self.poll_interval = if secs == 0 {
            None
        } else {
            Some(Duration::from_secs(secs))
        };
        self
    }

    pub fn with_reconnect_secs(mut self, secs: u64) -> Self {
        self.reconnect_delay = Duration::from_secs(secs);
        self
    }
}

//! Client configuration.
//!
//! [`Config`] carries the tunable timing and protocol-offset values. The
//! defaults come from [`protocol_constants`](crate::protocol_constants);
//! receiver identity (name, host, port) is owned by the embedding
//! application, not by this crate.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::protocol_constants::{
    DEFAULT_POLL_INTERVAL_SECS, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SETTLE_DELAY_MS,
    DEFAULT_STEREO_FIRST_ZONE, EVENT_CHANNEL_CAPACITY,
};

/// Configuration shared by every client and monitor.
///
/// All fields have sensible defaults.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Interval between background status polls (seconds).
    pub poll_interval_secs: u64,

    /// Wait after an accepted command before the reconciling poll (milliseconds).
    pub settle_delay_ms: u64,

    /// Timeout applied to every HTTP request (seconds).
    pub request_timeout_secs: u64,

    /// Zone number of the first character in the stereo `zones` flag string.
    pub stereo_first_zone: u32,

    /// Capacity of the broadcast channel for receiver events.
    pub event_channel_capacity: usize,
}

impl Config {
    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.poll_interval_secs == 0 {
            return Err("poll_interval_secs must be >= 1".to_string());
        }
        if self.request_timeout_secs == 0 {
            return Err("request_timeout_secs must be >= 1".to_string());
        }
        if self.stereo_first_zone < 2 {
            return Err("stereo_first_zone must be >= 2 (zone 1 is never a member)".to_string());
        }
        if self.event_channel_capacity == 0 {
            return Err(
                "event_channel_capacity must be >= 1 (broadcast::channel panics on 0)".to_string(),
            );
        }
        Ok(())
    }

    /// Poll interval as a [`Duration`].
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Settle delay as a [`Duration`].
    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// HTTP request timeout as a [`Duration`].
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            stereo_first_zone: DEFAULT_STEREO_FIRST_ZONE,
            event_channel_capacity: EVENT_CHANNEL_CAPACITY,
        }
    }
}

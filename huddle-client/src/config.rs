use huddle_core::utils::{DEFAULT_POLL_INTERVAL_MS, DEFAULT_RELAY_URL};
use huddle_core::{IceServerConfig, MediaConstraints, ParticipantId, RoomId, default_ice_servers};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bounded exponential backoff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let delay = self.base_delay_ms.saturating_mul(1u64 << exp);
        Duration::from_millis(delay.min(self.max_delay_ms))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 250,
            max_delay_ms: 4000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CallConfig {
    /// Base URL of the relay API, e.g. `http://host:5000/api/webrtc`.
    pub relay_url: String,
    pub room: RoomId,
    pub participant_id: ParticipantId,
    pub display_name: String,
    pub poll_interval_ms: u64,
    pub request_timeout_ms: u64,
    pub leave_timeout_ms: u64,
    pub send_retry: RetryPolicy,
    pub join_retry: RetryPolicy,
    pub ice_servers: Vec<IceServerConfig>,
    pub media: MediaConstraints,
    /// How many recent signal fingerprints the inbox remembers.
    pub dedup_window: usize,
    /// Reuse the camera track captured at start when screen sharing stops,
    /// instead of asking the media provider for a fresh capture.
    pub reuse_camera_on_stop: bool,
}

impl CallConfig {
    pub fn new(
        relay_url: impl Into<String>,
        room: impl Into<RoomId>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            relay_url: relay_url.into(),
            room: room.into(),
            display_name: display_name.into(),
            ..Self::default()
        }
    }

    pub fn with_participant_id(mut self, id: impl Into<ParticipantId>) -> Self {
        self.participant_id = id.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_ice_servers(mut self, ice_servers: Vec<IceServerConfig>) -> Self {
        self.ice_servers = ice_servers;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn leave_timeout(&self) -> Duration {
        Duration::from_millis(self.leave_timeout_ms)
    }
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            relay_url: DEFAULT_RELAY_URL.to_owned(),
            room: RoomId::from("lobby"),
            participant_id: ParticipantId::new(),
            display_name: "Guest".to_owned(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            request_timeout_ms: 5000,
            leave_timeout_ms: 2000,
            send_retry: RetryPolicy::default(),
            join_retry: RetryPolicy::default(),
            ice_servers: default_ice_servers(),
            media: MediaConstraints::default(),
            dedup_window: 512,
            reuse_camera_on_stop: true,
        }
    }
}

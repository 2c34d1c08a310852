use anyhow::{Result, bail};
use huddle_client::{CallConfig, CallNotification, RetryPolicy};
use huddle_core::{IceCandidate, ParticipantId, SessionDescription, Signal, SignalKind};
use serde_json::json;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Timeout for a full offer/answer round through the relay (ms).
pub const CONNECT_TIMEOUT_MS: u64 = 5000;

/// Timeout for a single expected notification (ms).
pub const NOTIFY_TIMEOUT_MS: u64 = 3000;

pub fn pid(id: &str) -> ParticipantId {
    ParticipantId::from(id)
}

pub fn offer_from(from: &str, to: &str, sdp: &str) -> Signal {
    Signal::new(
        pid(from),
        Some(pid(to)),
        SignalKind::Offer,
        json!({ "type": "offer", "sdp": sdp }),
    )
}

pub fn answer_from(from: &str, to: &str, sdp: &str) -> Signal {
    Signal::new(
        pid(from),
        Some(pid(to)),
        SignalKind::Answer,
        json!({ "type": "answer", "sdp": sdp }),
    )
}

pub fn candidate_from(from: &str, to: &str, candidate: &str) -> Signal {
    let payload = IceCandidate::new(candidate);
    Signal::directed(pid(from), pid(to), SignalKind::Candidate, &payload)
        .expect("candidate serializes")
}

pub fn description(signal: &Signal) -> SessionDescription {
    signal.payload_as().expect("signal carries a description")
}

/// Call config tuned for fast tests.
pub fn test_call_config(room: &str, id: &str, name: &str) -> CallConfig {
    let mut config = CallConfig::new("http://unused.invalid/api/webrtc", room, name)
        .with_participant_id(id)
        .with_poll_interval(Duration::from_millis(50));
    config.send_retry = RetryPolicy {
        max_attempts: 2,
        base_delay_ms: 10,
        max_delay_ms: 20,
    };
    config.leave_timeout_ms = 500;
    config
}

/// Wait for a notification matching `pred`, skipping others.
pub async fn wait_for_notification<F>(
    rx: &mut mpsc::UnboundedReceiver<CallNotification>,
    timeout_ms: u64,
    mut pred: F,
) -> Result<CallNotification>
where
    F: FnMut(&CallNotification) -> bool,
{
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            bail!("Timed out waiting for notification");
        }
        match tokio::time::timeout(remaining, rx.recv()).await {
            Ok(Some(notification)) if pred(&notification) => return Ok(notification),
            Ok(Some(_)) => continue,
            Ok(None) => bail!("Notification channel closed"),
            Err(_) => bail!("Timed out waiting for notification"),
        }
    }
}

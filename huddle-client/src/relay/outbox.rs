use crate::config::RetryPolicy;
use crate::error::CallError;
use crate::relay::{RelayChannel, SignalOutput};
use async_trait::async_trait;
use huddle_core::{IceCandidate, ParticipantId, RoomId, SessionDescription, Signal, SignalKind};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

/// A signal the relay never accepted within the retry budget.
#[derive(Debug, Clone)]
pub struct SendFailure {
    pub signal: Signal,
    pub error: CallError,
}

/// Fire-and-forget sender. Each signal is delivered from its own task with
/// bounded exponential backoff; exhausted retries are reported on
/// `failure_tx` instead of being returned to the caller.
pub struct RelayOutbox {
    relay: Arc<dyn RelayChannel>,
    room: RoomId,
    local_id: ParticipantId,
    policy: RetryPolicy,
    failure_tx: mpsc::Sender<SendFailure>,
}

impl RelayOutbox {
    pub fn new(
        relay: Arc<dyn RelayChannel>,
        room: RoomId,
        local_id: ParticipantId,
        policy: RetryPolicy,
        failure_tx: mpsc::Sender<SendFailure>,
    ) -> Self {
        Self {
            relay,
            room,
            local_id,
            policy,
            failure_tx,
        }
    }

    pub fn dispatch(&self, signal: Signal) {
        let relay = Arc::clone(&self.relay);
        let room = self.room.clone();
        let policy = self.policy.clone();
        let failure_tx = self.failure_tx.clone();

        tokio::spawn(async move {
            if let Err(error) = send_with_retry(relay.as_ref(), &room, &signal, &policy).await {
                error!(
                    "Giving up on {:?} to {:?}: {}",
                    signal.kind, signal.to, error
                );
                let _ = failure_tx.send(SendFailure { signal, error }).await;
            }
        });
    }

    fn directed<T: serde::Serialize>(&self, to: ParticipantId, kind: SignalKind, payload: &T) {
        match Signal::directed(self.local_id.clone(), to, kind, payload) {
            Ok(signal) => self.dispatch(signal),
            Err(e) => error!("Failed to serialize {:?} payload: {}", kind, e),
        }
    }
}

pub async fn send_with_retry(
    relay: &dyn RelayChannel,
    room: &RoomId,
    signal: &Signal,
    policy: &RetryPolicy,
) -> Result<(), CallError> {
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match relay.send(room, signal).await {
            Ok(()) => {
                debug!("Signal sent: {:?} to {:?}", signal.kind, signal.to);
                return Ok(());
            }
            Err(e) if e.is_transient() && attempt < attempts => {
                let delay = policy.delay_after(attempt);
                warn!(
                    "Send attempt {}/{} for {:?} failed: {}. Retrying in {:?}",
                    attempt, attempts, signal.kind, e, delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[async_trait]
impl SignalOutput for RelayOutbox {
    async fn send_offer(&self, to: ParticipantId, offer: SessionDescription) {
        self.directed(to, SignalKind::Offer, &offer);
    }

    async fn send_answer(&self, to: ParticipantId, answer: SessionDescription) {
        self.directed(to, SignalKind::Answer, &answer);
    }

    async fn send_candidate(&self, to: ParticipantId, candidate: IceCandidate) {
        self.directed(to, SignalKind::Candidate, &candidate);
    }

    async fn broadcast(&self, kind: SignalKind, payload: serde_json::Value) {
        self.dispatch(Signal::new(self.local_id.clone(), None, kind, payload));
    }
}

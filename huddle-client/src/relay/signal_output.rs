use async_trait::async_trait;
use huddle_core::{IceCandidate, ParticipantId, SessionDescription, SignalKind};

/// Outgoing side of signaling as seen by the peer orchestrator.
#[async_trait]
pub trait SignalOutput: Send + Sync {
    async fn send_offer(&self, to: ParticipantId, offer: SessionDescription);

    async fn send_answer(&self, to: ParticipantId, answer: SessionDescription);

    async fn send_candidate(&self, to: ParticipantId, candidate: IceCandidate);

    /// Room-wide notice, e.g. screen-share or track toggles.
    async fn broadcast(&self, kind: SignalKind, payload: serde_json::Value);
}

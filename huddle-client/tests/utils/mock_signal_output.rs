use async_trait::async_trait;
use huddle_client::SignalOutput;
use huddle_core::{IceCandidate, ParticipantId, SessionDescription, SignalKind};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

#[derive(Debug, Clone, PartialEq)]
pub enum SentSignal {
    Offer {
        to: ParticipantId,
        offer: SessionDescription,
    },
    Answer {
        to: ParticipantId,
        answer: SessionDescription,
    },
    Candidate {
        to: ParticipantId,
        candidate: IceCandidate,
    },
    Broadcast {
        kind: SignalKind,
        payload: serde_json::Value,
    },
}

/// Mock SignalOutput that captures all outgoing signals.
#[derive(Clone)]
pub struct MockSignalOutput {
    /// Channel to send captured signals.
    tx: mpsc::UnboundedSender<SentSignal>,
    /// All captured signals (for verification).
    signals: Arc<Mutex<Vec<SentSignal>>>,
}

impl MockSignalOutput {
    /// Create a new MockSignalOutput and its receiver channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SentSignal>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let output = Self {
            tx,
            signals: Arc::new(Mutex::new(Vec::new())),
        };
        (output, rx)
    }

    pub async fn all(&self) -> Vec<SentSignal> {
        self.signals.lock().await.clone()
    }

    pub async fn offers_to(&self, peer: &ParticipantId) -> Vec<SessionDescription> {
        self.signals
            .lock()
            .await
            .iter()
            .filter_map(|s| match s {
                SentSignal::Offer { to, offer } if to == peer => Some(offer.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn answers_to(&self, peer: &ParticipantId) -> Vec<SessionDescription> {
        self.signals
            .lock()
            .await
            .iter()
            .filter_map(|s| match s {
                SentSignal::Answer { to, answer } if to == peer => Some(answer.clone()),
                _ => None,
            })
            .collect()
    }

    async fn record(&self, signal: SentSignal) {
        self.signals.lock().await.push(signal.clone());
        let _ = self.tx.send(signal);
    }
}

#[async_trait]
impl SignalOutput for MockSignalOutput {
    async fn send_offer(&self, to: ParticipantId, offer: SessionDescription) {
        tracing::debug!("[MockSignalOutput] send_offer to {}", to);
        self.record(SentSignal::Offer { to, offer }).await;
    }

    async fn send_answer(&self, to: ParticipantId, answer: SessionDescription) {
        tracing::debug!("[MockSignalOutput] send_answer to {}", to);
        self.record(SentSignal::Answer { to, answer }).await;
    }

    async fn send_candidate(&self, to: ParticipantId, candidate: IceCandidate) {
        tracing::debug!("[MockSignalOutput] send_candidate to {}", to);
        self.record(SentSignal::Candidate { to, candidate }).await;
    }

    async fn broadcast(&self, kind: SignalKind, payload: serde_json::Value) {
        self.record(SentSignal::Broadcast { kind, payload }).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_output_captures_offer() {
        let (output, mut rx) = MockSignalOutput::new();
        let peer = ParticipantId::from("bob");

        output
            .send_offer(peer.clone(), SessionDescription::offer("v=0"))
            .await;

        let msg = rx.recv().await.unwrap();
        assert!(matches!(msg, SentSignal::Offer { .. }));
        assert_eq!(output.offers_to(&peer).await.len(), 1);
        assert!(output.answers_to(&peer).await.is_empty());
    }
}

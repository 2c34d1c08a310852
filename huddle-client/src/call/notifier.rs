use crate::call::CallState;
use crate::orchestrator::LinkState;
use crate::transport::RemoteTrack;
use huddle_core::{Participant, ParticipantId};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Lifecycle events for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum CallNotification {
    StateChanged(CallState),
    ParticipantJoined(Participant),
    ParticipantLeft(ParticipantId),
    ParticipantMediaChanged(Participant),
    LinkStateChanged {
        peer: ParticipantId,
        state: LinkState,
    },
    RemoteStreamReady {
        peer: ParticipantId,
        track: RemoteTrack,
    },
    /// A single link failed; only that participant's tile is affected.
    LinkFailed {
        peer: ParticipantId,
        reason: String,
    },
    /// Human-readable message for a call-level failure.
    Error(String),
}

/// Fire-and-forget sink for [`CallNotification`]s.
pub trait CallNotifier: Send + Sync {
    fn notify(&self, notification: CallNotification);
}

/// Logs every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl CallNotifier for TracingNotifier {
    fn notify(&self, notification: CallNotification) {
        match notification {
            CallNotification::Error(message) => error!("Call error: {}", message),
            CallNotification::LinkFailed { peer, reason } => {
                warn!("Link to {} failed: {}", peer, reason)
            }
            other => info!("{:?}", other),
        }
    }
}

/// Forwards notifications into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<CallNotification>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<CallNotification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl CallNotifier for ChannelNotifier {
    fn notify(&self, notification: CallNotification) {
        let _ = self.tx.send(notification);
    }
}

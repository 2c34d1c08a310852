use huddle_core::ParticipantId;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum CallError {
    #[error("relay unreachable: {0}")]
    RelayUnreachable(String),

    #[error("room is full")]
    RoomFull,

    #[error("room is closed")]
    RoomClosed,

    #[error("relay rejected the request: {0}")]
    RelayRejected(String),

    #[error("media unavailable: {0}")]
    MediaUnavailable(String),

    #[error("negotiation with {peer} failed: {reason}")]
    NegotiationFailed { peer: ParticipantId, reason: String },

    #[error("transport for {peer} failed: {reason}")]
    Transport { peer: ParticipantId, reason: String },

    #[error("operation not allowed: {0}")]
    InvalidState(String),

    #[error("call session is no longer running")]
    SessionClosed,
}

impl CallError {
    /// Only relay reachability problems are worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, CallError::RelayUnreachable(_))
    }

    /// Per-link failures never end the call.
    pub fn is_link_scoped(&self) -> bool {
        matches!(
            self,
            CallError::NegotiationFailed { .. } | CallError::Transport { .. }
        )
    }

    /// Single sentence suitable for a toast.
    pub fn user_message(&self) -> String {
        match self {
            CallError::RelayUnreachable(_) => {
                "Could not reach the call server. Please check your connection.".to_owned()
            }
            CallError::RoomFull => "This call is full.".to_owned(),
            CallError::RoomClosed => "This call has already ended.".to_owned(),
            CallError::RelayRejected(msg) => format!("The call server refused the request: {msg}"),
            CallError::MediaUnavailable(_) => {
                "Camera/microphone access denied. Please allow permissions and try again."
                    .to_owned()
            }
            CallError::NegotiationFailed { peer, .. } | CallError::Transport { peer, .. } => {
                format!("Lost connection to {peer}.")
            }
            CallError::InvalidState(msg) => msg.clone(),
            CallError::SessionClosed => "The call is no longer active.".to_owned(),
        }
    }
}

pub type CallResult<T> = Result<T, CallError>;

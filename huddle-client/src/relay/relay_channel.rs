use crate::error::CallError;
use async_trait::async_trait;
use huddle_core::utils::{CODE_ROOM_CLOSED, CODE_ROOM_FULL};
use huddle_core::{
    JoinResponse, Participant, ParticipantId, RelayStatus, RoomId, Signal, SignalsResponse,
};

#[derive(Debug, Clone)]
pub struct JoinOutcome {
    /// Id the relay registered us under.
    pub local_id: ParticipantId,
    /// Everyone in the room at join time, excluding ourselves.
    pub participants: Vec<Participant>,
}

impl JoinOutcome {
    pub fn from_response(response: JoinResponse, requested: &ParticipantId) -> Result<Self, CallError> {
        if response.status == RelayStatus::Error {
            return Err(rejection(response.code.as_deref(), response.message));
        }

        let local_id = response
            .user_id
            .map(ParticipantId::from)
            .unwrap_or_else(|| requested.clone());

        let participants = response
            .users
            .into_iter()
            .map(Participant::from)
            .filter(|p| p.id != local_id)
            .collect();

        Ok(Self {
            local_id,
            participants,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct PollBatch {
    pub signals: Vec<Signal>,
    /// Room membership as the relay sees it, when the relay reports it.
    pub participants: Option<Vec<Participant>>,
}

impl PollBatch {
    pub fn from_response(response: SignalsResponse) -> Result<Self, CallError> {
        if response.status == RelayStatus::Error {
            return Err(rejection(response.code.as_deref(), response.message));
        }

        Ok(Self {
            signals: response.signals,
            participants: response
                .users
                .map(|users| users.into_iter().map(Participant::from).collect()),
        })
    }
}

pub(crate) fn rejection(code: Option<&str>, message: Option<String>) -> CallError {
    match code {
        Some(CODE_ROOM_FULL) => CallError::RoomFull,
        Some(CODE_ROOM_CLOSED) => CallError::RoomClosed,
        _ => CallError::RelayRejected(message.unwrap_or_else(|| "unspecified error".to_owned())),
    }
}

/// Store-and-poll signaling relay.
#[async_trait]
pub trait RelayChannel: Send + Sync {
    async fn join(&self, room: &RoomId, participant: &Participant) -> Result<JoinOutcome, CallError>;

    /// Fetch signals not yet returned to this participant. `since` is the
    /// highest relay sequence number already seen, if any.
    async fn poll(
        &self,
        room: &RoomId,
        participant_id: &ParticipantId,
        since: Option<u64>,
    ) -> Result<PollBatch, CallError>;

    async fn send(&self, room: &RoomId, signal: &Signal) -> Result<(), CallError>;

    async fn leave(&self, room: &RoomId, participant_id: &ParticipantId) -> Result<(), CallError>;
}

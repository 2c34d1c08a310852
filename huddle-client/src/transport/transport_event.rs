use huddle_core::{IceCandidate, ParticipantId, TrackKind};

/// Identifies one transport instance for a remote participant. The
/// generation changes whenever the link is rebuilt, so events from a
/// replaced transport can be told apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LinkKey {
    pub peer: ParticipantId,
    pub generation: u64,
}

impl LinkKey {
    pub fn new(peer: ParticipantId, generation: u64) -> Self {
        Self { peer, generation }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTrack {
    pub id: String,
    pub stream_id: String,
    pub kind: TrackKind,
}

#[derive(Debug, Clone)]
pub enum TransportEvent {
    CandidateGenerated(LinkKey, IceCandidate),
    StateChanged(LinkKey, TransportState),
    TrackReceived(LinkKey, RemoteTrack),
}

impl TransportEvent {
    pub fn key(&self) -> &LinkKey {
        match self {
            TransportEvent::CandidateGenerated(key, _)
            | TransportEvent::StateChanged(key, _)
            | TransportEvent::TrackReceived(key, _) => key,
        }
    }
}

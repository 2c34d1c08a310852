mod ice;
mod media;
mod participant;
mod room;
mod session;
mod signal;
mod wire;

pub use ice::{IceServerConfig, default_ice_servers};
pub use media::{
    AudioConstraints, FacingMode, LocalMediaState, MediaConstraints, RemoteMediaState, TrackKind,
    VideoConstraints, VideoSource,
};
pub use participant::{Participant, ParticipantId};
pub use room::RoomId;
pub use session::{IceCandidate, SdpType, SessionDescription};
pub use signal::{
    JoinedPayload, LeftPayload, ScreenSharePayload, Signal, SignalKind, TrackTogglePayload,
};
pub use wire::{
    JoinRequest, JoinResponse, LeaveRequest, PollQuery, RelayStatus, RoomUser, SignalsResponse,
    StatusResponse,
};

use crate::model::media::RemoteMediaState;
use crate::model::wire::RoomUser;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Relay-assigned participant identifier.
///
/// Ordering is plain lexicographic string ordering; the mesh initiator
/// tie-break relies on it.
#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[serde(transparent)]
pub struct ParticipantId(pub String);

impl ParticipantId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ParticipantId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for ParticipantId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for ParticipantId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: ParticipantId,
    pub display_name: String,
    pub media: RemoteMediaState,
}

impl Participant {
    pub fn new(id: ParticipantId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            media: RemoteMediaState::default(),
        }
    }
}

impl From<RoomUser> for Participant {
    fn from(user: RoomUser) -> Self {
        Self::new(ParticipantId(user.id), user.username)
    }
}

impl From<&Participant> for RoomUser {
    fn from(p: &Participant) -> Self {
        RoomUser {
            id: p.id.0.clone(),
            username: p.display_name.clone(),
        }
    }
}

use crate::model::media::TrackKind;
use crate::model::participant::ParticipantId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignalKind {
    #[serde(alias = "user-joined")]
    Joined,
    #[serde(alias = "user-left")]
    Left,
    Offer,
    Answer,
    #[serde(alias = "ice-candidate")]
    Candidate,
    TrackToggle,
    ScreenShareStart,
    ScreenShareStop,
    #[serde(other)]
    Unknown,
}

impl SignalKind {
    /// Kinds that drive a peer link's negotiation.
    pub fn is_negotiation(self) -> bool {
        matches!(
            self,
            SignalKind::Offer | SignalKind::Answer | SignalKind::Candidate
        )
    }
}

/// A relayed message. `to == None` means broadcast to the whole room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub from: ParticipantId,
    #[serde(default)]
    pub to: Option<ParticipantId>,
    #[serde(rename = "type")]
    pub kind: SignalKind,
    #[serde(rename = "data", default)]
    pub payload: serde_json::Value,
    #[serde(rename = "seq", default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u64>,
}

impl Signal {
    pub fn new(
        from: ParticipantId,
        to: Option<ParticipantId>,
        kind: SignalKind,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            from,
            to,
            kind,
            payload,
            sequence: None,
        }
    }

    pub fn directed<T: Serialize>(
        from: ParticipantId,
        to: ParticipantId,
        kind: SignalKind,
        payload: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::new(from, Some(to), kind, serde_json::to_value(payload)?))
    }

    pub fn broadcast<T: Serialize>(
        from: ParticipantId,
        kind: SignalKind,
        payload: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::new(from, None, kind, serde_json::to_value(payload)?))
    }

    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.payload)
    }

    /// True if the signal is a broadcast or addressed to `id`.
    pub fn is_for(&self, id: &ParticipantId) -> bool {
        self.to.as_ref().is_none_or(|to| to == id)
    }

    /// Content hash over sender, addressee, kind and payload. The relay
    /// sequence number is deliberately left out so a redelivered copy hashes
    /// the same as the original.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.from.hash(&mut hasher);
        self.to.hash(&mut hasher);
        self.kind.hash(&mut hasher);
        self.payload.to_string().hash(&mut hasher);
        hasher.finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JoinedPayload {
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LeftPayload {
    #[serde(default)]
    pub user_id: Option<ParticipantId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackTogglePayload {
    pub track: TrackKind,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScreenSharePayload {
    #[serde(rename = "userId", default)]
    pub user_id: Option<ParticipantId>,
}

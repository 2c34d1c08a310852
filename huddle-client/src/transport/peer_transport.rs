use crate::media::LocalTrack;
use crate::transport::{LinkKey, TransportConfig, TransportEvent};
use anyhow::Result;
use async_trait::async_trait;
use huddle_core::{IceCandidate, SessionDescription};
use tokio::sync::mpsc;

/// Factory for per-participant transports.
///
/// Implementations report connectivity changes, locally gathered candidates
/// and inbound tracks through `event_tx`, tagged with the given key.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    async fn create(
        &self,
        key: LinkKey,
        config: TransportConfig,
        event_tx: mpsc::Sender<TransportEvent>,
    ) -> Result<Box<dyn PeerHandle>>;
}

/// One live transport to a remote participant.
#[async_trait]
pub trait PeerHandle: Send + Sync {
    async fn create_offer(&self) -> Result<SessionDescription>;

    async fn create_answer(&self) -> Result<SessionDescription>;

    async fn set_local_description(&self, desc: SessionDescription) -> Result<()>;

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()>;

    /// Attach an outgoing track before negotiation.
    async fn add_track(&self, track: &LocalTrack) -> Result<()>;

    /// Swap the outgoing track of the same kind without renegotiating.
    /// Fails when no track of that kind was attached before negotiation.
    async fn replace_outgoing_track(&self, track: &LocalTrack) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

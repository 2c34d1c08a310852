use crate::transport::{LinkKey, PeerHandle};
use huddle_core::{IceCandidate, ParticipantId};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, warn};

/// Negotiation state of one peer link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    New,
    HaveLocalOffer,
    HaveRemoteOffer,
    Connecting,
    Connected,
    Closed,
    Error,
}

impl LinkState {
    pub fn is_terminal(self) -> bool {
        matches!(self, LinkState::Closed | LinkState::Error)
    }

    pub fn can_transition_to(self, next: LinkState) -> bool {
        use LinkState::*;
        match (self, next) {
            (Closed | Error, _) => false,
            (_, Closed | Error) => true,
            (New, HaveLocalOffer | HaveRemoteOffer) => true,
            (HaveLocalOffer | HaveRemoteOffer, Connecting) => true,
            (Connecting, Connected) => true,
            _ => false,
        }
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LinkState::New => "new",
            LinkState::HaveLocalOffer => "have-local-offer",
            LinkState::HaveRemoteOffer => "have-remote-offer",
            LinkState::Connecting => "connecting",
            LinkState::Connected => "connected",
            LinkState::Closed => "closed",
            LinkState::Error => "error",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSnapshot {
    pub peer: ParticipantId,
    pub generation: u64,
    pub state: LinkState,
    pub initiator: bool,
    pub pending_candidates: usize,
    pub applied_candidates: usize,
}

pub struct PeerLink {
    pub(crate) key: LinkKey,
    pub(crate) state: LinkState,
    pub(crate) initiator: bool,
    pub(crate) handle: Box<dyn PeerHandle>,
    /// Candidates held back until a remote description is applied.
    pub(crate) pending_candidates: Vec<IceCandidate>,
    pub(crate) applied_candidates: HashSet<String>,
    pub(crate) remote_description_set: bool,
    pub(crate) last_remote_offer: Option<String>,
}

impl PeerLink {
    pub(crate) fn new(key: LinkKey, handle: Box<dyn PeerHandle>, initiator: bool) -> Self {
        Self {
            key,
            state: LinkState::New,
            initiator,
            handle,
            pending_candidates: Vec::new(),
            applied_candidates: HashSet::new(),
            remote_description_set: false,
            last_remote_offer: None,
        }
    }

    pub fn peer(&self) -> &ParticipantId {
        &self.key.peer
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Returns false and leaves the state alone if the move is not allowed.
    pub(crate) fn transition(&mut self, next: LinkState) -> bool {
        if !self.state.can_transition_to(next) {
            warn!(
                "Rejected link transition for {}: {} -> {}",
                self.key.peer, self.state, next
            );
            return false;
        }
        debug!("Link {}: {} -> {}", self.key.peer, self.state, next);
        self.state = next;
        true
    }

    /// Queue a candidate unless it is a duplicate.
    pub(crate) fn buffer_candidate(&mut self, candidate: IceCandidate) {
        if self.applied_candidates.contains(&candidate.candidate)
            || self.pending_candidates.contains(&candidate)
        {
            return;
        }
        self.pending_candidates.push(candidate);
    }

    /// Hand a candidate to the transport now. Duplicates are skipped and
    /// failures are logged; a bad candidate never fails the link.
    pub(crate) async fn apply_candidate(&mut self, candidate: IceCandidate) {
        if !self.applied_candidates.insert(candidate.candidate.clone()) {
            return;
        }
        if let Err(e) = self.handle.add_ice_candidate(candidate).await {
            warn!("Failed to add ICE candidate for {}: {:?}", self.key.peer, e);
        }
    }

    /// Apply buffered candidates in arrival order.
    pub(crate) async fn flush_candidates(&mut self) -> usize {
        let pending = std::mem::take(&mut self.pending_candidates);
        let count = pending.len();
        for candidate in pending {
            self.apply_candidate(candidate).await;
        }
        if count > 0 {
            debug!("Flushed {} buffered candidates for {}", count, self.key.peer);
        }
        count
    }

    pub fn snapshot(&self) -> LinkSnapshot {
        LinkSnapshot {
            peer: self.key.peer.clone(),
            generation: self.key.generation,
            state: self.state,
            initiator: self.initiator,
            pending_candidates: self.pending_candidates.len(),
            applied_candidates: self.applied_candidates.len(),
        }
    }
}

use crate::call::{CallNotification, CallNotifier};
use crate::error::CallError;
use crate::media::LocalTrack;
use crate::orchestrator::{LinkSnapshot, LinkState, PeerLink};
use crate::relay::SignalOutput;
use crate::transport::{LinkKey, PeerTransport, TransportConfig, TransportEvent, TransportState};
use anyhow::{Context, Result};
use futures::future::join_all;
use huddle_core::{IceCandidate, ParticipantId, SessionDescription, Signal, SignalKind};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Candidates kept per unknown sender before any link exists.
const MAX_EARLY_CANDIDATES: usize = 64;

/// Outcome of swapping an outgoing track across every link.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackReplaceReport {
    pub replaced: Vec<ParticipantId>,
    pub failed: Vec<(ParticipantId, String)>,
}

impl TrackReplaceReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Owns one [`PeerLink`] per remote participant and drives the
/// offer/answer/candidate exchange for each of them.
///
/// In a full mesh exactly one side of every pair sends the offer: the
/// participant whose id sorts first.
pub struct PeerOrchestrator {
    local_id: ParticipantId,
    transport: Arc<dyn PeerTransport>,
    transport_config: TransportConfig,
    transport_tx: mpsc::Sender<TransportEvent>,
    signals: Arc<dyn SignalOutput>,
    notifier: Arc<dyn CallNotifier>,
    links: HashMap<ParticipantId, PeerLink>,
    early_candidates: HashMap<ParticipantId, Vec<IceCandidate>>,
    /// Peers that left; late trickle candidates from them are dropped.
    departed: HashSet<ParticipantId>,
    outgoing: Vec<LocalTrack>,
    next_generation: u64,
}

impl PeerOrchestrator {
    pub fn new(
        local_id: ParticipantId,
        transport: Arc<dyn PeerTransport>,
        transport_config: TransportConfig,
        transport_tx: mpsc::Sender<TransportEvent>,
        signals: Arc<dyn SignalOutput>,
        notifier: Arc<dyn CallNotifier>,
    ) -> Self {
        Self {
            local_id,
            transport,
            transport_config,
            transport_tx,
            signals,
            notifier,
            links: HashMap::new(),
            early_candidates: HashMap::new(),
            departed: HashSet::new(),
            outgoing: Vec::new(),
            next_generation: 0,
        }
    }

    pub fn local_id(&self) -> &ParticipantId {
        &self.local_id
    }

    pub fn is_initiator_for(&self, peer: &ParticipantId) -> bool {
        self.local_id < *peer
    }

    /// Tracks attached to every link created from now on.
    pub fn set_local_tracks(&mut self, tracks: Vec<LocalTrack>) {
        self.outgoing = tracks;
    }

    pub fn link_state(&self, peer: &ParticipantId) -> Option<LinkState> {
        self.links.get(peer).map(|l| l.state)
    }

    pub fn links(&self) -> Vec<LinkSnapshot> {
        let mut links: Vec<LinkSnapshot> = self.links.values().map(PeerLink::snapshot).collect();
        links.sort_by(|a, b| a.peer.cmp(&b.peer));
        links
    }

    pub fn active_link_count(&self) -> usize {
        self.links
            .values()
            .filter(|l| !l.state.is_terminal())
            .count()
    }

    pub fn early_candidate_count(&self, peer: &ParticipantId) -> usize {
        self.early_candidates.get(peer).map_or(0, Vec::len)
    }

    pub async fn on_participant_joined(&mut self, peer: &ParticipantId) {
        if *peer == self.local_id {
            return;
        }
        if self
            .links
            .get(peer)
            .is_some_and(|l| !l.state.is_terminal())
        {
            debug!("Link to {} already exists", peer);
            return;
        }
        self.links.remove(peer);

        let initiator = self.is_initiator_for(peer);
        if let Err(e) = self.create_link(peer, initiator).await {
            self.fail_link(
                peer,
                CallError::Transport {
                    peer: peer.clone(),
                    reason: format!("{e:#}"),
                },
            )
            .await;
            return;
        }

        if initiator {
            if let Err(e) = self.initiate_offer(peer).await {
                self.fail_link(
                    peer,
                    CallError::NegotiationFailed {
                        peer: peer.clone(),
                        reason: format!("{e:#}"),
                    },
                )
                .await;
            }
        }
    }

    pub async fn on_participant_left(&mut self, peer: &ParticipantId) -> Option<LinkState> {
        self.early_candidates.remove(peer);
        if *peer != self.local_id {
            self.departed.insert(peer.clone());
        }
        self.close_link(peer).await
    }

    /// Apply a negotiation signal. Other kinds are ignored here.
    pub async fn handle_signal(&mut self, signal: &Signal) {
        let peer = &signal.from;

        let result = match signal.kind {
            SignalKind::Offer => match signal.payload_as::<SessionDescription>() {
                Ok(offer) => self.handle_offer(peer, offer).await,
                Err(e) => {
                    warn!("Malformed offer from {}: {}", peer, e);
                    return;
                }
            },
            SignalKind::Answer => match signal.payload_as::<SessionDescription>() {
                Ok(answer) => self.handle_answer(peer, answer).await,
                Err(e) => {
                    warn!("Malformed answer from {}: {}", peer, e);
                    return;
                }
            },
            SignalKind::Candidate => match signal.payload_as::<IceCandidate>() {
                Ok(candidate) => {
                    self.handle_candidate(peer, candidate).await;
                    Ok(())
                }
                Err(e) => {
                    warn!("Malformed candidate from {}: {}", peer, e);
                    return;
                }
            },
            _ => return,
        };

        if let Err(e) = result {
            self.fail_link(
                peer,
                CallError::NegotiationFailed {
                    peer: peer.clone(),
                    reason: format!("{e:#}"),
                },
            )
            .await;
        }
    }

    pub async fn handle_transport_event(&mut self, event: TransportEvent) {
        let key = event.key().clone();
        let current = self
            .links
            .get(&key.peer)
            .is_some_and(|l| l.key.generation == key.generation);
        if !current {
            debug!("Dropping event from stale transport {:?}", key);
            return;
        }

        match event {
            TransportEvent::CandidateGenerated(_, candidate) => {
                self.signals.send_candidate(key.peer, candidate).await;
            }
            TransportEvent::StateChanged(_, state) => {
                self.on_transport_state(&key.peer, state).await;
            }
            TransportEvent::TrackReceived(_, track) => {
                info!("Remote {:?} track ready from {}", track.kind, key.peer);
                self.notifier.notify(CallNotification::RemoteStreamReady {
                    peer: key.peer,
                    track,
                });
            }
        }
    }

    /// Swap the outgoing track of `track.kind` on every live link.
    /// A failure on one link does not stop the others.
    pub async fn replace_track(&mut self, track: LocalTrack) -> TrackReplaceReport {
        self.outgoing.retain(|t| t.kind != track.kind);
        self.outgoing.push(track.clone());

        let attempts = self
            .links
            .values()
            .filter(|link| !link.state.is_terminal())
            .map(|link| {
                let track = &track;
                async move {
                    let result = link.handle.replace_outgoing_track(track).await;
                    (link.key.peer.clone(), result)
                }
            });
        let results = join_all(attempts).await;

        let mut report = TrackReplaceReport::default();
        for (peer, result) in results {
            match result {
                Ok(()) => report.replaced.push(peer),
                Err(e) => {
                    let reason = format!("track replacement failed: {e:#}");
                    warn!("{} for {}", reason, peer);
                    self.notifier.notify(CallNotification::LinkFailed {
                        peer: peer.clone(),
                        reason: reason.clone(),
                    });
                    report.failed.push((peer, reason));
                }
            }
        }
        report.replaced.sort();
        report.failed.sort();
        report
    }

    /// Close every link. Returns each peer with the state its link ended in.
    pub async fn close_all(&mut self) -> Vec<(ParticipantId, LinkState)> {
        let mut peers: Vec<ParticipantId> = self.links.keys().cloned().collect();
        peers.sort();

        let mut closed = Vec::with_capacity(peers.len());
        for peer in peers {
            if let Some(state) = self.close_link(&peer).await {
                closed.push((peer, state));
            }
        }
        self.early_candidates.clear();
        self.departed.clear();
        closed
    }

    pub async fn close_link(&mut self, peer: &ParticipantId) -> Option<LinkState> {
        let mut link = self.links.remove(peer)?;
        if link.state.is_terminal() {
            return Some(link.state);
        }

        link.transition(LinkState::Closed);
        link.pending_candidates.clear();
        if let Err(e) = link.handle.close().await {
            warn!("Failed to close transport for {}: {:?}", peer, e);
        }
        info!("Peer link to {} closed", peer);
        self.announce(peer, LinkState::Closed);
        Some(LinkState::Closed)
    }

    async fn create_link(&mut self, peer: &ParticipantId, initiator: bool) -> Result<()> {
        self.departed.remove(peer);
        self.next_generation += 1;
        let key = LinkKey::new(peer.clone(), self.next_generation);
        info!(
            "Creating peer link for {} (generation {}, initiator: {})",
            peer, key.generation, initiator
        );

        let handle = self
            .transport
            .create(
                key.clone(),
                self.transport_config.clone(),
                self.transport_tx.clone(),
            )
            .await
            .with_context(|| format!("Failed to create transport for {peer}"))?;

        for track in &self.outgoing {
            if let Err(e) = handle.add_track(track).await {
                let _ = handle.close().await;
                return Err(e);
            }
        }

        let mut link = PeerLink::new(key, handle, initiator);
        for candidate in self.early_candidates.remove(peer).unwrap_or_default() {
            link.buffer_candidate(candidate);
        }
        self.links.insert(peer.clone(), link);
        self.announce(peer, LinkState::New);
        Ok(())
    }

    async fn initiate_offer(&mut self, peer: &ParticipantId) -> Result<()> {
        let link = self.links.get_mut(peer).context("No link to offer on")?;

        let offer = link.handle.create_offer().await?;
        link.handle.set_local_description(offer.clone()).await?;
        link.transition(LinkState::HaveLocalOffer);

        info!("Sending offer to {}", peer);
        self.signals.send_offer(peer.clone(), offer).await;
        self.announce(peer, LinkState::HaveLocalOffer);
        Ok(())
    }

    async fn handle_offer(&mut self, peer: &ParticipantId, offer: SessionDescription) -> Result<()> {
        match self.links.get(peer).map(|l| l.state) {
            Some(LinkState::HaveLocalOffer) if self.is_initiator_for(peer) => {
                debug!("Ignoring competing offer from {}, local side initiates", peer);
                return Ok(());
            }
            Some(LinkState::HaveLocalOffer) => {
                info!("Offer collision with {}, rebuilding link as answerer", peer);
                self.close_link(peer).await;
                self.create_link(peer, false).await?;
            }
            Some(state) if state.is_terminal() => {
                self.links.remove(peer);
                self.create_link(peer, false).await?;
            }
            Some(_) => {}
            None => self.create_link(peer, false).await?,
        }

        let link = self.links.get_mut(peer).context("Link vanished during offer")?;
        if link.last_remote_offer.as_deref() == Some(offer.sdp.as_str()) {
            debug!("Duplicate offer from {} ignored", peer);
            return Ok(());
        }

        // A fresh offer on a live link is a renegotiation request (camera flip,
        // track change on the remote end): answer it again, keep the state.
        let renegotiation = matches!(link.state, LinkState::Connecting | LinkState::Connected);
        if renegotiation {
            info!("Renegotiation offer from {}", peer);
        } else {
            link.transition(LinkState::HaveRemoteOffer);
        }

        link.handle.set_remote_description(offer.clone()).await?;
        link.remote_description_set = true;
        link.last_remote_offer = Some(offer.sdp);
        link.flush_candidates().await;

        let answer = link.handle.create_answer().await?;
        link.handle.set_local_description(answer.clone()).await?;
        if !renegotiation {
            link.transition(LinkState::Connecting);
        }

        info!("Sending answer to {}", peer);
        self.signals.send_answer(peer.clone(), answer).await;
        if !renegotiation {
            self.announce(peer, LinkState::Connecting);
        }
        Ok(())
    }

    async fn handle_answer(&mut self, peer: &ParticipantId, answer: SessionDescription) -> Result<()> {
        let Some(link) = self.links.get_mut(peer) else {
            debug!("Answer from {} without a link", peer);
            return Ok(());
        };
        if link.state != LinkState::HaveLocalOffer {
            debug!("Ignoring answer from {} in state {}", peer, link.state);
            return Ok(());
        }

        link.handle.set_remote_description(answer).await?;
        link.remote_description_set = true;
        link.flush_candidates().await;
        link.transition(LinkState::Connecting);

        info!("Answer applied for {}", peer);
        self.announce(peer, LinkState::Connecting);
        Ok(())
    }

    async fn handle_candidate(&mut self, peer: &ParticipantId, candidate: IceCandidate) {
        match self.links.get_mut(peer) {
            Some(link) if link.state.is_terminal() => {
                debug!("Candidate from {} for a finished link", peer);
            }
            Some(link) if link.remote_description_set => link.apply_candidate(candidate).await,
            Some(link) => link.buffer_candidate(candidate),
            None if self.departed.contains(peer) => {
                debug!("Dropping late candidate from departed {}", peer);
            }
            None => {
                let early = self.early_candidates.entry(peer.clone()).or_default();
                if early.len() < MAX_EARLY_CANDIDATES && !early.contains(&candidate) {
                    early.push(candidate);
                }
            }
        }
    }

    async fn on_transport_state(&mut self, peer: &ParticipantId, state: TransportState) {
        match state {
            TransportState::Connected => {
                let Some(link) = self.links.get_mut(peer) else {
                    return;
                };
                if link.state == LinkState::Connecting && link.transition(LinkState::Connected) {
                    info!("Peer link to {} connected", peer);
                    self.announce(peer, LinkState::Connected);
                }
            }
            TransportState::Failed => {
                let error = CallError::Transport {
                    peer: peer.clone(),
                    reason: "transport reported failure".to_owned(),
                };
                warn!("{}", error);
                self.shut_link(peer).await;
                self.notifier.notify(CallNotification::LinkFailed {
                    peer: peer.clone(),
                    reason: error.to_string(),
                });
            }
            TransportState::Closed => {
                self.close_link(peer).await;
            }
            TransportState::Disconnected => {
                warn!("Transport to {} disconnected, waiting for recovery", peer);
            }
            TransportState::New | TransportState::Connecting => {}
        }
    }

    /// Move a live link to `Closed` and release its transport, keeping the
    /// entry so the peer's tile shows it as closed.
    async fn shut_link(&mut self, peer: &ParticipantId) {
        let Some(link) = self.links.get_mut(peer) else {
            return;
        };
        if !link.transition(LinkState::Closed) {
            return;
        }
        link.pending_candidates.clear();
        if let Err(e) = link.handle.close().await {
            debug!("Closing failed transport for {}: {:?}", peer, e);
        }
        info!("Peer link to {} closed after transport failure", peer);
        self.announce(peer, LinkState::Closed);
    }

    /// Negotiation failure: move the link to `Error`, release its transport
    /// and report it. Sibling links are untouched.
    async fn fail_link(&mut self, peer: &ParticipantId, error: CallError) {
        warn!("{}", error);

        if let Some(link) = self.links.get_mut(peer) {
            if link.transition(LinkState::Error) {
                link.pending_candidates.clear();
                if let Err(e) = link.handle.close().await {
                    debug!("Closing failed transport for {}: {:?}", peer, e);
                }
                self.announce(peer, LinkState::Error);
            }
        }

        self.notifier.notify(CallNotification::LinkFailed {
            peer: peer.clone(),
            reason: error.to_string(),
        });
    }

    fn announce(&self, peer: &ParticipantId, state: LinkState) {
        self.notifier.notify(CallNotification::LinkStateChanged {
            peer: peer.clone(),
            state,
        });
    }
}

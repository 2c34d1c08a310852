use crate::call::{CallCommand, CallNotification, CallNotifier, CallSnapshot, CallState, EndReport};
use crate::config::CallConfig;
use crate::error::{CallError, CallResult};
use crate::media::{LocalTrack, MediaProvider};
use crate::orchestrator::{PeerOrchestrator, TrackReplaceReport};
use crate::registry::{ParticipantRegistry, RegistryEvent};
use crate::relay::{PollEvent, RelayChannel, RelayPoller, SendFailure, SignalInbox, SignalOutput};
use crate::transport::TransportEvent;
use huddle_core::{
    FacingMode, JoinedPayload, LeftPayload, LocalMediaState, Participant, ParticipantId,
    RemoteMediaState, ScreenSharePayload, Signal, SignalKind, TrackKind, TrackTogglePayload, VideoSource,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Upper bound on waiting for an aborted poller to unwind.
const POLLER_STOP_TIMEOUT: Duration = Duration::from_secs(2);

/// The running call. One task owns this value; every signal, transport
/// event and user command is processed here in arrival order.
pub(super) struct CallSession {
    pub(super) local: Participant,
    pub(super) config: CallConfig,
    pub(super) relay: Arc<dyn RelayChannel>,
    pub(super) media: Arc<dyn MediaProvider>,
    pub(super) notifier: Arc<dyn CallNotifier>,
    pub(super) signals: Arc<dyn SignalOutput>,
    pub(super) registry: ParticipantRegistry,
    pub(super) orchestrator: PeerOrchestrator,
    pub(super) local_media: LocalMediaState,
    pub(super) facing: FacingMode,
    pub(super) audio: Option<LocalTrack>,
    /// Camera capture, kept while screen sharing so it can be restored.
    pub(super) camera: Option<LocalTrack>,
    pub(super) screen: Option<LocalTrack>,
    pub(super) poller: Option<JoinHandle<()>>,
    pub(super) poll_failures: u32,
    pub(super) started_at: Option<Instant>,
    pub(super) state_tx: watch::Sender<CallState>,
    pub(super) command_rx: mpsc::Receiver<CallCommand>,
    pub(super) poll_rx: mpsc::Receiver<PollEvent>,
    pub(super) poll_tx: Option<mpsc::Sender<PollEvent>>,
    pub(super) transport_rx: mpsc::Receiver<TransportEvent>,
    pub(super) failure_rx: mpsc::Receiver<SendFailure>,
}

impl CallSession {
    /// Enter `Active`: start polling and open links to everyone already in
    /// the room.
    pub(super) async fn activate(&mut self, participants: Vec<Participant>) {
        self.started_at = Some(Instant::now());
        self.set_state(CallState::Active);

        if let Some(out) = self.poll_tx.take() {
            let poller = RelayPoller {
                relay: Arc::clone(&self.relay),
                room: self.config.room.clone(),
                local_id: self.local.id.clone(),
                interval: self.config.poll_interval(),
                inbox: SignalInbox::new(self.local.id.clone(), self.config.dedup_window),
                out,
            };
            self.poller = Some(tokio::spawn(poller.run()));
        }

        for participant in participants {
            self.admit(participant).await;
        }
    }

    pub(super) async fn run(mut self) {
        info!("Call session started for {}", self.local.id);

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(CallCommand::End { reply }) => {
                            let report = self.end().await;
                            let _ = reply.send(report);
                            break;
                        }
                        Some(c) => self.handle_command(c).await,
                        None => {
                            info!("All call handles dropped. Ending call.");
                            self.end().await;
                            break;
                        }
                    }
                }

                Some(event) = self.poll_rx.recv() => {
                    self.handle_poll_event(event).await;
                }

                Some(event) = self.transport_rx.recv() => {
                    self.orchestrator.handle_transport_event(event).await;
                }

                Some(failure) = self.failure_rx.recv() => {
                    self.handle_send_failure(failure).await;
                }
            }
        }

        info!("Call session finished for {}", self.local.id);
    }

    async fn handle_command(&mut self, cmd: CallCommand) {
        match cmd {
            CallCommand::ToggleMic { reply } => {
                let _ = reply.send(self.toggle_mic().await);
            }
            CallCommand::ToggleCamera { reply } => {
                let _ = reply.send(self.toggle_camera().await);
            }
            CallCommand::StartScreenShare { reply } => {
                let _ = reply.send(self.start_screen_share().await);
            }
            CallCommand::StopScreenShare { reply } => {
                let _ = reply.send(self.stop_screen_share().await);
            }
            CallCommand::FlipCamera { reply } => {
                let _ = reply.send(self.flip_camera().await);
            }
            CallCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            CallCommand::End { reply } => {
                let _ = reply.send(self.end().await);
            }
        }
    }

    async fn handle_poll_event(&mut self, event: PollEvent) {
        match event {
            PollEvent::Batch(batch) => {
                if self.poll_failures > 0 {
                    info!("Relay reachable again after {} failed poll(s)", self.poll_failures);
                    self.poll_failures = 0;
                }
                for signal in batch.signals {
                    self.handle_signal(signal).await;
                }
                if let Some(members) = batch.participants {
                    self.reconcile(members).await;
                }
            }
            PollEvent::Failed(error) => {
                self.poll_failures += 1;
                warn!(
                    "Poll failed ({} in a row), retrying next tick: {}",
                    self.poll_failures, error
                );
            }
        }
    }

    async fn handle_signal(&mut self, signal: Signal) {
        debug!("Signal {:?} from {}", signal.kind, signal.from);

        match signal.kind {
            SignalKind::Joined => {
                let name = signal
                    .payload_as::<JoinedPayload>()
                    .ok()
                    .and_then(|p| p.username)
                    .unwrap_or_else(|| signal.from.to_string());
                self.admit(Participant::new(signal.from.clone(), name)).await;
            }
            SignalKind::Left => {
                let id = signal
                    .payload_as::<LeftPayload>()
                    .ok()
                    .and_then(|p| p.user_id)
                    .unwrap_or_else(|| signal.from.clone());
                self.dismiss(&id).await;
            }
            SignalKind::Offer => {
                // An offer can beat the sender's `joined` notice.
                let placeholder = Participant::new(signal.from.clone(), signal.from.to_string());
                self.register(placeholder);
                self.orchestrator.handle_signal(&signal).await;
            }
            SignalKind::Answer | SignalKind::Candidate => {
                self.orchestrator.handle_signal(&signal).await;
            }
            SignalKind::TrackToggle => match signal.payload_as::<TrackTogglePayload>() {
                Ok(toggle) => self.update_remote_media(&signal.from, |media| match toggle.track {
                    TrackKind::Audio => media.mic_enabled = toggle.enabled,
                    TrackKind::Video => media.camera_enabled = toggle.enabled,
                }),
                Err(e) => warn!("Malformed track-toggle from {}: {}", signal.from, e),
            },
            SignalKind::ScreenShareStart => {
                self.update_remote_media(&signal.from, |media| media.screen_sharing = true);
            }
            SignalKind::ScreenShareStop => {
                self.update_remote_media(&signal.from, |media| media.screen_sharing = false);
            }
            SignalKind::Unknown => {
                debug!("Ignoring signal of unknown type from {}", signal.from);
            }
        }
    }

    async fn reconcile(&mut self, members: Vec<Participant>) {
        for event in self.registry.reconcile(members) {
            match event {
                RegistryEvent::Joined(participant) => {
                    let id = participant.id.clone();
                    self.notifier
                        .notify(CallNotification::ParticipantJoined(participant));
                    self.orchestrator.on_participant_joined(&id).await;
                }
                RegistryEvent::Left(participant) => {
                    self.notifier
                        .notify(CallNotification::ParticipantLeft(participant.id.clone()));
                    self.orchestrator.on_participant_left(&participant.id).await;
                }
            }
        }
    }

    /// A negotiation signal that never reached its peer counts as a relay
    /// timeout for that peer.
    async fn handle_send_failure(&mut self, failure: SendFailure) {
        let SendFailure { signal, error } = failure;

        let peer = match signal.to {
            Some(peer) if signal.kind.is_negotiation() => peer,
            _ => {
                warn!("Dropped {:?} broadcast after retries: {}", signal.kind, error);
                return;
            }
        };

        if !self.registry.contains(&peer) && self.orchestrator.link_state(&peer).is_none() {
            debug!("Send failure for {} who is already gone", peer);
            return;
        }

        warn!("Relay timed out delivering {:?} to {}", signal.kind, peer);
        self.notifier.notify(CallNotification::LinkFailed {
            peer: peer.clone(),
            reason: error.to_string(),
        });
        self.dismiss(&peer).await;
    }

    /// Register a participant and open a link to them.
    async fn admit(&mut self, participant: Participant) {
        let id = participant.id.clone();
        self.register(participant);
        self.orchestrator.on_participant_joined(&id).await;
    }

    fn register(&mut self, participant: Participant) {
        if let Some(RegistryEvent::Joined(participant)) = self.registry.upsert(participant) {
            self.notifier
                .notify(CallNotification::ParticipantJoined(participant));
        }
    }

    async fn dismiss(&mut self, id: &ParticipantId) {
        if let Some(RegistryEvent::Left(participant)) = self.registry.remove(id) {
            self.notifier
                .notify(CallNotification::ParticipantLeft(participant.id));
        }
        self.orchestrator.on_participant_left(id).await;
    }

    fn update_remote_media(
        &mut self,
        id: &ParticipantId,
        update: impl FnOnce(&mut RemoteMediaState),
    ) {
        match self.registry.update_media(id, update) {
            Some(participant) => self
                .notifier
                .notify(CallNotification::ParticipantMediaChanged(participant)),
            None => debug!("Media update for unknown participant {}", id),
        }
    }

    async fn toggle_mic(&mut self) -> bool {
        let enabled = !self.local_media.mic_enabled;
        self.local_media.mic_enabled = enabled;
        if let Some(track) = &self.audio {
            self.media.set_enabled(track, enabled).await;
        }
        info!("Microphone {}", if enabled { "on" } else { "off" });
        self.broadcast(
            SignalKind::TrackToggle,
            &TrackTogglePayload {
                track: TrackKind::Audio,
                enabled,
            },
        )
        .await;
        enabled
    }

    async fn toggle_camera(&mut self) -> bool {
        let enabled = !self.local_media.camera_enabled;
        self.local_media.camera_enabled = enabled;
        if let Some(track) = &self.camera {
            self.media.set_enabled(track, enabled).await;
        }
        info!("Camera {}", if enabled { "on" } else { "off" });
        self.broadcast(
            SignalKind::TrackToggle,
            &TrackTogglePayload {
                track: TrackKind::Video,
                enabled,
            },
        )
        .await;
        enabled
    }

    async fn start_screen_share(&mut self) -> CallResult<TrackReplaceReport> {
        self.ensure_active()?;
        if self.local_media.active_video_source == VideoSource::Screen {
            return Err(CallError::InvalidState(
                "screen sharing is already active".to_owned(),
            ));
        }

        let screen = self
            .media
            .acquire_screen()
            .await
            .map_err(|e| CallError::MediaUnavailable(format!("{e:#}")))?;

        let report = self.orchestrator.replace_track(screen.clone()).await;
        self.screen = Some(screen);
        self.local_media.active_video_source = VideoSource::Screen;
        info!(
            "Screen sharing started on {} link(s), {} failed",
            report.replaced.len(),
            report.failed.len()
        );

        self.broadcast(
            SignalKind::ScreenShareStart,
            &ScreenSharePayload {
                user_id: Some(self.local.id.clone()),
            },
        )
        .await;
        Ok(report)
    }

    async fn stop_screen_share(&mut self) -> CallResult<TrackReplaceReport> {
        self.ensure_active()?;
        if self.local_media.active_video_source != VideoSource::Screen {
            return Err(CallError::InvalidState(
                "screen sharing is not active".to_owned(),
            ));
        }

        let cached = self
            .camera
            .clone()
            .filter(|_| self.config.reuse_camera_on_stop);
        let camera = match cached {
            Some(camera) => camera,
            None => {
                let fresh = self.acquire_camera(self.facing).await?;
                if let Some(old) = self.camera.replace(fresh.clone()) {
                    self.media.release_track(old).await;
                }
                fresh
            }
        };

        let report = self.orchestrator.replace_track(camera).await;
        if let Some(screen) = self.screen.take() {
            self.media.release_track(screen).await;
        }
        self.local_media.active_video_source = VideoSource::Camera;
        info!(
            "Screen sharing stopped, camera restored on {} link(s)",
            report.replaced.len()
        );

        self.broadcast(
            SignalKind::ScreenShareStop,
            &ScreenSharePayload {
                user_id: Some(self.local.id.clone()),
            },
        )
        .await;
        Ok(report)
    }

    async fn flip_camera(&mut self) -> CallResult<TrackReplaceReport> {
        self.ensure_active()?;
        let facing = self.facing.flipped();
        let camera = self.acquire_camera(facing).await?;

        let report = if self.local_media.active_video_source == VideoSource::Camera {
            self.orchestrator.replace_track(camera.clone()).await
        } else {
            TrackReplaceReport::default()
        };

        if let Some(old) = self.camera.replace(camera) {
            self.media.release_track(old).await;
        }
        self.facing = facing;
        info!("Camera flipped to {:?}", facing);
        Ok(report)
    }

    /// Fresh camera capture honoring the current camera toggle.
    async fn acquire_camera(&self, facing: FacingMode) -> CallResult<LocalTrack> {
        let camera = self
            .media
            .acquire_camera(facing)
            .await
            .map_err(|e| CallError::MediaUnavailable(format!("{e:#}")))?;
        if !self.local_media.camera_enabled {
            self.media.set_enabled(&camera, false).await;
        }
        Ok(camera)
    }

    fn snapshot(&self) -> CallSnapshot {
        CallSnapshot {
            state: self.state(),
            local: self.local.clone(),
            local_media: self.local_media,
            participants: self.registry.list(),
            links: self.orchestrator.links(),
            polling: self.poller.as_ref().is_some_and(|p| !p.is_finished()),
            poll_failures: self.poll_failures,
            elapsed: self.elapsed(),
        }
    }

    /// Stop polling, close every link, release media, then tell the relay.
    async fn end(&mut self) -> EndReport {
        if self.state() == CallState::Ended {
            return EndReport {
                closed_links: Vec::new(),
                polling_stopped: true,
                duration: self.elapsed(),
            };
        }
        self.set_state(CallState::Ending);

        let polling_stopped = self.stop_polling().await;

        let closed_links: Vec<ParticipantId> = self
            .orchestrator
            .close_all()
            .await
            .into_iter()
            .map(|(peer, _)| peer)
            .collect();
        info!("Closed {} peer link(s)", closed_links.len());

        for track in [self.audio.take(), self.camera.take(), self.screen.take()]
            .into_iter()
            .flatten()
        {
            self.media.release_track(track).await;
        }

        let leave = self.relay.leave(&self.config.room, &self.local.id);
        match tokio::time::timeout(self.config.leave_timeout(), leave).await {
            Ok(Ok(())) => info!("Left room {}", self.config.room),
            Ok(Err(e)) => warn!("Leave notification failed: {}", e),
            Err(_) => warn!("Leave notification timed out"),
        }

        let duration = self.elapsed();
        self.set_state(CallState::Ended);

        EndReport {
            closed_links,
            polling_stopped,
            duration,
        }
    }

    /// Abort the poller and wait for it. Returns whether the task is gone.
    async fn stop_polling(&mut self) -> bool {
        self.poll_rx.close();
        let Some(poller) = self.poller.take() else {
            return true;
        };
        poller.abort();

        let stopped = match tokio::time::timeout(POLLER_STOP_TIMEOUT, poller).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) if e.is_cancelled() => true,
            Ok(Err(e)) => {
                error!("Signal poller panicked: {}", e);
                true
            }
            Err(_) => {
                error!("Signal poller did not stop within {:?}", POLLER_STOP_TIMEOUT);
                false
            }
        };
        if stopped {
            info!("Signal polling stopped");
        }
        stopped
    }

    async fn broadcast<T: Serialize>(&self, kind: SignalKind, payload: &T) {
        match serde_json::to_value(payload) {
            Ok(value) => self.signals.broadcast(kind, value).await,
            Err(e) => error!("Failed to serialize {:?} payload: {}", kind, e),
        }
    }

    fn ensure_active(&self) -> CallResult<()> {
        let state = self.state();
        if state.is_active() {
            Ok(())
        } else {
            Err(CallError::InvalidState(format!(
                "operation requires an active call, current state is {state}"
            )))
        }
    }

    fn state(&self) -> CallState {
        *self.state_tx.borrow()
    }

    fn elapsed(&self) -> Duration {
        self.started_at.map_or(Duration::ZERO, |t| t.elapsed())
    }

    fn set_state(&self, state: CallState) {
        info!("Call state -> {}", state);
        self.state_tx.send_replace(state);
        self.notifier.notify(CallNotification::StateChanged(state));
    }
}

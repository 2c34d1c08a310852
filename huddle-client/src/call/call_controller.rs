use crate::call::call_session::CallSession;
use crate::call::{CallHandle, CallNotification, CallNotifier, CallState};
use crate::config::CallConfig;
use crate::error::{CallError, CallResult};
use crate::media::MediaProvider;
use crate::orchestrator::PeerOrchestrator;
use crate::relay::{HttpRelay, JoinOutcome, RelayChannel, RelayOutbox, SignalOutput};
use crate::registry::ParticipantRegistry;
use crate::transport::{PeerTransport, TransportConfig};
use huddle_core::{LocalMediaState, Participant};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

/// Starts a call: acquires media, joins the room and hands the running
/// session back as a [`CallHandle`].
///
/// A controller is single-use. If `start` fails nothing is left running and
/// the state ends at [`CallState::Ended`].
pub struct CallController {
    config: CallConfig,
    relay: Arc<dyn RelayChannel>,
    media: Arc<dyn MediaProvider>,
    transport: Arc<dyn PeerTransport>,
    notifier: Arc<dyn CallNotifier>,
    state_tx: watch::Sender<CallState>,
}

impl CallController {
    pub fn new(
        config: CallConfig,
        relay: Arc<dyn RelayChannel>,
        media: Arc<dyn MediaProvider>,
        transport: Arc<dyn PeerTransport>,
        notifier: Arc<dyn CallNotifier>,
    ) -> Self {
        let (state_tx, _) = watch::channel(CallState::Idle);
        Self {
            config,
            relay,
            media,
            transport,
            notifier,
            state_tx,
        }
    }

    /// Controller talking to the relay over HTTP at `config.relay_url`.
    pub fn with_http_relay(
        config: CallConfig,
        media: Arc<dyn MediaProvider>,
        transport: Arc<dyn PeerTransport>,
        notifier: Arc<dyn CallNotifier>,
    ) -> CallResult<Self> {
        let relay = HttpRelay::new(&config.relay_url, config.request_timeout())?;
        Ok(Self::new(config, Arc::new(relay), media, transport, notifier))
    }

    pub fn state(&self) -> CallState {
        *self.state_tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<CallState> {
        self.state_tx.subscribe()
    }

    pub async fn start(self) -> CallResult<CallHandle> {
        if self.state() != CallState::Idle {
            return Err(CallError::InvalidState(format!(
                "call cannot start from state {}",
                self.state()
            )));
        }
        self.set_state(CallState::Joining);

        let stream = match self.media.acquire(&self.config.media).await {
            Ok(stream) => stream,
            Err(e) => return Err(self.abort(CallError::MediaUnavailable(format!("{e:#}")))),
        };

        let requested = Participant::new(
            self.config.participant_id.clone(),
            self.config.display_name.clone(),
        );
        let joined = match self.join_with_retry(&requested).await {
            Ok(joined) => joined,
            Err(e) => {
                self.media.release(stream).await;
                return Err(self.abort(e));
            }
        };

        let local = Participant::new(joined.local_id.clone(), self.config.display_name.clone());
        info!(
            "Joined room {} as {} with {} other participant(s)",
            self.config.room,
            local.id,
            joined.participants.len()
        );

        let (transport_tx, transport_rx) = mpsc::channel(256);
        let (command_tx, command_rx) = mpsc::channel(32);
        let (poll_tx, poll_rx) = mpsc::channel(64);
        let (failure_tx, failure_rx) = mpsc::channel(64);

        let signals: Arc<dyn SignalOutput> = Arc::new(RelayOutbox::new(
            Arc::clone(&self.relay),
            self.config.room.clone(),
            local.id.clone(),
            self.config.send_retry.clone(),
            failure_tx,
        ));

        let mut orchestrator = PeerOrchestrator::new(
            local.id.clone(),
            Arc::clone(&self.transport),
            TransportConfig {
                ice_servers: self.config.ice_servers.clone(),
            },
            transport_tx,
            Arc::clone(&signals),
            Arc::clone(&self.notifier),
        );
        orchestrator.set_local_tracks(stream.tracks());

        let handle = CallHandle::new(local.id.clone(), command_tx, self.state_tx.subscribe());
        let registry = ParticipantRegistry::new(local.id.clone());
        let facing = self.config.media.video.facing;

        let mut session = CallSession {
            local,
            config: self.config,
            relay: self.relay,
            media: self.media,
            notifier: self.notifier,
            signals,
            registry,
            orchestrator,
            local_media: LocalMediaState::default(),
            facing,
            audio: stream.audio,
            camera: stream.video,
            screen: None,
            poller: None,
            poll_failures: 0,
            started_at: None,
            state_tx: self.state_tx,
            command_rx,
            poll_rx,
            poll_tx: Some(poll_tx),
            transport_rx,
            failure_rx,
        };
        session.activate(joined.participants).await;
        tokio::spawn(session.run());

        Ok(handle)
    }

    async fn join_with_retry(&self, participant: &Participant) -> CallResult<JoinOutcome> {
        let policy = &self.config.join_retry;
        let attempts = policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.relay.join(&self.config.room, participant).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) if e.is_transient() && attempt < attempts => {
                    let delay = policy.delay_after(attempt);
                    warn!(
                        "Join attempt {}/{} failed: {}. Retrying in {:?}",
                        attempt, attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn abort(&self, error: CallError) -> CallError {
        error!("Call start failed: {}", error);
        self.notifier
            .notify(CallNotification::Error(error.user_message()));
        self.set_state(CallState::Ended);
        error
    }

    fn set_state(&self, state: CallState) {
        info!("Call state -> {}", state);
        self.state_tx.send_replace(state);
        self.notifier.notify(CallNotification::StateChanged(state));
    }
}

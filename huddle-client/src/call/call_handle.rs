use crate::call::{CallCommand, CallSnapshot, CallState, EndReport};
use crate::error::{CallError, CallResult};
use crate::orchestrator::TrackReplaceReport;
use huddle_core::ParticipantId;
use tokio::sync::{mpsc, oneshot, watch};

/// Cloneable front end of a running call. Every method queues a command for
/// the session task; once the call has ended they return
/// [`CallError::SessionClosed`].
#[derive(Debug, Clone)]
pub struct CallHandle {
    local_id: ParticipantId,
    command_tx: mpsc::Sender<CallCommand>,
    state_rx: watch::Receiver<CallState>,
}

impl CallHandle {
    pub(crate) fn new(
        local_id: ParticipantId,
        command_tx: mpsc::Sender<CallCommand>,
        state_rx: watch::Receiver<CallState>,
    ) -> Self {
        Self {
            local_id,
            command_tx,
            state_rx,
        }
    }

    pub fn local_id(&self) -> &ParticipantId {
        &self.local_id
    }

    pub fn state(&self) -> CallState {
        *self.state_rx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<CallState> {
        self.state_rx.clone()
    }

    /// Returns the new microphone state.
    pub async fn toggle_mic(&self) -> CallResult<bool> {
        self.request(|reply| CallCommand::ToggleMic { reply }).await
    }

    /// Returns the new camera state.
    pub async fn toggle_camera(&self) -> CallResult<bool> {
        self.request(|reply| CallCommand::ToggleCamera { reply }).await
    }

    pub async fn start_screen_share(&self) -> CallResult<TrackReplaceReport> {
        self.request(|reply| CallCommand::StartScreenShare { reply }).await?
    }

    pub async fn stop_screen_share(&self) -> CallResult<TrackReplaceReport> {
        self.request(|reply| CallCommand::StopScreenShare { reply }).await?
    }

    pub async fn flip_camera(&self) -> CallResult<TrackReplaceReport> {
        self.request(|reply| CallCommand::FlipCamera { reply }).await?
    }

    pub async fn snapshot(&self) -> CallResult<CallSnapshot> {
        self.request(|reply| CallCommand::Snapshot { reply }).await
    }

    pub async fn end(&self) -> CallResult<EndReport> {
        self.request(|reply| CallCommand::End { reply }).await
    }

    pub async fn wait_for_state(&self, target: CallState) -> CallResult<()> {
        let mut state_rx = self.state_rx.clone();
        let reached = state_rx.wait_for(|state| *state == target).await.is_ok();
        if reached {
            Ok(())
        } else {
            Err(CallError::SessionClosed)
        }
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> CallCommand,
    ) -> CallResult<T> {
        let (reply, response) = oneshot::channel();
        self.command_tx
            .send(command(reply))
            .await
            .map_err(|_| CallError::SessionClosed)?;
        response.await.map_err(|_| CallError::SessionClosed)
    }
}

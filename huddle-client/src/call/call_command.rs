use crate::call::CallState;
use crate::error::CallResult;
use crate::orchestrator::{LinkSnapshot, TrackReplaceReport};
use huddle_core::{LocalMediaState, Participant, ParticipantId};
use std::time::Duration;
use tokio::sync::oneshot;

/// User actions funnelled into the call session.
#[derive(Debug)]
pub enum CallCommand {
    ToggleMic {
        reply: oneshot::Sender<bool>,
    },
    ToggleCamera {
        reply: oneshot::Sender<bool>,
    },
    StartScreenShare {
        reply: oneshot::Sender<CallResult<TrackReplaceReport>>,
    },
    StopScreenShare {
        reply: oneshot::Sender<CallResult<TrackReplaceReport>>,
    },
    FlipCamera {
        reply: oneshot::Sender<CallResult<TrackReplaceReport>>,
    },
    Snapshot {
        reply: oneshot::Sender<CallSnapshot>,
    },
    End {
        reply: oneshot::Sender<EndReport>,
    },
}

#[derive(Debug, Clone)]
pub struct CallSnapshot {
    pub state: CallState,
    pub local: Participant,
    pub local_media: LocalMediaState,
    pub participants: Vec<Participant>,
    pub links: Vec<LinkSnapshot>,
    pub polling: bool,
    /// Consecutive failed polls since the last successful one.
    pub poll_failures: u32,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndReport {
    pub closed_links: Vec<ParticipantId>,
    pub polling_stopped: bool,
    pub duration: Duration,
}

use crate::error::CallError;
use crate::relay::{PollBatch, RelayChannel, SignalInbox};
use huddle_core::{ParticipantId, RoomId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

pub(crate) enum PollEvent {
    Batch(PollBatch),
    Failed(CallError),
}

/// Recurring poll timer. Runs until aborted or until the session stops
/// listening.
pub(crate) struct RelayPoller {
    pub(crate) relay: Arc<dyn RelayChannel>,
    pub(crate) room: RoomId,
    pub(crate) local_id: ParticipantId,
    pub(crate) interval: Duration,
    pub(crate) inbox: SignalInbox,
    pub(crate) out: mpsc::Sender<PollEvent>,
}

impl RelayPoller {
    pub(crate) async fn run(mut self) {
        info!("Signal polling started for room {} every {:?}", self.room, self.interval);

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let since = self.inbox.cursor();
            let event = match self.relay.poll(&self.room, &self.local_id, since).await {
                Ok(batch) => PollEvent::Batch(PollBatch {
                    signals: self.inbox.accept(batch.signals),
                    participants: batch.participants,
                }),
                Err(e) => {
                    warn!("Signal poll failed: {}", e);
                    PollEvent::Failed(e)
                }
            };

            if self.out.send(event).await.is_err() {
                break;
            }
        }

        info!("Signal polling stopped for room {}", self.room);
    }
}

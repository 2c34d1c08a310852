use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::room::RoomLog;
use dashmap::{DashMap, DashSet};
use huddle_core::{
    JoinRequest, JoinResponse, LeaveRequest, ParticipantId, PollQuery, RelayStatus, RoomId,
    RoomUser, Signal, SignalsResponse, StatusResponse,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

struct RelayRoomsInner {
    rooms: DashMap<RoomId, RoomLog>,
    closed: DashSet<RoomId>,
    config: RelayConfig,
}

/// All rooms served by one relay. Cheap to clone.
///
/// Every operation answers with the wire body the HTTP layer sends back,
/// so in-process callers see exactly what a remote client would.
#[derive(Clone)]
pub struct RelayRooms {
    inner: Arc<RelayRoomsInner>,
}

impl RelayRooms {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            inner: Arc::new(RelayRoomsInner {
                rooms: DashMap::new(),
                closed: DashSet::new(),
                config,
            }),
        }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.inner.config
    }

    pub fn join(&self, room: &RoomId, request: JoinRequest) -> JoinResponse {
        self.try_join(room, request).unwrap_or_else(|e| {
            warn!("Join to room {} rejected: {}", room, e);
            JoinResponse::rejected(e.code(), e.to_string())
        })
    }

    pub fn poll(&self, room: &RoomId, query: PollQuery) -> SignalsResponse {
        self.try_poll(room, query).unwrap_or_else(|e| {
            debug!("Poll on room {} rejected: {}", room, e);
            SignalsResponse {
                status: RelayStatus::Error,
                signals: Vec::new(),
                users: None,
                code: Some(e.code().to_owned()),
                message: Some(e.to_string()),
            }
        })
    }

    pub fn post(&self, room: &RoomId, signal: Signal) -> StatusResponse {
        match self.try_post(room, signal) {
            Ok(()) => StatusResponse::success(),
            Err(e) => {
                warn!("Signal for room {} rejected: {}", room, e);
                StatusResponse::error(e.code(), e.to_string())
            }
        }
    }

    /// Idempotent: leaving a room one is not in still succeeds.
    pub fn leave(&self, room: &RoomId, request: LeaveRequest) -> StatusResponse {
        let id = ParticipantId::from(request.user_id);

        if let Some(mut log) = self.inner.rooms.get_mut(room) {
            if log.leave(&id) {
                info!("{} left room {}", id, room);
            }
        }
        self.drop_if_empty(room);
        StatusResponse::success()
    }

    /// Close a room. Its history is discarded and later joins are refused.
    pub fn close(&self, room: &RoomId) -> StatusResponse {
        self.inner.closed.insert(room.clone());
        if self.inner.rooms.remove(room).is_some() {
            info!("Room {} closed", room);
        }
        StatusResponse::success()
    }

    /// Evict stale members everywhere and drop rooms left empty.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let stale_after = self.inner.config.stale_after;
        let mut evicted = 0;

        self.inner.rooms.retain(|room, log| {
            evicted += log.evict_stale(stale_after, now).len();
            if log.is_empty() {
                info!("Room {} is empty, dropping it", room);
            }
            !log.is_empty()
        });
        evicted
    }

    pub fn room_count(&self) -> usize {
        self.inner.rooms.len()
    }

    pub fn users(&self, room: &RoomId) -> Option<Vec<RoomUser>> {
        self.inner.rooms.get(room).map(|log| log.users())
    }

    fn try_join(&self, room: &RoomId, request: JoinRequest) -> Result<JoinResponse, RelayError> {
        if self.inner.closed.contains(room) {
            return Err(RelayError::RoomClosed);
        }
        let username = request.username.trim().to_owned();
        if username.is_empty() {
            return Err(RelayError::BadRequest("username is required".to_owned()));
        }
        let id = request
            .user_id
            .filter(|id| !id.is_empty())
            .map(ParticipantId::from)
            .unwrap_or_default();

        let now = Instant::now();
        let config = &self.inner.config;
        let mut log = self
            .inner
            .rooms
            .entry(room.clone())
            .or_insert_with(|| RoomLog::new(config.retention));

        log.evict_stale(config.stale_after, now);
        log.join(id.clone(), username.clone(), config.max_participants, now)?;
        let users = log.users();

        info!("{} joined room {} as {}", username, room, id);
        Ok(JoinResponse {
            status: RelayStatus::Success,
            code: None,
            message: None,
            user_id: Some(id.0),
            user_count: users.len(),
            users,
        })
    }

    fn try_poll(&self, room: &RoomId, query: PollQuery) -> Result<SignalsResponse, RelayError> {
        if self.inner.closed.contains(room) {
            return Err(RelayError::RoomClosed);
        }
        let id = ParticipantId::from(query.user_id);
        let mut log = self
            .inner
            .rooms
            .get_mut(room)
            .ok_or_else(|| RelayError::UnknownMember(id.to_string()))?;

        let now = Instant::now();
        log.evict_stale(self.inner.config.stale_after, now);
        let signals = log.drain(&id, query.since, now)?;

        Ok(SignalsResponse {
            status: RelayStatus::Success,
            signals,
            users: Some(log.users()),
            code: None,
            message: None,
        })
    }

    fn try_post(&self, room: &RoomId, signal: Signal) -> Result<(), RelayError> {
        if self.inner.closed.contains(room) {
            return Err(RelayError::RoomClosed);
        }
        let mut log = self
            .inner
            .rooms
            .get_mut(room)
            .ok_or_else(|| RelayError::UnknownMember(signal.from.to_string()))?;

        let kind = signal.kind;
        let seq = log.post(signal, Instant::now())?;
        debug!("Stored {:?} in room {} as #{}", kind, room, seq);
        Ok(())
    }

    fn drop_if_empty(&self, room: &RoomId) {
        if self
            .inner
            .rooms
            .remove_if(room, |_, log| log.is_empty())
            .is_some()
        {
            info!("Room {} is empty, dropping it", room);
        }
    }
}

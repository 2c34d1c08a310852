use crate::error::RelayError;
use huddle_core::{ParticipantId, RoomUser, Signal, SignalKind};
use serde_json::json;
use std::collections::{BTreeMap, VecDeque};
use std::time::{Duration, Instant};
use tracing::{debug, info};

#[derive(Debug)]
struct Member {
    username: String,
    last_seen: Instant,
    /// Highest sequence number already handed to this member.
    cursor: u64,
}

/// Stored signal history and membership of one room.
///
/// Every stored signal gets the next sequence number. Echoes are not
/// filtered; directed signals are only handed to their addressee.
#[derive(Debug)]
pub struct RoomLog {
    members: BTreeMap<ParticipantId, Member>,
    signals: VecDeque<Signal>,
    next_seq: u64,
    retention: usize,
}

impl RoomLog {
    pub fn new(retention: usize) -> Self {
        Self {
            members: BTreeMap::new(),
            signals: VecDeque::new(),
            next_seq: 1,
            retention: retention.max(1),
        }
    }

    /// Add a member and announce it with a `joined` signal. Joining again
    /// under the same id only refreshes the member.
    pub fn join(
        &mut self,
        id: ParticipantId,
        username: String,
        max_participants: usize,
        now: Instant,
    ) -> Result<(), RelayError> {
        if let Some(member) = self.members.get_mut(&id) {
            debug!("Member {} rejoined", id);
            member.username = username;
            member.last_seen = now;
            return Ok(());
        }
        if self.members.len() >= max_participants {
            return Err(RelayError::RoomFull(max_participants));
        }

        let seq = self.push(Signal::new(
            id.clone(),
            None,
            SignalKind::Joined,
            json!({ "username": username }),
        ));
        let member = Member {
            username,
            last_seen: now,
            cursor: seq,
        };
        self.members.insert(id, member);
        Ok(())
    }

    /// Remove a member and announce it with a `left` signal.
    pub fn leave(&mut self, id: &ParticipantId) -> bool {
        if self.members.remove(id).is_none() {
            return false;
        }
        self.push(Signal::new(
            id.clone(),
            None,
            SignalKind::Left,
            json!({ "user_id": id }),
        ));
        true
    }

    pub fn post(&mut self, signal: Signal, now: Instant) -> Result<u64, RelayError> {
        let sender = self
            .members
            .get_mut(&signal.from)
            .ok_or_else(|| RelayError::UnknownMember(signal.from.to_string()))?;
        sender.last_seen = now;
        Ok(self.push(signal))
    }

    /// Signals for `id` newer than `since`, or newer than the member's own
    /// cursor when `since` is absent.
    pub fn drain(
        &mut self,
        id: &ParticipantId,
        since: Option<u64>,
        now: Instant,
    ) -> Result<Vec<Signal>, RelayError> {
        let last_seq = self.last_seq();
        let member = self
            .members
            .get_mut(id)
            .ok_or_else(|| RelayError::UnknownMember(id.to_string()))?;
        member.last_seen = now;

        let from = since.unwrap_or(member.cursor);
        member.cursor = member.cursor.max(last_seq);

        Ok(self
            .signals
            .iter()
            .filter(|s| s.sequence.is_some_and(|seq| seq > from))
            .filter(|s| s.is_for(id))
            .cloned()
            .collect())
    }

    /// Evict members that stopped polling. Returns the evicted ids.
    pub fn evict_stale(&mut self, stale_after: Duration, now: Instant) -> Vec<ParticipantId> {
        let stale: Vec<ParticipantId> = self
            .members
            .iter()
            .filter(|(_, m)| now.saturating_duration_since(m.last_seen) > stale_after)
            .map(|(id, _)| id.clone())
            .collect();

        for id in &stale {
            info!("Evicting stale member {}", id);
            self.leave(id);
        }
        stale
    }

    pub fn users(&self) -> Vec<RoomUser> {
        self.members
            .iter()
            .map(|(id, m)| RoomUser {
                id: id.to_string(),
                username: m.username.clone(),
            })
            .collect()
    }

    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.members.contains_key(id)
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn stored_signals(&self) -> usize {
        self.signals.len()
    }

    fn last_seq(&self) -> u64 {
        self.next_seq - 1
    }

    fn push(&mut self, mut signal: Signal) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        signal.sequence = Some(seq);
        self.signals.push_back(signal);

        while self.signals.len() > self.retention {
            self.signals.pop_front();
        }
        seq
    }
}

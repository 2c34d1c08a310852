use huddle_core::{ParticipantId, Signal};
use std::collections::{HashSet, VecDeque};
use tracing::debug;

/// Filters raw poll results down to signals this participant should act on.
///
/// Drops echoes of our own signals, signals addressed to somebody else, and
/// redeliveries (same relay sequence number, or same content when the relay
/// does not number its signals). Remembers at most `capacity` entries.
pub struct SignalInbox {
    local_id: ParticipantId,
    cursor: Option<u64>,
    seen: HashSet<u64>,
    order: VecDeque<u64>,
    seen_sequences: HashSet<u64>,
    sequence_order: VecDeque<u64>,
    capacity: usize,
}

impl SignalInbox {
    pub fn new(local_id: ParticipantId, capacity: usize) -> Self {
        Self {
            local_id,
            cursor: None,
            seen: HashSet::new(),
            order: VecDeque::new(),
            seen_sequences: HashSet::new(),
            sequence_order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Highest relay sequence number seen so far.
    pub fn cursor(&self) -> Option<u64> {
        self.cursor
    }

    pub fn accept(&mut self, batch: Vec<Signal>) -> Vec<Signal> {
        let mut accepted = Vec::with_capacity(batch.len());

        for signal in batch {
            if let Some(seq) = signal.sequence {
                self.cursor = Some(self.cursor.map_or(seq, |c| c.max(seq)));
            }

            if signal.from == self.local_id {
                continue;
            }
            if !signal.is_for(&self.local_id) {
                continue;
            }
            if self.is_duplicate(&signal) {
                debug!("Dropping redelivered {:?} from {}", signal.kind, signal.from);
                continue;
            }

            accepted.push(signal);
        }

        accepted
    }

    fn is_duplicate(&mut self, signal: &Signal) -> bool {
        match signal.sequence {
            Some(seq) => !remember(
                &mut self.seen_sequences,
                &mut self.sequence_order,
                seq,
                self.capacity,
            ),
            None => !remember(
                &mut self.seen,
                &mut self.order,
                signal.fingerprint(),
                self.capacity,
            ),
        }
    }
}

/// Returns false if `value` was already remembered.
fn remember(set: &mut HashSet<u64>, order: &mut VecDeque<u64>, value: u64, capacity: usize) -> bool {
    if !set.insert(value) {
        return false;
    }
    order.push_back(value);
    while order.len() > capacity {
        if let Some(old) = order.pop_front() {
            set.remove(&old);
        }
    }
    true
}

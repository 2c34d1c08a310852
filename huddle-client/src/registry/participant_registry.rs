use huddle_core::{Participant, ParticipantId, RemoteMediaState};
use std::collections::BTreeMap;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    Joined(Participant),
    Left(Participant),
}

/// Local view of who else is in the room.
///
/// Owned by the call session task; every mutation happens there.
#[derive(Debug)]
pub struct ParticipantRegistry {
    local_id: ParticipantId,
    participants: BTreeMap<ParticipantId, Participant>,
}

impl ParticipantRegistry {
    pub fn new(local_id: ParticipantId) -> Self {
        Self {
            local_id,
            participants: BTreeMap::new(),
        }
    }

    /// Insert or refresh a participant. Returns `Joined` only the first time.
    /// The local participant is never tracked.
    pub fn upsert(&mut self, participant: Participant) -> Option<RegistryEvent> {
        if participant.id == self.local_id {
            return None;
        }

        if let Some(existing) = self.participants.get_mut(&participant.id) {
            if existing.display_name != participant.display_name
                && participant.display_name != participant.id.as_str()
            {
                debug!(
                    "Participant {} renamed to {}",
                    participant.id, participant.display_name
                );
                existing.display_name = participant.display_name;
            }
            return None;
        }

        info!(
            "Participant joined: {} ({})",
            participant.display_name, participant.id
        );
        self.participants
            .insert(participant.id.clone(), participant.clone());
        Some(RegistryEvent::Joined(participant))
    }

    pub fn remove(&mut self, id: &ParticipantId) -> Option<RegistryEvent> {
        let participant = self.participants.remove(id)?;
        info!(
            "Participant left: {} ({})",
            participant.display_name, participant.id
        );
        Some(RegistryEvent::Left(participant))
    }

    /// Bring the registry in line with a full membership list from the relay.
    pub fn reconcile(&mut self, members: Vec<Participant>) -> Vec<RegistryEvent> {
        let present: Vec<ParticipantId> = members.iter().map(|p| p.id.clone()).collect();

        let mut events: Vec<RegistryEvent> =
            members.into_iter().filter_map(|p| self.upsert(p)).collect();

        let gone: Vec<ParticipantId> = self
            .participants
            .keys()
            .filter(|id| !present.contains(id))
            .cloned()
            .collect();
        events.extend(gone.iter().filter_map(|id| self.remove(id)));

        events
    }

    pub fn update_media(
        &mut self,
        id: &ParticipantId,
        update: impl FnOnce(&mut RemoteMediaState),
    ) -> Option<Participant> {
        let participant = self.participants.get_mut(id)?;
        update(&mut participant.media);
        Some(participant.clone())
    }

    pub fn get(&self, id: &ParticipantId) -> Option<&Participant> {
        self.participants.get(id)
    }

    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.participants.contains_key(id)
    }

    pub fn list(&self) -> Vec<Participant> {
        self.participants.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}

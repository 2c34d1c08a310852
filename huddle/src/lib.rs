pub use huddle_core::model::{Participant, ParticipantId, RoomId};

pub mod model {
    pub use huddle_core::model::*;
}

#[cfg(feature = "relay")]
pub mod relay {
    pub use huddle_relay::*;
}

#[cfg(feature = "client")]
pub mod client {
    pub use huddle_client::*;
}

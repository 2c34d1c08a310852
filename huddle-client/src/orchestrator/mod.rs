mod peer_link;
mod peer_orchestrator;

pub use peer_link::*;
pub use peer_orchestrator::*;

mod http_relay;
mod outbox;
mod poller;
mod relay_channel;
mod signal_inbox;
mod signal_output;

pub use http_relay::*;
pub use outbox::*;
pub(crate) use poller::*;
pub use relay_channel::*;
pub use signal_inbox::*;
pub use signal_output::*;

mod call;
mod config;
mod error;
mod media;
mod orchestrator;
mod registry;
mod relay;
mod transport;

pub use call::*;
pub use config::*;
pub use error::*;
pub use media::*;
pub use orchestrator::*;
pub use registry::*;
pub use relay::*;
pub use transport::*;

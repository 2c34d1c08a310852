use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_RELAY_PORT: u16 = 5000;

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub addr: SocketAddr,
    pub max_participants: usize,
    /// Signals kept per room; older ones are dropped first.
    pub retention: usize,
    /// Members that have not polled for this long are evicted.
    pub stale_after: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_RELAY_PORT)),
            max_participants: 8,
            retention: 1024,
            stale_after: Duration::from_secs(30),
        }
    }
}

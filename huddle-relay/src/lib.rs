mod config;
mod error;
mod http;
mod room;

pub use config::*;
pub use error::*;
pub use http::*;
pub use room::*;

use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// A relay listening on a bound address.
pub struct RunningRelay {
    pub addr: SocketAddr,
    pub rooms: RelayRooms,
    pub handle: JoinHandle<()>,
}

impl RunningRelay {
    /// Base URL clients should be configured with.
    pub fn base_url(&self) -> String {
        format!("http://{}{}", self.addr, API_BASE)
    }

    pub fn shutdown(self) {
        self.handle.abort();
    }
}

/// Bind and serve until the task is aborted.
pub async fn spawn(config: RelayConfig) -> anyhow::Result<RunningRelay> {
    let listener = TcpListener::bind(config.addr).await?;
    let addr = listener.local_addr()?;
    let rooms = RelayRooms::new(config);
    let app = router(rooms.clone());
    let sweeper = spawn_sweeper(rooms.clone());

    info!("Relay listening on {}", addr);
    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Relay server stopped: {}", e);
        }
        sweeper.abort();
    });

    Ok(RunningRelay {
        addr,
        rooms,
        handle,
    })
}

/// Serve in the foreground.
pub async fn serve(config: RelayConfig) -> anyhow::Result<()> {
    let relay = spawn(config).await?;
    relay.handle.await?;
    Ok(())
}

fn spawn_sweeper(rooms: RelayRooms) -> JoinHandle<()> {
    let period = (rooms.config().stale_after / 2).max(std::time::Duration::from_millis(100));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let evicted = rooms.sweep();
            if evicted > 0 {
                info!("Evicted {} stale member(s)", evicted);
            }
        }
    })
}

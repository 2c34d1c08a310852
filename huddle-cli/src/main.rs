use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use colored::*;
use huddle_relay::{DEFAULT_RELAY_PORT, RelayConfig};
use std::net::SocketAddr;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "huddle")]
#[command(bin_name = "huddle")]
#[command(about = "Signaling relay for small mesh calls")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the store-and-poll signaling relay.
    Relay {
        #[arg(long, default_value_t = SocketAddr::from(([0, 0, 0, 0], DEFAULT_RELAY_PORT)))]
        addr: SocketAddr,

        #[arg(long, default_value_t = 8)]
        max_participants: usize,

        /// Signals kept per room.
        #[arg(long, default_value_t = 1024)]
        retention: usize,

        /// Evict members that have not polled for this many seconds.
        #[arg(long, default_value_t = 30)]
        stale_after_secs: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Commands::Relay {
            addr,
            max_participants,
            retention,
            stale_after_secs,
        } => {
            if max_participants == 0 {
                bail!("--max-participants must be at least 1");
            }
            if retention == 0 {
                bail!("--retention must be at least 1");
            }

            let config = RelayConfig {
                addr,
                max_participants,
                retention,
                stale_after: Duration::from_secs(stale_after_secs),
            };

            println!("{}", "📡 Starting Huddle relay...".green().bold());
            println!("   🔌 Listening:    {}", addr);
            println!("   👥 Room size:    {}", max_participants);
            println!("   🧹 Stale after:  {}s", stale_after_secs);

            huddle_relay::serve(config).await?;
        }
    }

    Ok(())
}

//! # beamcast-server
//!
//! Signaling and room-coordination server for Beamcast, a peer-to-peer
//! screen-streaming product.
//!
//! This binary provides:
//! - **WebSocket signaling** that routes the handshake (offers, answers,
//!   trickle-ICE candidates) between a broadcaster and a viewer
//! - **Private rooms** admitted by shared key (only a BLAKE3 digest of the
//!   key is ever kept)
//! - **Room lifecycle** with a hard cap on concurrent rooms and deferred
//!   cleanup of empty rooms
//! - **Text chat relay** between the two participants of a room
//!
//! Media never touches this process; the peers stream directly to each
//! other once the handshake completes.

mod config;
mod hub;
mod room;
mod session;
mod ws;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;
use crate::hub::Hub;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,beamcast_server=debug")),
        )
        .init();

    info!("Starting Beamcast signaling server v{}", env!("CARGO_PKG_VERSION"));

    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    let hub = Hub::new(config);

    // tokio::select! ensures that if either the server or a shutdown signal
    // arrives, we exit cleanly. Rooms are in-memory only and die with the
    // process.
    tokio::select! {
        result = ws::serve(hub) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}

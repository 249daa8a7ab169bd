//! # boardhubd
//!
//! Composition root that wires the hub together and starts the server.
//!
//! ## Responsibilities
//! - Parse configuration (TOML file, env vars)
//! - Initialize tracing
//! - Construct the event bus, presence store, and hub
//! - Build the axum router, injecting the hub
//! - Bind to a TCP port and serve
//! - Handle graceful shutdown (SIGINT)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer; no domain logic belongs here.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use boardhub_adapter_ws_axum::router;
use boardhub_adapter_ws_axum::state::AppState;
use boardhub_app::event_bus::RoomBus;
use boardhub_app::hub::BoardHub;
use boardhub_app::presence::InMemoryPresenceStore;

mod config;

use config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.logging.filter)?)
        .init();

    // Hub
    let bus = Arc::new(RoomBus::new(config.hub.bus_capacity));
    let hub = Arc::new(BoardHub::new(InMemoryPresenceStore::new(), bus));

    // HTTP/WebSocket
    let app = router::build(AppState::new(hub));

    let bind_addr = config.bind_addr();
    tracing::info!(%bind_addr, "boardhubd listening");

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}

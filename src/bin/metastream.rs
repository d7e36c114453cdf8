//! MetaStream control application
//!
//! Wires capture devices, the source list and the streaming lifecycle
//! together and serves the control surface over HTTP.

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use metastream_control::{
    config::AppConfig,
    events::EventBus,
    media::{BroadcastSlot, DeviceAccess, HostDevices, MediaRegistry, SyntheticDevices},
    protocol::StreamStatus,
    sources::{default_sources, SourceManager},
    storage::{KeyStore, LocalStore},
    streaming::{
        AdvancedPlatforms, HttpRelayClient, PlatformConfigStep, StandardPlatforms,
        StreamingController,
    },
    ui::{AppState, WebServer},
};

/// Build every component from the loaded config
fn build_state(config: &AppConfig) -> metastream_control::Result<Arc<AppState>> {
    let store = Arc::new(LocalStore::open(config.storage_path())?);
    tracing::info!("Local store at {}", config.storage_path().display());

    let devices = Arc::new(HostDevices::new(SyntheticDevices::new(config.devices.clone())));
    let registry = MediaRegistry::shared();
    let events = EventBus::new();
    let access = DeviceAccess::new(devices, registry);
    let sources = Arc::new(SourceManager::new(access, events.clone(), default_sources()));

    let keys = KeyStore::new(store);
    let broadcast = Arc::new(BroadcastSlot::new());
    let relay = Arc::new(HttpRelayClient::new(&config.relay)?);
    tracing::info!("Relay server: {}", config.relay.url);

    let platforms: Box<dyn PlatformConfigStep> = if config.platforms.advanced {
        Box::new(AdvancedPlatforms)
    } else {
        Box::new(StandardPlatforms)
    };

    let controller = Arc::new(StreamingController::new(
        sources.clone(),
        keys.clone(),
        broadcast.clone(),
        relay,
        platforms,
        events.clone(),
        config.stats.interval(),
    ));

    Ok(Arc::new(AppState {
        sources,
        controller,
        keys,
        broadcast,
        events,
        started_at: Instant::now(),
    }))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting MetaStream control");

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = AppConfig::load(config_path.as_deref())?;
    let state = build_state(&config)?;

    // List available devices
    println!("\n=== Available Capture Devices ===");
    for device in state.sources.list_devices().await {
        let default_marker = if device.is_default { " [DEFAULT]" } else { "" };
        println!("  {} ({:?}){}", device.label, device.kind, default_marker);
        println!("    ID: {}", device.device_id);
    }
    println!();

    let controller = state.controller.clone();
    let web_server = WebServer::new(config.ui.clone(), state);
    tracing::info!("Web UI available at http://{}", web_server.address());

    tokio::select! {
        result = web_server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down");
        }
    }

    if controller.status() == StreamStatus::Live {
        controller.stop_stream().await?;
    }
    Ok(())
}

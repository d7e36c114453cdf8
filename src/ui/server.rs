//! Control surface HTTP server

use axum::{
    routing::{delete, get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;

use crate::config::UiConfig;
use crate::events::EventBus;
use crate::media::BroadcastSlot;
use crate::sources::SourceManager;
use crate::storage::KeyStore;
use crate::streaming::StreamingController;
use crate::ui::{handlers, websocket};

/// Shared state for every handler
pub struct AppState {
    pub sources: Arc<SourceManager>,
    pub controller: Arc<StreamingController>,
    pub keys: KeyStore,
    pub broadcast: Arc<BroadcastSlot>,
    pub events: EventBus,
    pub started_at: Instant,
}

pub struct WebServer {
    config: UiConfig,
    state: Arc<AppState>,
}

impl WebServer {
    pub fn new(config: UiConfig, state: Arc<AppState>) -> Self {
        Self { config, state }
    }

    pub fn router(state: Arc<AppState>) -> Router {
        Router::new()
            .route("/api/status", get(handlers::get_status))
            .route("/api/devices", get(handlers::get_devices))
            .route("/api/sources", get(handlers::get_sources).post(handlers::add_source))
            .route("/api/sources/:id", delete(handlers::remove_source))
            .route("/api/sources/:id/toggle", post(handlers::toggle_source))
            .route("/api/broadcast", post(handlers::prepare_broadcast))
            .route("/api/stream/start", post(handlers::start_stream))
            .route("/api/stream/stop", post(handlers::stop_stream))
            .route("/api/stream/test", post(handlers::test_stream))
            .route("/api/recording/start", post(handlers::start_recording))
            .route("/api/recording/stop", post(handlers::stop_recording))
            .route("/api/stats", get(handlers::get_stats))
            .route(
                "/api/stream-keys",
                get(handlers::get_stream_keys).put(handlers::put_stream_keys),
            )
            .route("/ws", get(websocket::ws_handler))
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.config.bind_address, self.config.http_port)
    }

    /// Serve until the listener fails
    pub async fn run(self) -> std::io::Result<()> {
        let addr: SocketAddr = self
            .address()
            .parse()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Control surface listening on http://{}", addr);
        axum::serve(listener, Self::router(self.state)).await
    }
}

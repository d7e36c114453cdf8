//! Streaming lifecycle controller
//!
//! ```text
//!            start_stream                 start_recording
//!   Live  ◄─────────────── Offline ───────────────────► Recording
//!         ───────────────►         ◄───────────────────
//!            stop_stream                  stop_recording
//! ```
//!
//! There is no direct Live ↔ Recording edge. Every refused request leaves
//! the status unchanged and is reported with a destructive notice.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::error::StreamError;
use crate::events::EventBus;
use crate::media::{BroadcastSlot, MediaRegistry};
use crate::protocol::{ControlEvent, Notice, StreamStats, StreamStatus};
use crate::sources::SourceManager;
use crate::storage::KeyStore;
use crate::streaming::platforms::PlatformConfigStep;
use crate::streaming::preconditions::{
    check_start, check_test, rejection_notice, start_warnings, StartInputs, StartPlan,
};
use crate::streaming::relay::RelayClient;
use crate::streaming::stats::StatsSimulator;

/// Point-in-time view of the lifecycle
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamSnapshot {
    pub status: StreamStatus,
    pub since: Option<DateTime<Utc>>,
    pub preview_available: bool,
    pub stats: Option<StreamStats>,
}

pub struct StreamingController {
    sources: Arc<SourceManager>,
    keys: KeyStore,
    broadcast: Arc<BroadcastSlot>,
    relay: Arc<dyn RelayClient>,
    platforms: Box<dyn PlatformConfigStep>,
    stats: StatsSimulator,
    events: EventBus,
    status: RwLock<(StreamStatus, Option<DateTime<Utc>>)>,
    lifecycle: tokio::sync::Mutex<()>,
}

impl StreamingController {
    pub fn new(
        sources: Arc<SourceManager>,
        keys: KeyStore,
        broadcast: Arc<BroadcastSlot>,
        relay: Arc<dyn RelayClient>,
        platforms: Box<dyn PlatformConfigStep>,
        events: EventBus,
        stats_period: Duration,
    ) -> Self {
        let stats =
            StatsSimulator::new(Arc::clone(sources.registry()), events.clone(), stats_period);
        Self {
            sources,
            keys,
            broadcast,
            relay,
            platforms,
            stats,
            events,
            status: RwLock::new((StreamStatus::Offline, None)),
            lifecycle: tokio::sync::Mutex::new(()),
        }
    }

    pub fn status(&self) -> StreamStatus {
        self.status.read().0
    }

    pub fn stats(&self) -> StreamStats {
        self.stats.current()
    }

    pub fn stats_running(&self) -> bool {
        self.stats.is_running()
    }

    pub fn snapshot(&self) -> StreamSnapshot {
        let (status, since) = *self.status.read();
        StreamSnapshot {
            status,
            since,
            preview_available: self.sources.preview_available(),
            stats: (status == StreamStatus::Live).then(|| self.stats.current()),
        }
    }

    fn registry(&self) -> &MediaRegistry {
        self.sources.registry()
    }

    fn set_status(&self, status: StreamStatus) {
        let since = (status != StreamStatus::Offline).then(Utc::now);
        *self.status.write() = (status, since);
        tracing::info!(%status, "stream status changed");
        self.events.publish(ControlEvent::StatusChanged { status });
    }

    fn reject<T>(&self, err: StreamError) -> Result<T, StreamError> {
        self.events.notify(rejection_notice(&err));
        Err(err)
    }

    fn listed_video(&self) -> bool {
        self.sources
            .sources()
            .iter()
            .any(|s| s.active && s.kind.is_video_capable())
    }

    /// Go live: local checks, relay probe, then one relay start call.
    ///
    /// The status only becomes live after the relay accepts the stream.
    pub async fn start_stream(&self) -> Result<StartPlan, StreamError> {
        let _lifecycle = self.lifecycle.lock().await;

        let current = self.status();
        if current != StreamStatus::Offline {
            return self.reject(StreamError::InvalidTransition {
                from: current,
                to: StreamStatus::Live,
            });
        }

        let (keys, storage_error) = match self.keys.load() {
            Ok(keys) => (keys, None),
            Err(e) => (Vec::new(), Some(e.to_string())),
        };

        let inputs = StartInputs {
            listed_video: self.listed_video(),
            registered_video: self.registry().has_live_video(),
            has_audio: self.sources.has_active_audio_source(),
            keys: &keys,
            broadcast_ready: self.broadcast.is_ready(),
        };
        // Warnings go out as soon as their check runs, even if a later one fails
        for warning in start_warnings(&inputs) {
            self.events.notify(warning.notice());
        }
        // An unreadable key list surfaces where the key check would fail
        let plan = match (check_start(&inputs), storage_error) {
            (Ok(plan), _) => plan,
            (Err(StreamError::NoStreamKeys), Some(reason)) => {
                return self.reject(StreamError::StorageRead(reason));
            }
            (Err(err), _) => return self.reject(err),
        };

        if !self.relay.check_availability().await {
            return self.reject(StreamError::RelayUnavailable);
        }

        let Some(stream) = self.broadcast.get() else {
            return self.reject(StreamError::NoBroadcastStream);
        };
        let targets = self.platforms.process(&keys);
        tracing::info!(targets = targets.len(), stream_id = stream.id(), "starting relay stream");

        match self.relay.start_relay_stream(&stream, &targets).await {
            Ok(reply) if reply.success => {
                tracing::info!(session_id = ?reply.session_id, "relay accepted stream");
                self.set_status(StreamStatus::Live);
                self.stats.simulate_stats_change(StreamStatus::Live);
                self.events.notify(Notice::info(
                    "You're Live!",
                    format!("Streaming to {} platform(s)", targets.len()),
                ));
                Ok(plan)
            }
            Ok(reply) => self.reject(StreamError::RelayRejected(
                reply
                    .error
                    .unwrap_or_else(|| "The relay server refused the stream".to_string()),
            )),
            Err(e) => self.reject(StreamError::RelayRejected(e.to_string())),
        }
    }

    /// End the live session. Once live, always lands offline whatever the
    /// relay says.
    pub async fn stop_stream(&self) -> Result<(), StreamError> {
        let _lifecycle = self.lifecycle.lock().await;
        let current = self.status();
        if current != StreamStatus::Live {
            return self.reject(StreamError::InvalidTransition {
                from: current,
                to: StreamStatus::Offline,
            });
        }

        if let Err(e) = self.relay.stop_relay_stream().await {
            tracing::error!("Failed to stop relay stream: {}", e);
        }
        self.stats.stop();
        self.set_status(StreamStatus::Offline);
        self.events
            .notify(Notice::info("Stream Ended", "Your stream has been stopped"));
        Ok(())
    }

    /// Dry run: video source, key list and relay reachability. Never
    /// changes the status.
    pub async fn test_stream(&self) -> Result<(), StreamError> {
        let keys = match self.keys.load() {
            Ok(keys) => keys,
            Err(e) => return self.reject(StreamError::StorageRead(e.to_string())),
        };
        if let Err(err) = check_test(self.listed_video(), self.registry().has_live_video(), &keys) {
            return self.reject(err);
        }

        if !self.relay.check_availability().await {
            self.events.notify(Notice::destructive(
                "Relay Test Failed",
                "The relay server did not respond. Streaming will not work until it is reachable.",
            ));
            return Err(StreamError::RelayUnavailable);
        }

        self.events.notify(Notice::info(
            "Relay Test Successful",
            format!("Relay server is reachable; {} platform(s) configured", keys.len()),
        ));
        Ok(())
    }

    pub async fn start_recording(&self) -> Result<(), StreamError> {
        let _lifecycle = self.lifecycle.lock().await;
        let current = self.status();
        if current != StreamStatus::Offline {
            return self.reject(StreamError::InvalidTransition {
                from: current,
                to: StreamStatus::Recording,
            });
        }
        self.set_status(StreamStatus::Recording);
        self.events
            .notify(Notice::info("Recording Started", "Your session is being recorded"));
        Ok(())
    }

    pub async fn stop_recording(&self) -> Result<(), StreamError> {
        let _lifecycle = self.lifecycle.lock().await;
        let current = self.status();
        if current != StreamStatus::Recording {
            return self.reject(StreamError::InvalidTransition {
                from: current,
                to: StreamStatus::Offline,
            });
        }
        self.set_status(StreamStatus::Offline);
        self.events
            .notify(Notice::info("Recording Stopped", "Your recording has been saved"));
        Ok(())
    }
}

//! Relay server client
//!
//! The relay forwards the broadcast to RTMP destinations. This side only
//! probes its health and asks it to start or stop a session.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::media::stream::{MediaStream, TrackKind, TrackSettings};
use crate::protocol::RelayTarget;

/// Reply to a start request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayStartResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackDescriptor {
    pub id: String,
    pub kind: TrackKind,
    pub label: String,
    pub settings: TrackSettings,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest<'a> {
    pub stream_id: &'a str,
    pub tracks: Vec<TrackDescriptor>,
    pub platforms: &'a [RelayTarget],
}

impl<'a> StartRequest<'a> {
    pub fn new(stream: &'a MediaStream, platforms: &'a [RelayTarget]) -> Self {
        let tracks = stream
            .tracks()
            .iter()
            .filter(|t| t.is_live())
            .map(|t| TrackDescriptor {
                id: t.id().to_string(),
                kind: t.kind(),
                label: t.label().to_string(),
                settings: t.settings().clone(),
            })
            .collect();
        Self {
            stream_id: stream.id(),
            tracks,
            platforms,
        }
    }
}

#[async_trait]
pub trait RelayClient: Send + Sync {
    /// One health probe; unreachable, slow or unhealthy all read as false
    async fn check_availability(&self) -> bool;

    async fn start_relay_stream(
        &self,
        stream: &MediaStream,
        platforms: &[RelayTarget],
    ) -> Result<RelayStartResponse, RelayError>;

    async fn stop_relay_stream(&self) -> Result<(), RelayError>;
}

pub struct HttpRelayClient {
    client: reqwest::Client,
    base_url: String,
    health_timeout: Duration,
    session_id: Mutex<Option<String>>,
}

impl HttpRelayClient {
    pub fn new(config: &RelayConfig) -> Result<Self, RelayError> {
        let health_timeout = Duration::try_from_secs_f64(config.health_timeout_secs).map_err(|e| {
            RelayError::InvalidConfig(format!(
                "health_timeout_secs = {}: {}",
                config.health_timeout_secs, e
            ))
        })?;
        let client = reqwest::Client::builder()
            .user_agent(concat!("MetaStream/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            health_timeout,
            session_id: Mutex::new(None),
        })
    }

    pub fn session_id(&self) -> Option<String> {
        self.session_id.lock().clone()
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl RelayClient for HttpRelayClient {
    async fn check_availability(&self) -> bool {
        let result = self
            .client
            .get(self.endpoint("/health"))
            .timeout(self.health_timeout)
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                tracing::warn!(status = resp.status().as_u16(), "relay health check failed");
                false
            }
            Err(e) => {
                tracing::warn!(timeout = e.is_timeout(), "relay unreachable: {}", e);
                false
            }
        }
    }

    async fn start_relay_stream(
        &self,
        stream: &MediaStream,
        platforms: &[RelayTarget],
    ) -> Result<RelayStartResponse, RelayError> {
        let body = StartRequest::new(stream, platforms);
        let resp = self
            .client
            .post(self.endpoint("/api/stream/start"))
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(RelayError::Status(resp.status().as_u16()));
        }

        let reply: RelayStartResponse = resp.json().await?;
        if reply.success {
            *self.session_id.lock() = reply.session_id.clone();
        }
        Ok(reply)
    }

    async fn stop_relay_stream(&self) -> Result<(), RelayError> {
        let session_id = self.session_id.lock().take();
        let resp = self
            .client
            .post(self.endpoint("/api/stream/stop"))
            .json(&serde_json::json!({ "sessionId": session_id }))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(RelayError::Status(resp.status().as_u16()));
        }
        Ok(())
    }
}

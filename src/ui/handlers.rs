//! HTTP API handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::error::{SourceError, StreamError};
use crate::media::compose_from_registry;
use crate::protocol::{MediaDeviceInfo, PlatformKey, StreamStats, StreamStatus};
use crate::sources::{NewSource, Source};
use crate::streaming::preconditions::StartWarning;
use crate::streaming::StreamSnapshot;
use crate::ui::server::AppState;

/// API response wrapper
#[derive(serde::Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

type ApiResult<T> = (StatusCode, Json<ApiResponse<T>>);

fn ok<T>(data: T) -> ApiResult<T> {
    (StatusCode::OK, Json(ApiResponse::ok(data)))
}

fn fail<T>(status: StatusCode, msg: impl Into<String>) -> ApiResult<T> {
    (status, Json(ApiResponse::error(msg)))
}

fn source_status(err: &SourceError) -> StatusCode {
    match err {
        SourceError::NotFound(_) => StatusCode::NOT_FOUND,
        SourceError::TogglePending(_) => StatusCode::CONFLICT,
        SourceError::Activation(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn stream_status(err: &StreamError) -> StatusCode {
    match err {
        StreamError::InvalidTransition { .. } => StatusCode::CONFLICT,
        StreamError::RelayUnavailable | StreamError::RelayRejected(_) => StatusCode::BAD_GATEWAY,
        StreamError::StorageRead(_) => StatusCode::INTERNAL_SERVER_ERROR,
        StreamError::NoVideoSource | StreamError::NoStreamKeys | StreamError::NoBroadcastStream => {
            StatusCode::PRECONDITION_FAILED
        }
    }
}

/// System status
#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    #[serde(flatten)]
    pub stream: StreamSnapshot,
    pub source_count: usize,
    pub active_streams: Vec<String>,
    pub broadcast_ready: bool,
    pub uptime_seconds: u64,
}

/// Get system status
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<ApiResponse<SystemStatus>> {
    let status = SystemStatus {
        stream: state.controller.snapshot(),
        source_count: state.sources.source_count(),
        active_streams: state
            .sources
            .registry()
            .get_all_active_streams()
            .keys()
            .map(|slot| slot.to_string())
            .collect(),
        broadcast_ready: state.broadcast.is_ready(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    };

    Json(ApiResponse::ok(status))
}

/// Get available capture devices
pub async fn get_devices(
    State(state): State<Arc<AppState>>,
) -> Json<ApiResponse<Vec<MediaDeviceInfo>>> {
    Json(ApiResponse::ok(state.sources.list_devices().await))
}

/// Get all sources
pub async fn get_sources(State(state): State<Arc<AppState>>) -> Json<ApiResponse<Vec<Source>>> {
    Json(ApiResponse::ok(state.sources.sources()))
}

/// Add a source
pub async fn add_source(
    State(state): State<Arc<AppState>>,
    Json(new): Json<NewSource>,
) -> ApiResult<Source> {
    if new.name.trim().is_empty() {
        return fail(StatusCode::BAD_REQUEST, "Source name must not be empty");
    }
    let source = state.sources.add_source(new);
    (StatusCode::CREATED, Json(ApiResponse::ok(source)))
}

/// Delete a source
pub async fn remove_source(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u32>,
) -> ApiResult<Source> {
    match state.sources.remove_source(id) {
        Ok(source) => ok(source),
        Err(e) => fail(source_status(&e), e.to_string()),
    }
}

/// Flip a source on or off
pub async fn toggle_source(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u32>,
) -> ApiResult<Vec<Source>> {
    match state.sources.toggle_source_active(id).await {
        Ok(sources) => ok(sources),
        Err(e) => fail(source_status(&e), e.to_string()),
    }
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastInfo {
    pub stream_id: String,
    pub video_tracks: usize,
    pub audio_tracks: usize,
}

/// Compose the broadcast stream from whatever is currently captured
pub async fn prepare_broadcast(State(state): State<Arc<AppState>>) -> ApiResult<BroadcastInfo> {
    match compose_from_registry(state.sources.registry()) {
        Some(stream) => {
            let info = BroadcastInfo {
                stream_id: stream.id().to_string(),
                video_tracks: stream.video_tracks().count(),
                audio_tracks: stream.audio_tracks().count(),
            };
            state.broadcast.set(stream);
            ok(info)
        }
        None => {
            state.broadcast.clear();
            fail(StatusCode::PRECONDITION_FAILED, "No active capture streams")
        }
    }
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResult {
    pub status: StreamStatus,
    pub warnings: Vec<String>,
}

/// Go live
pub async fn start_stream(State(state): State<Arc<AppState>>) -> ApiResult<StartResult> {
    match state.controller.start_stream().await {
        Ok(plan) => ok(StartResult {
            status: state.controller.status(),
            warnings: plan
                .warnings
                .iter()
                .map(|w| match w {
                    StartWarning::NoAudio => "no-audio".to_string(),
                })
                .collect(),
        }),
        Err(e) => fail(stream_status(&e), e.to_string()),
    }
}

/// End the live session
pub async fn stop_stream(State(state): State<Arc<AppState>>) -> ApiResult<StreamStatus> {
    match state.controller.stop_stream().await {
        Ok(()) => ok(state.controller.status()),
        Err(e) => fail(stream_status(&e), e.to_string()),
    }
}

/// Dry run against the relay
pub async fn test_stream(State(state): State<Arc<AppState>>) -> ApiResult<()> {
    match state.controller.test_stream().await {
        Ok(()) => ok(()),
        Err(e) => fail(stream_status(&e), e.to_string()),
    }
}

pub async fn start_recording(State(state): State<Arc<AppState>>) -> ApiResult<StreamStatus> {
    match state.controller.start_recording().await {
        Ok(()) => ok(state.controller.status()),
        Err(e) => fail(stream_status(&e), e.to_string()),
    }
}

pub async fn stop_recording(State(state): State<Arc<AppState>>) -> ApiResult<StreamStatus> {
    match state.controller.stop_recording().await {
        Ok(()) => ok(state.controller.status()),
        Err(e) => fail(stream_status(&e), e.to_string()),
    }
}

/// Latest simulated stats
pub async fn get_stats(State(state): State<Arc<AppState>>) -> ApiResult<StreamStats> {
    if state.controller.status() != StreamStatus::Live {
        return fail(StatusCode::CONFLICT, "Stream is not live");
    }
    ok(state.controller.stats())
}

pub async fn get_stream_keys(State(state): State<Arc<AppState>>) -> ApiResult<Vec<PlatformKey>> {
    match state.keys.load() {
        Ok(keys) => ok(keys),
        Err(e) => fail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// Replace the persisted key list
pub async fn put_stream_keys(
    State(state): State<Arc<AppState>>,
    Json(keys): Json<Vec<PlatformKey>>,
) -> ApiResult<usize> {
    match state.keys.save(&keys) {
        Ok(()) => ok(keys.len()),
        Err(e) => fail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

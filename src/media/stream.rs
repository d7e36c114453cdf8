//! Captured media streams and their tracks

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackState {
    Live,
    Ended,
}

/// Negotiated track settings (the `getSettings()` view)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_rate: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_count: Option<u16>,
}

impl TrackSettings {
    pub fn video(width: u32, height: u32, frame_rate: f32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            frame_rate: Some(frame_rate),
            ..Default::default()
        }
    }

    pub fn audio(sample_rate: u32, channel_count: u16) -> Self {
        Self {
            sample_rate: Some(sample_rate),
            channel_count: Some(channel_count),
            ..Default::default()
        }
    }
}

/// A single audio or video track.
///
/// Clones share the same lifecycle: stopping one clone ends them all, the
/// same way a browser track object is shared between streams.
#[derive(Debug, Clone)]
pub struct MediaTrack {
    id: String,
    kind: TrackKind,
    label: String,
    settings: TrackSettings,
    state: Arc<watch::Sender<TrackState>>,
}

impl MediaTrack {
    pub fn new(kind: TrackKind, label: impl Into<String>, settings: TrackSettings) -> Self {
        let (state, _) = watch::channel(TrackState::Live);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            label: label.into(),
            settings,
            state: Arc::new(state),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn settings(&self) -> &TrackSettings {
        &self.settings
    }

    pub fn ready_state(&self) -> TrackState {
        *self.state.borrow()
    }

    pub fn is_live(&self) -> bool {
        self.ready_state() == TrackState::Live
    }

    /// Stop the track from our side
    pub fn stop(&self) {
        self.state.send_replace(TrackState::Ended);
    }

    /// Signal that the device ended the track on its own, e.g. the
    /// platform's "stop sharing" control was used
    pub fn end(&self) {
        self.state.send_replace(TrackState::Ended);
    }

    /// Resolves once the track has ended
    pub async fn ended(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives in self, so the channel cannot close under us
        let _ = rx.wait_for(|s| *s == TrackState::Ended).await;
    }
}

/// A set of tracks captured together
#[derive(Debug, Clone)]
pub struct MediaStream {
    id: String,
    tracks: Vec<MediaTrack>,
}

impl MediaStream {
    pub fn new(tracks: Vec<MediaTrack>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tracks,
        }
    }

    /// Build a new stream carrying the tracks of several streams
    pub fn compose<'a>(streams: impl IntoIterator<Item = &'a MediaStream>) -> Self {
        let tracks = streams
            .into_iter()
            .flat_map(|s| s.tracks.iter().cloned())
            .collect();
        Self::new(tracks)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tracks(&self) -> &[MediaTrack] {
        &self.tracks
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn video_tracks(&self) -> impl Iterator<Item = &MediaTrack> {
        self.tracks.iter().filter(|t| t.kind() == TrackKind::Video)
    }

    pub fn audio_tracks(&self) -> impl Iterator<Item = &MediaTrack> {
        self.tracks.iter().filter(|t| t.kind() == TrackKind::Audio)
    }

    pub fn has_live_video(&self) -> bool {
        self.video_tracks().any(MediaTrack::is_live)
    }

    pub fn stop_all(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }
}

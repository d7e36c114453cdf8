//! Shared data types exchanged between the core and the control surface

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of capture input a source represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Camera,
    Display,
    Audio,
    Vr,
    Media,
}

impl SourceKind {
    /// Registry slot backing this kind, if it captures from a device
    pub fn slot(self) -> Option<Slot> {
        match self {
            Self::Camera => Some(Slot::Camera),
            Self::Display => Some(Slot::Display),
            Self::Audio => Some(Slot::Audio),
            Self::Vr | Self::Media => None,
        }
    }

    /// Whether an active source of this kind can feed the preview
    pub fn is_video_capable(self) -> bool {
        matches!(self, Self::Camera | Self::Display)
    }

    pub(crate) fn device_noun(self) -> &'static str {
        match self {
            Self::Camera => "camera",
            Self::Display => "screen capture",
            Self::Audio => "microphone",
            Self::Vr => "VR headset",
            Self::Media => "media source",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Camera => "camera",
            Self::Display => "display",
            Self::Audio => "audio",
            Self::Vr => "vr",
            Self::Media => "media",
        };
        f.write_str(name)
    }
}

/// Logical registry slot holding one live capture stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    Camera,
    Audio,
    Display,
}

impl Slot {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Camera => "camera",
            Self::Audio => "audio",
            Self::Display => "display",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Streaming lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamStatus {
    #[default]
    Offline,
    Live,
    Recording,
}

impl fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Offline => "offline",
            Self::Live => "live",
            Self::Recording => "recording",
        };
        f.write_str(name)
    }
}

/// Resolution bucket reported by the stats simulator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Resolution {
    #[serde(rename = "480p")]
    P480,
    #[default]
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "1080p")]
    P1080,
}

impl Resolution {
    /// Bucket a negotiated video width
    pub fn from_width(width: Option<u32>) -> Self {
        match width {
            None => Self::P720,
            Some(w) if w >= 1920 => Self::P1080,
            Some(w) if w >= 1280 => Self::P720,
            Some(_) => Self::P480,
        }
    }

    /// Baseline encoder bitrate in kbps
    pub fn base_bitrate_kbps(self) -> u32 {
        match self {
            Self::P480 => 2500,
            Self::P720 => 4500,
            Self::P1080 => 6000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Health {
    #[default]
    Good,
    Warning,
}

/// Synthetic stream statistics shown while live
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamStats {
    pub bitrate_kbps: u32,
    pub cpu_percent: f32,
    pub ram_gb: f32,
    pub viewers: u32,
    pub resolution: Resolution,
    pub health: Health,
    pub uptime_secs: u64,
    /// Number of simulator ticks in this session
    pub ticks: u64,
    pub updated_at: DateTime<Utc>,
}

impl Default for StreamStats {
    fn default() -> Self {
        Self {
            bitrate_kbps: 0,
            cpu_percent: 0.0,
            ram_gb: 0.0,
            viewers: 0,
            resolution: Resolution::default(),
            health: Health::default(),
            uptime_secs: 0,
            ticks: 0,
            updated_at: Utc::now(),
        }
    }
}

/// Extra per-platform settings used by advanced keys
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomConfig {
    /// Replaces the platform's ingest URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,
    /// Proxy the relay should dial through
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    #[serde(flatten)]
    pub options: serde_json::Map<String, serde_json::Value>,
}

/// Persisted destination for a platform (`localStorage["streamKeys"]` entry)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformKey {
    pub platform: String,
    pub rtmp_url: String,
    pub stream_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_advanced: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_config: Option<CustomConfig>,
}

impl PlatformKey {
    pub fn new(
        platform: impl Into<String>,
        rtmp_url: impl Into<String>,
        stream_key: impl Into<String>,
    ) -> Self {
        Self {
            platform: platform.into(),
            rtmp_url: rtmp_url.into(),
            stream_key: stream_key.into(),
            is_advanced: None,
            custom_config: None,
        }
    }

    pub fn has_key(&self) -> bool {
        !self.stream_key.trim().is_empty()
    }
}

/// One destination handed to the relay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayTarget {
    pub platform: String,
    pub url: String,
    pub stream_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub options: serde_json::Map<String, serde_json::Value>,
}

/// Visual weight of a user notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeVariant {
    #[default]
    Default,
    Warning,
    Destructive,
}

/// User-facing notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub title: String,
    pub description: String,
    pub variant: NoticeVariant,
}

impl Notice {
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: NoticeVariant::Default,
        }
    }

    pub fn warning(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: NoticeVariant::Warning,
        }
    }

    pub fn destructive(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: NoticeVariant::Destructive,
        }
    }
}

/// Media input/output discovered on the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaDeviceInfo {
    pub device_id: String,
    pub kind: MediaDeviceKind,
    pub label: String,
    pub is_default: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaDeviceKind {
    AudioInput,
    AudioOutput,
    VideoInput,
}

/// Event pushed to control surface subscribers
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum ControlEvent {
    Notice(Notice),
    StatusChanged { status: StreamStatus },
    SourcesChanged,
    PreviewChanged { available: bool },
    Stats(StreamStats),
}

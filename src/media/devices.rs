//! Capture device backends
//!
//! [`MediaDevices`] is the seam where platform capture APIs plug in. The
//! crate ships [`SyntheticDevices`], a configurable in-process backend, and
//! `HostDevices` (see `media::host`) which adds real microphones via cpal.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::constants::{
    CAMERA_FALLBACK_HEIGHT, CAMERA_FALLBACK_WIDTH, CAMERA_IDEAL_HEIGHT, CAMERA_IDEAL_WIDTH,
};
use crate::error::MediaError;
use crate::media::stream::{MediaStream, MediaTrack, TrackKind, TrackSettings};
use crate::protocol::{MediaDeviceInfo, MediaDeviceKind};

/// Requested video shape; values are preferences, not hard limits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VideoConstraints {
    pub width: u32,
    pub height: u32,
    pub frame_rate: Option<f32>,
}

impl VideoConstraints {
    pub fn camera_ideal() -> Self {
        Self {
            width: CAMERA_IDEAL_WIDTH,
            height: CAMERA_IDEAL_HEIGHT,
            frame_rate: Some(30.0),
        }
    }

    pub fn camera_fallback() -> Self {
        Self {
            width: CAMERA_FALLBACK_WIDTH,
            height: CAMERA_FALLBACK_HEIGHT,
            frame_rate: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioConstraints {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
}

impl Default for AudioConstraints {
    fn default() -> Self {
        Self {
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: true,
        }
    }
}

/// Constraints for a camera and/or microphone request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaStreamConstraints {
    pub video: Option<VideoConstraints>,
    pub audio: Option<AudioConstraints>,
}

impl MediaStreamConstraints {
    pub fn camera(video: VideoConstraints) -> Self {
        Self {
            video: Some(video),
            audio: None,
        }
    }

    pub fn microphone() -> Self {
        Self {
            video: None,
            audio: Some(AudioConstraints::default()),
        }
    }
}

/// Constraints for a screen capture request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayMediaConstraints {
    pub cursor: bool,
    pub audio: bool,
}

impl Default for DisplayMediaConstraints {
    fn default() -> Self {
        Self {
            cursor: true,
            audio: false,
        }
    }
}

#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Acquire camera and/or microphone tracks
    async fn get_user_media(
        &self,
        constraints: &MediaStreamConstraints,
    ) -> Result<MediaStream, MediaError>;

    /// Acquire a screen capture
    async fn get_display_media(
        &self,
        constraints: &DisplayMediaConstraints,
    ) -> Result<MediaStream, MediaError>;

    /// List the inputs and outputs the backend knows about
    async fn enumerate_devices(&self) -> Result<Vec<MediaDeviceInfo>, MediaError>;
}

/// Which request a scripted failure applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceRequest {
    Camera,
    Microphone,
    Display,
}

/// Settings for the synthetic backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    pub camera: bool,
    pub microphone: bool,
    pub display: bool,
    /// Largest frame the synthetic camera produces
    pub camera_max_width: u32,
    pub camera_max_height: u32,
    pub display_width: u32,
    pub display_height: u32,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            camera: true,
            microphone: true,
            display: true,
            camera_max_width: 1920,
            camera_max_height: 1080,
            display_width: 1920,
            display_height: 1080,
        }
    }
}

/// In-process device backend producing synthetic tracks.
///
/// Failures can be scripted per request kind; each scripted error is
/// consumed by the next matching request.
pub struct SyntheticDevices {
    config: SyntheticConfig,
    failures: Mutex<VecDeque<(DeviceRequest, MediaError)>>,
    requests: Mutex<Vec<(DeviceRequest, MediaStreamConstraints)>>,
}

impl SyntheticDevices {
    pub fn new(config: SyntheticConfig) -> Self {
        Self {
            config,
            failures: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Make the next `request` fail with `err`
    pub fn fail_next(&self, request: DeviceRequest, err: MediaError) {
        self.failures.lock().push_back((request, err));
    }

    /// Every request received so far, in order
    pub fn requests(&self) -> Vec<(DeviceRequest, MediaStreamConstraints)> {
        self.requests.lock().clone()
    }

    fn take_failure(&self, request: DeviceRequest) -> Option<MediaError> {
        let mut failures = self.failures.lock();
        let pos = failures.iter().position(|(r, _)| *r == request)?;
        failures.remove(pos).map(|(_, err)| err)
    }

    fn begin(
        &self,
        request: DeviceRequest,
        constraints: MediaStreamConstraints,
    ) -> Result<(), MediaError> {
        self.requests.lock().push((request, constraints));
        match self.take_failure(request) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn camera_track(&self, video: &VideoConstraints) -> Result<MediaTrack, MediaError> {
        if !self.config.camera {
            return Err(MediaError::NotFound);
        }
        let settings = TrackSettings::video(
            video.width.min(self.config.camera_max_width),
            video.height.min(self.config.camera_max_height),
            video.frame_rate.unwrap_or(30.0),
        );
        Ok(MediaTrack::new(TrackKind::Video, "Synthetic Camera", settings))
    }

    fn microphone_track(&self) -> Result<MediaTrack, MediaError> {
        if !self.config.microphone {
            return Err(MediaError::NotFound);
        }
        Ok(MediaTrack::new(
            TrackKind::Audio,
            "Synthetic Microphone",
            TrackSettings::audio(48000, 1),
        ))
    }
}

impl Default for SyntheticDevices {
    fn default() -> Self {
        Self::new(SyntheticConfig::default())
    }
}

#[async_trait]
impl MediaDevices for SyntheticDevices {
    async fn get_user_media(
        &self,
        constraints: &MediaStreamConstraints,
    ) -> Result<MediaStream, MediaError> {
        let request = if constraints.video.is_some() {
            DeviceRequest::Camera
        } else {
            DeviceRequest::Microphone
        };
        self.begin(request, constraints.clone())?;

        let mut tracks = Vec::new();
        if let Some(video) = &constraints.video {
            tracks.push(self.camera_track(video)?);
        }
        if constraints.audio.is_some() {
            tracks.push(self.microphone_track()?);
        }
        Ok(MediaStream::new(tracks))
    }

    async fn get_display_media(
        &self,
        constraints: &DisplayMediaConstraints,
    ) -> Result<MediaStream, MediaError> {
        self.begin(DeviceRequest::Display, MediaStreamConstraints::default())?;
        if !self.config.display {
            return Err(MediaError::NotFound);
        }

        let mut tracks = vec![MediaTrack::new(
            TrackKind::Video,
            "Synthetic Screen",
            TrackSettings::video(self.config.display_width, self.config.display_height, 30.0),
        )];
        if constraints.audio {
            tracks.push(MediaTrack::new(
                TrackKind::Audio,
                "Synthetic System Audio",
                TrackSettings::audio(48000, 2),
            ));
        }
        Ok(MediaStream::new(tracks))
    }

    async fn enumerate_devices(&self) -> Result<Vec<MediaDeviceInfo>, MediaError> {
        let mut devices = Vec::new();
        if self.config.camera {
            devices.push(MediaDeviceInfo {
                device_id: "synthetic:camera".to_string(),
                kind: MediaDeviceKind::VideoInput,
                label: "Synthetic Camera".to_string(),
                is_default: true,
            });
        }
        if self.config.microphone {
            devices.push(MediaDeviceInfo {
                device_id: "synthetic:microphone".to_string(),
                kind: MediaDeviceKind::AudioInput,
                label: "Synthetic Microphone".to_string(),
                is_default: true,
            });
        }
        Ok(devices)
    }
}

//! Host device backend
//!
//! Microphones come from the system audio host through cpal. Camera and
//! screen requests go to an inner synthetic backend, since there is no
//! portable capture API for them on the host side.

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait};

use crate::error::MediaError;
use crate::media::devices::{
    DisplayMediaConstraints, MediaDevices, MediaStreamConstraints, SyntheticDevices,
};
use crate::media::stream::{MediaStream, MediaTrack, TrackKind, TrackSettings};
use crate::protocol::{MediaDeviceInfo, MediaDeviceKind};

pub struct HostDevices {
    video: SyntheticDevices,
}

impl HostDevices {
    pub fn new(video: SyntheticDevices) -> Self {
        Self { video }
    }
}

fn config_error(err: cpal::DefaultStreamConfigError) -> MediaError {
    match err {
        cpal::DefaultStreamConfigError::DeviceNotAvailable => MediaError::NotReadable,
        cpal::DefaultStreamConfigError::StreamTypeNotSupported => MediaError::Overconstrained {
            constraint: "audio input".to_string(),
        },
        other => MediaError::Other(other.to_string()),
    }
}

/// Open the default input device and describe the track it would produce
fn default_microphone() -> Result<MediaTrack, MediaError> {
    let host = cpal::default_host();
    let device = host.default_input_device().ok_or(MediaError::NotFound)?;
    let name = device.name().unwrap_or_else(|_| "Unknown".to_string());

    let config = device.default_input_config().map_err(config_error)?;

    tracing::debug!(device = %name, sample_rate = config.sample_rate().0, "acquired microphone");
    Ok(MediaTrack::new(
        TrackKind::Audio,
        name,
        TrackSettings::audio(config.sample_rate().0, config.channels()),
    ))
}

/// List audio inputs and outputs known to the system host
fn list_audio_devices() -> Vec<MediaDeviceInfo> {
    let host = cpal::default_host();
    let mut devices = Vec::new();

    let default_input_name = host.default_input_device().and_then(|d| d.name().ok());
    let default_output_name = host.default_output_device().and_then(|d| d.name().ok());

    if let Ok(inputs) = host.input_devices() {
        for device in inputs {
            if let Ok(name) = device.name() {
                devices.push(MediaDeviceInfo {
                    device_id: format!("input:{}", name),
                    kind: MediaDeviceKind::AudioInput,
                    is_default: default_input_name.as_ref() == Some(&name),
                    label: name,
                });
            }
        }
    }

    if let Ok(outputs) = host.output_devices() {
        for device in outputs {
            if let Ok(name) = device.name() {
                devices.push(MediaDeviceInfo {
                    device_id: format!("output:{}", name),
                    kind: MediaDeviceKind::AudioOutput,
                    is_default: default_output_name.as_ref() == Some(&name),
                    label: name,
                });
            }
        }
    }

    devices
}

#[async_trait]
impl MediaDevices for HostDevices {
    async fn get_user_media(
        &self,
        constraints: &MediaStreamConstraints,
    ) -> Result<MediaStream, MediaError> {
        let mut tracks = Vec::new();

        if let Some(video) = constraints.video {
            let camera = self
                .video
                .get_user_media(&MediaStreamConstraints::camera(video))
                .await?;
            tracks.extend(camera.tracks().iter().cloned());
        }

        if constraints.audio.is_some() {
            let track = tokio::task::spawn_blocking(default_microphone)
                .await
                .map_err(|e| MediaError::Other(e.to_string()))??;
            tracks.push(track);
        }

        Ok(MediaStream::new(tracks))
    }

    async fn get_display_media(
        &self,
        constraints: &DisplayMediaConstraints,
    ) -> Result<MediaStream, MediaError> {
        self.video.get_display_media(constraints).await
    }

    async fn enumerate_devices(&self) -> Result<Vec<MediaDeviceInfo>, MediaError> {
        let mut devices: Vec<MediaDeviceInfo> = self
            .video
            .enumerate_devices()
            .await?
            .into_iter()
            .filter(|d| d.kind == MediaDeviceKind::VideoInput)
            .collect();

        let audio = tokio::task::spawn_blocking(list_audio_devices)
            .await
            .map_err(|e| MediaError::Other(e.to_string()))?;
        devices.extend(audio);
        Ok(devices)
    }
}

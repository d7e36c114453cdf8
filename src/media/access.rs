//! Device access layer
//!
//! Turns a source into a live registry entry: picks the constraints for the
//! source kind, applies the camera fallback, classifies device failures and
//! watches screen captures for an out-of-band "stop sharing".

use std::sync::Arc;

use crate::error::{ActivationError, MediaError};
use crate::media::devices::{
    DisplayMediaConstraints, MediaDevices, MediaStreamConstraints, VideoConstraints,
};
use crate::media::registry::{MediaRegistry, RemovalReason};
use crate::media::stream::MediaStream;
use crate::protocol::{MediaDeviceInfo, Slot, SourceKind};
use crate::sources::Source;

pub struct DeviceAccess {
    devices: Arc<dyn MediaDevices>,
    registry: Arc<MediaRegistry>,
}

impl DeviceAccess {
    pub fn new(devices: Arc<dyn MediaDevices>, registry: Arc<MediaRegistry>) -> Self {
        Self { devices, registry }
    }

    pub fn registry(&self) -> &Arc<MediaRegistry> {
        &self.registry
    }

    pub async fn list_devices(&self) -> Result<Vec<MediaDeviceInfo>, MediaError> {
        self.devices.enumerate_devices().await
    }

    /// Acquire the device behind `source` and register its stream.
    ///
    /// On error the registry is left untouched, except that a busy camera
    /// releases whatever camera stream the registry still holds.
    pub async fn activate_real_device(&self, source: &Source) -> Result<(), ActivationError> {
        let Some(slot) = source.kind.slot() else {
            tracing::debug!(
                source_id = source.id,
                kind = %source.kind,
                "no capture device for source"
            );
            return Ok(());
        };

        let stream = match source.kind {
            SourceKind::Camera => self.acquire_camera().await,
            SourceKind::Audio => self
                .devices
                .get_user_media(&MediaStreamConstraints::microphone())
                .await
                .map_err(|e| ActivationError::classify(SourceKind::Audio, e)),
            SourceKind::Display => self.acquire_display().await,
            SourceKind::Vr | SourceKind::Media => return Ok(()),
        };

        let stream = match stream {
            Ok(stream) => stream,
            Err(err) => {
                tracing::warn!(
                    source_id = source.id,
                    kind = %source.kind,
                    error = %err,
                    "device activation failed"
                );
                return Err(err);
            }
        };

        if source.kind == SourceKind::Display {
            self.watch_display_end(&stream);
        }

        tracing::info!(
            source_id = source.id,
            %slot,
            tracks = stream.tracks().len(),
            "device activated"
        );
        self.registry.insert(slot, source.id, stream);
        Ok(())
    }

    /// Release the slot held by `source`, if it holds one
    pub fn deactivate_device(&self, source: &Source) {
        if let Some(slot) = source.kind.slot() {
            if self
                .registry
                .remove_owned(slot, source.id, RemovalReason::Deactivated)
                .is_some()
            {
                tracing::info!(source_id = source.id, %slot, "device released");
            }
        }
    }

    async fn acquire_camera(&self) -> Result<MediaStream, ActivationError> {
        let ideal = MediaStreamConstraints::camera(VideoConstraints::camera_ideal());
        match self.devices.get_user_media(&ideal).await {
            Ok(stream) => Ok(stream),
            Err(MediaError::Overconstrained { constraint }) => {
                tracing::info!(
                    %constraint,
                    "camera over-constrained, retrying with lower resolution"
                );
                let fallback = MediaStreamConstraints::camera(VideoConstraints::camera_fallback());
                self.devices
                    .get_user_media(&fallback)
                    .await
                    .map_err(|e| ActivationError::classify(SourceKind::Camera, e))
            }
            Err(MediaError::NotReadable) => {
                if self.registry.remove(Slot::Camera, RemovalReason::Released).is_some() {
                    tracing::info!("released previously held camera stream");
                }
                Err(ActivationError::classify(SourceKind::Camera, MediaError::NotReadable))
            }
            Err(err) => Err(ActivationError::classify(SourceKind::Camera, err)),
        }
    }

    async fn acquire_display(&self) -> Result<MediaStream, ActivationError> {
        self.devices
            .get_display_media(&DisplayMediaConstraints::default())
            .await
            .map_err(|e| ActivationError::classify(SourceKind::Display, e))
    }

    /// Drop the display slot when its video track ends on its own.
    ///
    /// Only the stream this watcher was created for is removed, so a local
    /// deactivation or a newer capture in the same slot is left alone.
    fn watch_display_end(&self, stream: &MediaStream) {
        let Some(track) = stream.video_tracks().next().cloned() else {
            return;
        };
        let registry = Arc::clone(&self.registry);
        let stream_id = stream.id().to_string();

        tokio::spawn(async move {
            track.ended().await;
            if registry
                .remove_if_stream(Slot::Display, &stream_id, RemovalReason::TrackEnded)
                .is_some()
            {
                tracing::info!(stream_id = %stream_id, "screen capture ended by the user");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::devices::{DeviceRequest, SyntheticDevices};

    fn setup() -> (Arc<SyntheticDevices>, Arc<MediaRegistry>, DeviceAccess) {
        let devices = Arc::new(SyntheticDevices::default());
        let registry = MediaRegistry::shared();
        let access = DeviceAccess::new(devices.clone(), registry.clone());
        (devices, registry, access)
    }

    #[tokio::test]
    async fn test_camera_activation_registers_stream() {
        let (_, registry, access) = setup();
        let camera = Source::new(1, "Main Camera", SourceKind::Camera);

        access.activate_real_device(&camera).await.unwrap();

        let entry = registry.get(Slot::Camera).unwrap();
        assert_eq!(entry.source_id, 1);
        assert_eq!(entry.stream.video_tracks().count(), 1);
        assert_eq!(registry.video_settings().unwrap().width, Some(1280));
    }

    #[tokio::test]
    async fn test_overconstrained_camera_retries_once() {
        let (devices, registry, access) = setup();
        devices.fail_next(
            DeviceRequest::Camera,
            MediaError::Overconstrained { constraint: "width".into() },
        );
        let camera = Source::new(1, "Main Camera", SourceKind::Camera);

        access.activate_real_device(&camera).await.unwrap();

        let requests = devices.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].1.video, Some(VideoConstraints::camera_fallback()));
        assert_eq!(registry.video_settings().unwrap().width, Some(640));
    }

    #[tokio::test]
    async fn test_overconstrained_twice_fails() {
        let (devices, registry, access) = setup();
        for _ in 0..2 {
            devices.fail_next(
                DeviceRequest::Camera,
                MediaError::Overconstrained { constraint: "width".into() },
            );
        }
        let camera = Source::new(1, "Main Camera", SourceKind::Camera);

        let err = access.activate_real_device(&camera).await.unwrap_err();
        assert!(matches!(err, ActivationError::OverConstrained { .. }));
        assert_eq!(devices.requests().len(), 2);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_overconstrained_audio_is_not_retried() {
        let (devices, _, access) = setup();
        devices.fail_next(
            DeviceRequest::Microphone,
            MediaError::Overconstrained { constraint: "sampleRate".into() },
        );
        let mic = Source::new(3, "Microphone", SourceKind::Audio);

        let err = access.activate_real_device(&mic).await.unwrap_err();
        assert!(matches!(err, ActivationError::OverConstrained { kind: SourceKind::Audio, .. }));
        assert_eq!(devices.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_busy_camera_releases_held_stream() {
        let (devices, registry, access) = setup();
        let first = Source::new(1, "Main Camera", SourceKind::Camera);
        let second = Source::new(6, "Second Camera", SourceKind::Camera);
        access.activate_real_device(&first).await.unwrap();

        devices.fail_next(DeviceRequest::Camera, MediaError::NotReadable);
        let err = access.activate_real_device(&second).await.unwrap_err();

        assert_eq!(err, ActivationError::DeviceBusy { kind: SourceKind::Camera });
        assert!(!registry.contains(Slot::Camera));
    }

    #[tokio::test]
    async fn test_error_taxonomy() {
        let (devices, registry, access) = setup();
        let mic = Source::new(3, "Microphone", SourceKind::Audio);

        devices.fail_next(DeviceRequest::Microphone, MediaError::NotAllowed("denied".into()));
        assert_eq!(
            access.activate_real_device(&mic).await.unwrap_err(),
            ActivationError::PermissionDenied { kind: SourceKind::Audio }
        );

        devices.fail_next(DeviceRequest::Microphone, MediaError::NotFound);
        assert_eq!(
            access.activate_real_device(&mic).await.unwrap_err(),
            ActivationError::DeviceNotFound { kind: SourceKind::Audio }
        );

        devices.fail_next(DeviceRequest::Microphone, MediaError::Other("boom".into()));
        let err = access.activate_real_device(&mic).await.unwrap_err();
        assert_eq!(err.title(), "Activation Failed");
        assert!(err.description().contains("boom"));

        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_sources_without_devices() {
        let (devices, registry, access) = setup();
        access
            .activate_real_device(&Source::new(4, "VR Headset", SourceKind::Vr))
            .await
            .unwrap();
        assert!(devices.requests().is_empty());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_display_end_clears_slot() {
        let (_, registry, access) = setup();
        let screen = Source::new(2, "Screen Share", SourceKind::Display);
        access.activate_real_device(&screen).await.unwrap();

        let track = registry
            .get(Slot::Display)
            .unwrap()
            .stream
            .video_tracks()
            .next()
            .cloned()
            .unwrap();
        track.end();

        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(!registry.contains(Slot::Display));
    }

    #[tokio::test]
    async fn test_deactivate_only_releases_own_slot() {
        let (_, registry, access) = setup();
        let first = Source::new(1, "Main Camera", SourceKind::Camera);
        let second = Source::new(6, "Second Camera", SourceKind::Camera);
        access.activate_real_device(&second).await.unwrap();

        access.deactivate_device(&first);
        assert_eq!(registry.owner(Slot::Camera), Some(6));

        access.deactivate_device(&second);
        assert!(registry.is_empty());
    }
}

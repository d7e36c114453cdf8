//! Broadcast stream slot
//!
//! Holds the composed stream that will be handed to the relay. Whoever
//! renders the preview fills it; the lifecycle controller only reads it.

use parking_lot::RwLock;

use crate::media::registry::MediaRegistry;
use crate::media::stream::MediaStream;
use crate::protocol::Slot;

#[derive(Default)]
pub struct BroadcastSlot {
    stream: RwLock<Option<MediaStream>>,
}

impl BroadcastSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, stream: MediaStream) {
        tracing::debug!(
            stream_id = stream.id(),
            tracks = stream.tracks().len(),
            "broadcast stream set"
        );
        *self.stream.write() = Some(stream);
    }

    pub fn clear(&self) {
        *self.stream.write() = None;
    }

    pub fn get(&self) -> Option<MediaStream> {
        self.stream.read().clone()
    }

    /// A stream is set and carries at least one track
    pub fn is_ready(&self) -> bool {
        self.stream.read().as_ref().is_some_and(|s| !s.is_empty())
    }
}

/// Merge the current video (camera first, else display) and audio slots
/// into one stream; `None` when no slot is filled
pub fn compose_from_registry(registry: &MediaRegistry) -> Option<MediaStream> {
    let video = registry
        .get(Slot::Camera)
        .filter(|e| e.stream.has_live_video())
        .or_else(|| registry.get(Slot::Display));
    let audio = registry.get(Slot::Audio);

    let parts: Vec<MediaStream> = video.into_iter().chain(audio).map(|e| e.stream).collect();
    if parts.is_empty() {
        return None;
    }
    Some(MediaStream::compose(parts.iter()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::stream::{MediaTrack, TrackKind, TrackSettings};

    #[test]
    fn test_compose_prefers_camera() {
        let registry = MediaRegistry::new();
        assert!(compose_from_registry(&registry).is_none());

        let display = MediaStream::new(vec![MediaTrack::new(
            TrackKind::Video,
            "screen",
            TrackSettings::video(1920, 1080, 30.0),
        )]);
        let camera = MediaStream::new(vec![MediaTrack::new(
            TrackKind::Video,
            "cam",
            TrackSettings::video(1280, 720, 30.0),
        )]);
        let mic = MediaStream::new(vec![MediaTrack::new(
            TrackKind::Audio,
            "mic",
            TrackSettings::audio(48000, 1),
        )]);
        registry.insert(Slot::Display, 2, display);
        registry.insert(Slot::Camera, 1, camera.clone());
        registry.insert(Slot::Audio, 3, mic);

        let composed = compose_from_registry(&registry).unwrap();
        assert_eq!(composed.tracks().len(), 2);
        assert_eq!(composed.video_tracks().next().unwrap().id(), camera.tracks()[0].id());

        let slot = BroadcastSlot::new();
        assert!(!slot.is_ready());
        slot.set(composed);
        assert!(slot.is_ready());
        slot.clear();
        assert!(slot.get().is_none());
    }
}

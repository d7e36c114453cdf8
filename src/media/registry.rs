//! Active stream registry
//!
//! Owns every live capture stream, keyed by logical slot. A slot holds at
//! most one stream together with the id of the source that acquired it.
//! Observers are called synchronously after each mutation, outside the
//! table lock, so they may read the registry back.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::media::stream::{MediaStream, TrackSettings};
use crate::protocol::Slot;
use crate::sources::Source;

/// One occupied slot
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    pub source_id: u32,
    pub stream: MediaStream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalReason {
    /// The owning source was switched off
    Deactivated,
    /// The device ended the stream on its own
    TrackEnded,
    /// Another source took over the slot
    Replaced,
    /// Freed to recover from a busy device
    Released,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryEvent {
    Inserted { slot: Slot, source_id: u32 },
    Removed { slot: Slot, source_id: u32, reason: RemovalReason },
}

type Observer = Box<dyn Fn(&RegistryEvent) + Send + Sync>;

#[derive(Default)]
pub struct MediaRegistry {
    entries: RwLock<BTreeMap<Slot, RegistryEntry>>,
    observers: RwLock<Vec<Observer>>,
}

impl MediaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register a callback invoked after every mutation
    pub fn subscribe(&self, observer: impl Fn(&RegistryEvent) + Send + Sync + 'static) {
        self.observers.write().push(Box::new(observer));
    }

    /// Store a stream in a slot, stopping whatever it replaces
    pub fn insert(&self, slot: Slot, source_id: u32, stream: MediaStream) {
        let previous = self
            .entries
            .write()
            .insert(slot, RegistryEntry { source_id, stream });

        if let Some(prev) = previous {
            prev.stream.stop_all();
            tracing::debug!(%slot, previous_owner = prev.source_id, "replaced registry entry");
            self.emit(RegistryEvent::Removed {
                slot,
                source_id: prev.source_id,
                reason: RemovalReason::Replaced,
            });
        }

        tracing::debug!(%slot, source_id, "registered stream");
        self.emit(RegistryEvent::Inserted { slot, source_id });
    }

    /// Drop and stop the stream in a slot
    pub fn remove(&self, slot: Slot, reason: RemovalReason) -> Option<RegistryEntry> {
        let removed = self.entries.write().remove(&slot);
        self.finish_removal(slot, removed, reason)
    }

    /// Drop the slot only if `source_id` still owns it
    pub fn remove_owned(
        &self,
        slot: Slot,
        source_id: u32,
        reason: RemovalReason,
    ) -> Option<RegistryEntry> {
        let removed = {
            let mut entries = self.entries.write();
            match entries.get(&slot) {
                Some(entry) if entry.source_id == source_id => entries.remove(&slot),
                _ => None,
            }
        };
        self.finish_removal(slot, removed, reason)
    }

    /// Drop the slot only if it still holds the stream with `stream_id`
    pub fn remove_if_stream(
        &self,
        slot: Slot,
        stream_id: &str,
        reason: RemovalReason,
    ) -> Option<RegistryEntry> {
        let removed = {
            let mut entries = self.entries.write();
            match entries.get(&slot) {
                Some(entry) if entry.stream.id() == stream_id => entries.remove(&slot),
                _ => None,
            }
        };
        self.finish_removal(slot, removed, reason)
    }

    fn finish_removal(
        &self,
        slot: Slot,
        removed: Option<RegistryEntry>,
        reason: RemovalReason,
    ) -> Option<RegistryEntry> {
        let entry = removed?;
        entry.stream.stop_all();
        tracing::debug!(%slot, source_id = entry.source_id, ?reason, "removed stream");
        self.emit(RegistryEvent::Removed {
            slot,
            source_id: entry.source_id,
            reason,
        });
        Some(entry)
    }

    pub fn get(&self, slot: Slot) -> Option<RegistryEntry> {
        self.entries.read().get(&slot).cloned()
    }

    pub fn owner(&self, slot: Slot) -> Option<u32> {
        self.entries.read().get(&slot).map(|e| e.source_id)
    }

    pub fn contains(&self, slot: Slot) -> bool {
        self.entries.read().contains_key(&slot)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Every registered stream that still carries at least one track
    pub fn get_all_active_streams(&self) -> BTreeMap<Slot, MediaStream> {
        self.entries
            .read()
            .iter()
            .filter(|(_, e)| !e.stream.is_empty())
            .map(|(slot, e)| (*slot, e.stream.clone()))
            .collect()
    }

    /// Whether any registered stream has a live video track
    pub fn has_live_video(&self) -> bool {
        self.entries.read().values().any(|e| e.stream.has_live_video())
    }

    /// Settings of the first live video track, camera before display
    pub fn video_settings(&self) -> Option<TrackSettings> {
        let entries = self.entries.read();
        let settings = [Slot::Camera, Slot::Display]
            .iter()
            .filter_map(|slot| entries.get(slot))
            .flat_map(|e| e.stream.video_tracks())
            .find(|t| t.is_live())
            .map(|t| t.settings().clone());
        settings
    }

    fn emit(&self, event: RegistryEvent) {
        for observer in self.observers.read().iter() {
            observer(&event);
        }
    }
}

/// A video source is available only when the source list says so AND the
/// registry actually holds a live video track. Neither alone suffices.
pub fn has_active_video_source(sources: &[Source], registry: &MediaRegistry) -> bool {
    let listed = sources.iter().any(|s| s.active && s.kind.is_video_capable());
    listed && registry.has_live_video()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::stream::{MediaTrack, TrackKind};
    use crate::protocol::SourceKind;
    use parking_lot::Mutex;

    fn video_stream() -> MediaStream {
        MediaStream::new(vec![MediaTrack::new(
            TrackKind::Video,
            "cam",
            TrackSettings::video(1280, 720, 30.0),
        )])
    }

    fn audio_stream() -> MediaStream {
        MediaStream::new(vec![MediaTrack::new(
            TrackKind::Audio,
            "mic",
            TrackSettings::audio(48000, 1),
        )])
    }

    #[test]
    fn test_empty_streams_are_filtered() {
        let registry = MediaRegistry::new();
        registry.insert(Slot::Camera, 1, video_stream());
        registry.insert(Slot::Audio, 2, MediaStream::new(Vec::new()));

        let active = registry.get_all_active_streams();
        assert_eq!(active.len(), 1);
        assert!(active.contains_key(&Slot::Camera));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_replace_stops_previous_stream() {
        let registry = MediaRegistry::new();
        let first = video_stream();
        registry.insert(Slot::Camera, 1, first.clone());
        registry.insert(Slot::Camera, 4, video_stream());

        assert!(!first.has_live_video());
        assert_eq!(registry.owner(Slot::Camera), Some(4));
    }

    #[test]
    fn test_conditional_removal() {
        let registry = MediaRegistry::new();
        let stream = video_stream();
        registry.insert(Slot::Display, 2, stream.clone());

        assert!(registry.remove_owned(Slot::Display, 9, RemovalReason::Deactivated).is_none());
        assert!(registry
            .remove_if_stream(Slot::Display, "other", RemovalReason::TrackEnded)
            .is_none());
        assert!(registry.contains(Slot::Display));

        assert!(registry
            .remove_if_stream(Slot::Display, stream.id(), RemovalReason::TrackEnded)
            .is_some());
        assert!(registry.is_empty());
        assert!(!stream.has_live_video());
    }

    #[test]
    fn test_observers_see_each_mutation() {
        let registry = MediaRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        registry.subscribe(move |e| sink.lock().push(*e));

        registry.insert(Slot::Camera, 1, video_stream());
        registry.insert(Slot::Camera, 3, video_stream());
        registry.remove(Slot::Camera, RemovalReason::Deactivated);

        let seen = seen.lock();
        assert_eq!(
            *seen,
            vec![
                RegistryEvent::Inserted { slot: Slot::Camera, source_id: 1 },
                RegistryEvent::Removed {
                    slot: Slot::Camera,
                    source_id: 1,
                    reason: RemovalReason::Replaced
                },
                RegistryEvent::Inserted { slot: Slot::Camera, source_id: 3 },
                RegistryEvent::Removed {
                    slot: Slot::Camera,
                    source_id: 3,
                    reason: RemovalReason::Deactivated
                },
            ]
        );
    }

    #[test]
    fn test_video_source_needs_both_views() {
        let registry = MediaRegistry::new();
        let mut camera = Source::new(1, "Main Camera", SourceKind::Camera);
        let sources_off = vec![camera.clone()];
        camera.active = true;
        let sources_on = vec![camera];

        // Listed but nothing registered
        assert!(!has_active_video_source(&sources_on, &registry));

        // Registered but not listed
        registry.insert(Slot::Camera, 1, video_stream());
        assert!(!has_active_video_source(&sources_off, &registry));

        assert!(has_active_video_source(&sources_on, &registry));
    }

    #[test]
    fn test_audio_only_registry_has_no_video() {
        let registry = MediaRegistry::new();
        registry.insert(Slot::Audio, 2, audio_stream());
        let mut camera = Source::new(1, "Main Camera", SourceKind::Camera);
        camera.active = true;
        assert!(!has_active_video_source(&[camera], &registry));
        assert!(registry.video_settings().is_none());
    }

    #[test]
    fn test_video_settings_prefer_live_camera() {
        let registry = MediaRegistry::new();
        let display = MediaStream::new(vec![MediaTrack::new(
            TrackKind::Video,
            "screen",
            TrackSettings::video(1920, 1080, 30.0),
        )]);
        registry.insert(Slot::Display, 2, display);
        assert_eq!(registry.video_settings().unwrap().width, Some(1920));

        let camera = video_stream();
        registry.insert(Slot::Camera, 1, camera.clone());
        assert_eq!(registry.video_settings().unwrap().width, Some(1280));

        camera.stop_all();
        assert_eq!(registry.video_settings().unwrap().width, Some(1920));
    }
}

//! Source toggle reducer
//!
//! Owns the source list and the preview-availability flag. For capture
//! kinds (camera, display, audio) `active` is a projection of the registry:
//! it is rewritten from every registry event, so out-of-band changes such as
//! a screen capture ended by the user show up without a toggle.

use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::error::SourceError;
use crate::events::EventBus;
use crate::media::registry::{has_active_video_source, MediaRegistry, RegistryEvent};
use crate::media::DeviceAccess;
use crate::protocol::{ControlEvent, MediaDeviceInfo, Notice, SourceKind};
use crate::sources::source::{NewSource, Source};

#[derive(Default)]
struct SourceState {
    sources: Vec<Source>,
    preview_available: bool,
}

impl SourceState {
    /// Recompute the preview flag from the list; true if it changed
    fn refresh_preview(&mut self) -> bool {
        let available = self
            .sources
            .iter()
            .any(|s| s.active && s.kind.is_video_capable());
        let changed = available != self.preview_available;
        self.preview_available = available;
        changed
    }

    fn apply(&mut self, event: &RegistryEvent) {
        match *event {
            RegistryEvent::Inserted { slot, source_id } => {
                for source in self.sources.iter_mut().filter(|s| s.kind.slot() == Some(slot)) {
                    source.active = source.id == source_id;
                }
            }
            RegistryEvent::Removed { slot, source_id, .. } => {
                if let Some(source) = self
                    .sources
                    .iter_mut()
                    .find(|s| s.id == source_id && s.kind.slot() == Some(slot))
                {
                    source.active = false;
                }
            }
        }
    }
}

/// Clears the in-flight marker for a source when the toggle finishes
struct PendingToggle<'a> {
    pending: &'a Mutex<HashSet<u32>>,
    id: u32,
}

impl Drop for PendingToggle<'_> {
    fn drop(&mut self) {
        self.pending.lock().remove(&self.id);
    }
}

pub struct SourceManager {
    state: Arc<RwLock<SourceState>>,
    access: DeviceAccess,
    events: EventBus,
    pending: Mutex<HashSet<u32>>,
    next_id: AtomicU32,
}

impl SourceManager {
    pub fn new(access: DeviceAccess, events: EventBus, sources: Vec<Source>) -> Self {
        let next_id = sources.iter().map(|s| s.id).max().unwrap_or(0) + 1;
        let registry = Arc::clone(access.registry());

        // Capture sources start inactive unless the registry already holds them
        let sources = sources
            .into_iter()
            .map(|mut s| {
                if let Some(slot) = s.kind.slot() {
                    s.active = registry.owner(slot) == Some(s.id);
                }
                s
            })
            .collect();

        let mut initial = SourceState {
            sources,
            preview_available: false,
        };
        initial.refresh_preview();
        let state = Arc::new(RwLock::new(initial));

        {
            let state = Arc::clone(&state);
            let events = events.clone();
            registry.subscribe(move |event| {
                let preview_changed = {
                    let mut state = state.write();
                    state.apply(event);
                    state.refresh_preview().then_some(state.preview_available)
                };
                events.publish(ControlEvent::SourcesChanged);
                if let Some(available) = preview_changed {
                    events.publish(ControlEvent::PreviewChanged { available });
                }
            });
        }

        Self {
            state,
            access,
            events,
            pending: Mutex::new(HashSet::new()),
            next_id: AtomicU32::new(next_id),
        }
    }

    pub fn registry(&self) -> &Arc<MediaRegistry> {
        self.access.registry()
    }

    pub fn sources(&self) -> Vec<Source> {
        self.state.read().sources.clone()
    }

    pub fn get(&self, id: u32) -> Option<Source> {
        self.state.read().sources.iter().find(|s| s.id == id).cloned()
    }

    pub fn source_count(&self) -> usize {
        self.state.read().sources.len()
    }

    pub fn preview_available(&self) -> bool {
        self.state.read().preview_available
    }

    /// Source list and registry both report a live video source
    pub fn has_active_video_source(&self) -> bool {
        has_active_video_source(&self.sources(), self.registry())
    }

    pub fn has_active_audio_source(&self) -> bool {
        self.state
            .read()
            .sources
            .iter()
            .any(|s| s.active && s.kind == SourceKind::Audio)
    }

    pub async fn list_devices(&self) -> Vec<MediaDeviceInfo> {
        match self.access.list_devices().await {
            Ok(devices) => devices,
            Err(e) => {
                tracing::warn!("Failed to enumerate devices: {}", e);
                Vec::new()
            }
        }
    }

    pub fn add_source(&self, new: NewSource) -> Source {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut source = Source::new(id, new.name, new.kind);
        if let Some(icon) = new.icon {
            source.icon = icon;
        }
        self.state.write().sources.push(source.clone());
        tracing::info!(source_id = id, kind = %source.kind, "source added");
        self.events.publish(ControlEvent::SourcesChanged);
        source
    }

    /// Remove a source, releasing its device first
    pub fn remove_source(&self, id: u32) -> Result<Source, SourceError> {
        let source = self.get(id).ok_or(SourceError::NotFound(id))?;
        self.access.deactivate_device(&source);

        let removed = {
            let mut state = self.state.write();
            let pos = state
                .sources
                .iter()
                .position(|s| s.id == id)
                .ok_or(SourceError::NotFound(id))?;
            let removed = state.sources.remove(pos);
            state.refresh_preview();
            removed
        };

        tracing::info!(source_id = id, "source removed");
        self.events.publish(ControlEvent::SourcesChanged);
        Ok(removed)
    }

    /// Flip a source on or off.
    ///
    /// Activation failures leave the source list and the registry as they
    /// were and are reported through a destructive notice.
    pub async fn toggle_source_active(&self, id: u32) -> Result<Vec<Source>, SourceError> {
        let source = self.get(id).ok_or(SourceError::NotFound(id))?;

        if !self.pending.lock().insert(id) {
            return Err(SourceError::TogglePending(id));
        }
        let _pending = PendingToggle {
            pending: &self.pending,
            id,
        };

        let activate = !source.active;
        if activate {
            if let Err(err) = self.access.activate_real_device(&source).await {
                self.events.notify(Notice::destructive(err.title(), err.description()));
                return Err(err.into());
            }
        } else {
            self.access.deactivate_device(&source);
        }

        let (sources, preview) = {
            let mut state = self.state.write();
            if let Some(s) = state.sources.iter_mut().find(|s| s.id == id) {
                s.active = activate;
            }
            state.refresh_preview();
            (state.sources.clone(), state.preview_available)
        };

        tracing::info!(source_id = id, active = activate, preview, "source toggled");
        self.events.publish(ControlEvent::SourcesChanged);
        self.events.publish(ControlEvent::PreviewChanged { available: preview });
        self.events.notify(if activate {
            Notice::info("Source Activated", format!("{} is now active", source.name))
        } else {
            Notice::info("Source Deactivated", format!("{} has been turned off", source.name))
        });

        Ok(sources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ActivationError, MediaError};
    use crate::events::drain_notices;
    use crate::media::devices::{DeviceRequest, SyntheticDevices};
    use crate::protocol::{NoticeVariant, Slot};
    use crate::sources::source::default_sources;
    use proptest::prelude::*;

    fn manager_with(sources: Vec<Source>) -> (Arc<SyntheticDevices>, SourceManager, EventBus) {
        let devices = Arc::new(SyntheticDevices::default());
        let registry = MediaRegistry::shared();
        let events = EventBus::new();
        let access = DeviceAccess::new(devices.clone(), registry);
        let manager = SourceManager::new(access, events.clone(), sources);
        (devices, manager, events)
    }

    fn camera_and_mic() -> Vec<Source> {
        vec![
            Source::new(1, "Camera", SourceKind::Camera),
            Source::new(2, "Mic", SourceKind::Audio),
        ]
    }

    #[tokio::test]
    async fn test_toggle_camera_on() {
        let (_, manager, _) = manager_with(camera_and_mic());

        let sources = manager.toggle_source_active(1).await.unwrap();

        assert!(sources[0].active);
        assert!(!sources[1].active);
        let entry = manager.registry().get(Slot::Camera).unwrap();
        assert_eq!(entry.stream.video_tracks().count(), 1);
        assert!(manager.has_active_video_source());
        assert!(manager.preview_available());
    }

    #[tokio::test]
    async fn test_toggle_off_releases_device() {
        let (_, manager, events) = manager_with(camera_and_mic());
        let mut rx = events.subscribe();

        manager.toggle_source_active(1).await.unwrap();
        let stream = manager.registry().get(Slot::Camera).unwrap().stream;
        let sources = manager.toggle_source_active(1).await.unwrap();

        assert!(!sources[0].active);
        assert!(manager.registry().is_empty());
        assert!(!stream.has_live_video());
        assert!(!manager.preview_available());

        let titles: Vec<_> = drain_notices(&mut rx).into_iter().map(|n| n.title).collect();
        assert_eq!(titles, vec!["Source Activated", "Source Deactivated"]);
    }

    #[tokio::test]
    async fn test_busy_camera_releases_previous_owner() {
        let sources = vec![
            Source::new(1, "Camera", SourceKind::Camera),
            Source::new(2, "Second Camera", SourceKind::Camera),
        ];
        let (devices, manager, events) = manager_with(sources);
        manager.toggle_source_active(1).await.unwrap();
        let held = manager.registry().get(Slot::Camera).unwrap().stream;
        assert!(manager.preview_available());

        devices.fail_next(DeviceRequest::Camera, MediaError::NotReadable);
        let mut rx = events.subscribe();
        let err = manager.toggle_source_active(2).await.unwrap_err();

        assert!(matches!(
            err,
            SourceError::Activation(ActivationError::DeviceBusy { .. })
        ));
        assert!(!manager.registry().contains(Slot::Camera));
        assert!(!held.has_live_video());
        assert!(manager.sources().iter().all(|s| !s.active));
        assert!(!manager.preview_available());
        assert!(!manager.has_active_video_source());

        let notices = drain_notices(&mut rx);
        assert_eq!(notices.last().unwrap().title, "Device In Use");
        assert_eq!(notices.last().unwrap().variant, NoticeVariant::Destructive);
    }

    #[tokio::test]
    async fn test_failed_activation_changes_nothing() {
        let (devices, manager, events) = manager_with(camera_and_mic());
        let mut rx = events.subscribe();
        devices.fail_next(DeviceRequest::Camera, MediaError::NotAllowed("denied".into()));

        let before = manager.sources();
        let err = manager.toggle_source_active(1).await.unwrap_err();

        assert_eq!(
            err,
            SourceError::Activation(ActivationError::PermissionDenied { kind: SourceKind::Camera })
        );
        assert_eq!(manager.sources(), before);
        assert!(manager.registry().is_empty());

        let notices = drain_notices(&mut rx);
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].variant, NoticeVariant::Destructive);
        assert_eq!(notices[0].title, "Permission Denied");
    }

    #[tokio::test]
    async fn test_unknown_source() {
        let (_, manager, _) = manager_with(camera_and_mic());
        assert_eq!(
            manager.toggle_source_active(42).await.unwrap_err(),
            SourceError::NotFound(42)
        );
    }

    #[tokio::test]
    async fn test_second_camera_takes_over_slot() {
        let mut sources = camera_and_mic();
        sources.push(Source::new(3, "Backup Camera", SourceKind::Camera));
        let (_, manager, _) = manager_with(sources);

        manager.toggle_source_active(1).await.unwrap();
        let sources = manager.toggle_source_active(3).await.unwrap();

        assert!(!sources[0].active);
        assert!(sources[2].active);
        assert_eq!(manager.registry().owner(Slot::Camera), Some(3));
        assert!(manager.preview_available());
    }

    #[tokio::test]
    async fn test_display_end_flips_source_off() {
        let (_, manager, _) = manager_with(default_sources());
        manager.toggle_source_active(2).await.unwrap();
        assert!(manager.get(2).unwrap().active);
        assert!(manager.preview_available());

        let track = manager
            .registry()
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

        assert!(!manager.get(2).unwrap().active);
        assert!(!manager.preview_available());
        assert!(!manager.has_active_video_source());
    }

    #[tokio::test]
    async fn test_vr_source_is_stored_flag() {
        let (devices, manager, _) = manager_with(default_sources());
        let sources = manager.toggle_source_active(4).await.unwrap();
        assert!(sources.iter().find(|s| s.id == 4).unwrap().active);
        assert!(devices.requests().is_empty());
        assert!(!manager.preview_available());
    }

    #[tokio::test]
    async fn test_add_and_remove_source() {
        let (_, manager, _) = manager_with(camera_and_mic());
        let added = manager.add_source(NewSource {
            name: "Overlay".into(),
            kind: SourceKind::Media,
            icon: None,
        });
        assert_eq!(added.id, 3);
        assert_eq!(manager.source_count(), 3);

        manager.toggle_source_active(1).await.unwrap();
        manager.remove_source(1).unwrap();
        assert!(manager.registry().is_empty());
        assert!(!manager.preview_available());
        assert_eq!(manager.remove_source(1).unwrap_err(), SourceError::NotFound(1));
    }

    proptest! {
        #[test]
        fn prop_failed_toggles_never_mutate(
            script in proptest::collection::vec(any::<bool>(), 1..12)
        ) {
            let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
            rt.block_on(async {
                let (devices, manager, _) = manager_with(camera_and_mic());
                for fail in script {
                    let before = manager.sources();
                    let owner_before = manager.registry().owner(Slot::Camera);
                    let was_active = before[0].active;

                    // Deactivation never touches the device
                    let fail = fail && !was_active;
                    if fail {
                        devices.fail_next(DeviceRequest::Camera, MediaError::NotFound);
                    }
                    let result = manager.toggle_source_active(1).await;

                    if fail {
                        prop_assert!(result.is_err());
                        prop_assert_eq!(manager.sources(), before);
                        prop_assert_eq!(manager.registry().owner(Slot::Camera), owner_before);
                    } else {
                        prop_assert!(result.is_ok());
                        prop_assert_eq!(manager.get(1).unwrap().active, !was_active);
                        prop_assert_eq!(manager.registry().contains(Slot::Camera), !was_active);
                    }
                }
                Ok::<(), TestCaseError>(())
            })?;
        }
    }
}

//! Media capture subsystem

pub mod access;
pub mod broadcast;
pub mod devices;
pub mod host;
pub mod registry;
pub mod stream;

pub use access::DeviceAccess;
pub use broadcast::{compose_from_registry, BroadcastSlot};
pub use devices::{MediaDevices, SyntheticConfig, SyntheticDevices};
pub use host::HostDevices;
pub use registry::{has_active_video_source, MediaRegistry, RegistryEvent};
pub use stream::{MediaStream, MediaTrack, TrackKind, TrackSettings};

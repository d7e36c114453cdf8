//! # MetaStream Control
//!
//! Headless core of the MetaStream creator dashboard: capture-source
//! activation, the live/recording streaming lifecycle and the stats
//! simulator that feeds the dashboard while live.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                    Control Surface (ui::WebServer)                    │
//! │         REST: sources / stream / recording / keys   WS: events       │
//! └───────────────┬──────────────────────────────┬───────────────────────┘
//!                 │ toggle                       │ start / stop / test
//!                 ▼                              ▼
//! ┌───────────────────────────────┐   ┌──────────────────────────────────┐
//! │ Source Toggle Reducer         │   │ Streaming Lifecycle Controller   │
//! │ (sources::SourceManager)      │   │ (streaming::StreamingController) │
//! │  source list ◄── projection ──┼─┐ │  preconditions ─► relay probe    │
//! │  preview flag                 │ │ │  platforms ─► relay start/stop   │
//! └───────────────┬───────────────┘ │ │  stats simulator (3 s timer)     │
//!                 │ activate        │ └───────┬───────────────┬──────────┘
//!                 ▼                 │         │ reads         │ HTTP
//! ┌───────────────────────────────┐ │         │               ▼
//! │ Device Access Layer           │ │         │      ┌─────────────────┐
//! │ (media::DeviceAccess)         │ │         │      │  Relay Server   │
//! │  getUserMedia / DisplayMedia  │ │         │      │   (external)    │
//! │  error taxonomy, fallbacks    │ │         │      └─────────────────┘
//! └───────────────┬───────────────┘ │         │
//!                 │ insert / remove │ events  │
//!                 ▼                 │         ▼
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │          Active Stream Registry (media::MediaRegistry)                │
//! │        slot (camera | audio | display) ──► (owner, MediaStream)       │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The registry is authoritative for capture sources: `Source::active` of a
//! camera, display or audio source is recomputed from registry events rather
//! than stored independently.

pub mod config;
pub mod error;
pub mod events;
pub mod media;
pub mod protocol;
pub mod sources;
pub mod storage;
pub mod streaming;
pub mod ui;

pub use error::{Error, Result};

/// Application-wide constants
pub mod constants {
    use std::time::Duration;

    /// Default relay server base URL
    pub const DEFAULT_RELAY_URL: &str = "http://localhost:8000";

    /// Relay health probe timeout
    pub const RELAY_HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

    /// Timeout for relay start/stop requests
    pub const RELAY_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

    /// Stats simulator tick period
    pub const STATS_INTERVAL: Duration = Duration::from_secs(3);

    /// Preferred camera resolution
    pub const CAMERA_IDEAL_WIDTH: u32 = 1280;
    pub const CAMERA_IDEAL_HEIGHT: u32 = 720;

    /// Camera resolution used after an over-constrained failure
    pub const CAMERA_FALLBACK_WIDTH: u32 = 640;
    pub const CAMERA_FALLBACK_HEIGHT: u32 = 480;

    /// `localStorage` key holding the persisted platform keys
    pub const STREAM_KEYS_STORAGE_KEY: &str = "streamKeys";

    /// Default port for the control surface
    pub const DEFAULT_HTTP_PORT: u16 = 8090;

    /// Capacity of the control event channel
    pub const EVENT_CHANNEL_CAPACITY: usize = 256;
}

//! Streaming lifecycle subsystem

pub mod controller;
pub mod platforms;
pub mod preconditions;
pub mod relay;
pub mod stats;

pub use controller::{StreamSnapshot, StreamingController};
pub use platforms::{AdvancedPlatforms, PlatformConfigStep, StandardPlatforms};
pub use relay::{HttpRelayClient, RelayClient};
pub use stats::StatsSimulator;

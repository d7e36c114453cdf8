//! Error types for the streaming control core

use thiserror::Error;

use crate::protocol::{SourceKind, StreamStatus};

/// Main error type for the application
#[derive(Error, Debug)]
pub enum Error {
    #[error("Relay error: {0}")]
    Relay(#[from] RelayError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures reported by a media device backend.
///
/// Mirrors the `DOMException` names raised by capture APIs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
    #[error("Permission denied: {0}")]
    NotAllowed(String),

    #[error("Requested device not found")]
    NotFound,

    #[error("Device is in use by another application")]
    NotReadable,

    #[error("Constraint cannot be satisfied: {constraint}")]
    Overconstrained { constraint: String },

    #[error("{0}")]
    Other(String),
}

/// Classified activation failure, surfaced to the user
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActivationError {
    #[error("{kind} access denied")]
    PermissionDenied { kind: SourceKind },

    #[error("No {kind} device found")]
    DeviceNotFound { kind: SourceKind },

    #[error("{kind} device is busy")]
    DeviceBusy { kind: SourceKind },

    #[error("{kind} does not support the requested settings ({constraint})")]
    OverConstrained { kind: SourceKind, constraint: String },

    #[error("Failed to activate {kind}: {reason}")]
    Failed { kind: SourceKind, reason: String },
}

impl ActivationError {
    /// Classify a raw device error for a source kind
    pub fn classify(kind: SourceKind, err: MediaError) -> Self {
        match err {
            MediaError::NotAllowed(_) => Self::PermissionDenied { kind },
            MediaError::NotFound => Self::DeviceNotFound { kind },
            MediaError::NotReadable => Self::DeviceBusy { kind },
            MediaError::Overconstrained { constraint } => {
                Self::OverConstrained { kind, constraint }
            }
            MediaError::Other(reason) => Self::Failed { kind, reason },
        }
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            Self::PermissionDenied { kind }
            | Self::DeviceNotFound { kind }
            | Self::DeviceBusy { kind }
            | Self::OverConstrained { kind, .. }
            | Self::Failed { kind, .. } => *kind,
        }
    }

    /// Short notification title
    pub fn title(&self) -> &'static str {
        match self {
            Self::PermissionDenied { .. } => "Permission Denied",
            Self::DeviceNotFound { .. } => "Device Not Found",
            Self::DeviceBusy { .. } => "Device In Use",
            Self::OverConstrained { .. } => "Unsupported Device Settings",
            Self::Failed { .. } => "Activation Failed",
        }
    }

    /// Human readable explanation with a hint on how to recover
    pub fn description(&self) -> String {
        match self {
            Self::PermissionDenied { kind } => format!(
                "Access to the {} was denied. Allow access in your system or browser settings and try again.",
                kind.device_noun()
            ),
            Self::DeviceNotFound { kind } => format!(
                "No {} was found. Connect a device and try again.",
                kind.device_noun()
            ),
            Self::DeviceBusy { kind } => format!(
                "The {} is being used by another application. Close it and try again.",
                kind.device_noun()
            ),
            Self::OverConstrained { kind, constraint } => format!(
                "The {} cannot satisfy the requested {}.",
                kind.device_noun(),
                constraint
            ),
            Self::Failed { kind, reason } => {
                format!("Could not activate the {}: {}", kind.device_noun(), reason)
            }
        }
    }
}

/// Source toggle errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("Source not found: {0}")]
    NotFound(u32),

    #[error("Source {0} is already being toggled")]
    TogglePending(u32),

    #[error(transparent)]
    Activation(#[from] ActivationError),
}

/// Streaming lifecycle errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    #[error("No active video source")]
    NoVideoSource,

    #[error("No stream keys found")]
    NoStreamKeys,

    #[error("Broadcast stream not prepared")]
    NoBroadcastStream,

    #[error("Relay server unavailable")]
    RelayUnavailable,

    #[error("Relay rejected the stream: {0}")]
    RelayRejected(String),

    #[error("Could not read stream keys: {0}")]
    StorageRead(String),

    #[error("Cannot go from {from} to {to}")]
    InvalidTransition { from: StreamStatus, to: StreamStatus },
}

/// Relay client errors
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Relay request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Relay returned status {0}")]
    Status(u16),

    #[error("Relay error: {0}")]
    Rejected(String),

    #[error("Invalid relay settings: {0}")]
    InvalidConfig(String),
}

/// Persisted state errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Malformed value under '{key}': {source}")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize value: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Storage IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;

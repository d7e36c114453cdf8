//! Source model

use serde::{Deserialize, Serialize};

use crate::protocol::SourceKind;

/// A logical capture input shown in the dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: u32,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: SourceKind,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub icon: String,
}

impl Source {
    pub fn new(id: u32, name: impl Into<String>, kind: SourceKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            active: false,
            icon: default_icon(kind).to_string(),
        }
    }
}

fn default_icon(kind: SourceKind) -> &'static str {
    match kind {
        SourceKind::Camera => "camera",
        SourceKind::Display => "monitor",
        SourceKind::Audio => "mic",
        SourceKind::Vr => "headset",
        SourceKind::Media => "film",
    }
}

/// Request body for adding a source
#[derive(Debug, Clone, Deserialize)]
pub struct NewSource {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: SourceKind,
    #[serde(default)]
    pub icon: Option<String>,
}

/// Sources every dashboard starts with
pub fn default_sources() -> Vec<Source> {
    vec![
        Source::new(1, "Main Camera", SourceKind::Camera),
        Source::new(2, "Screen Share", SourceKind::Display),
        Source::new(3, "Microphone", SourceKind::Audio),
        Source::new(4, "VR Headset", SourceKind::Vr),
        Source::new(5, "Media Overlay", SourceKind::Media),
    ]
}

//! Source management module

pub mod manager;
pub mod source;

pub use manager::SourceManager;
pub use source::{default_sources, NewSource, Source};

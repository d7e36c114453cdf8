//! Web UI control surface

pub mod handlers;
pub mod server;
pub mod websocket;

pub use server::{AppState, WebServer};

//! Assistant client: chat, voice commands and reminder alerts against the
//! assistant backend.

pub mod api;
pub mod app;
pub mod config;
pub mod logger;
pub mod speech;
pub mod state;
pub mod ui;
pub mod voice;

//! Clip Service
//!
//! Accepts video uploads into conversations, converts them to a single
//! 720p MP4 rendition in the background and lists them per conversation.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod services;
pub mod session;
pub mod state;

// Public re-exports
pub use config::Config;
pub use error::{AppError, Result};
pub use state::AppState;

//! Video core models and types
//!
//! Shared data structures for clip-service: the status state machine,
//! video identifiers and the canonical transcode profile.

pub mod constants;
pub mod models;

pub use models::*;

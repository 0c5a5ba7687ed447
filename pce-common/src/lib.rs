//! # Playback Continuity Engine Common Library
//!
//! Shared code for the playback continuity engine crates including:
//! - Error type and result alias
//! - Configuration loading (TOML settings, state folder resolution)
//! - Logging bootstrap
//! - Queue event types and the synchronous EventNotifier
//! - Time and UUID helpers

pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod time;
pub mod uuid_utils;

pub use error::{Error, Result};

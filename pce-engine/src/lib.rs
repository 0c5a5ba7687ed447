//! # Playback Continuity Engine (pce-engine)
//!
//! Keeps a play queue fed with songs or videos chosen at random under
//! user-defined constraints, while avoiding near-term repetition.
//!
//! **Components (leaves first):**
//! - [`exclusion`]: fixed-capacity, time-decaying exclusion lists
//! - [`selector`]: bounded-retry constrained random selection
//! - [`queue_manager`]: the ordered queue that never runs dry
//! - [`pce_common::events::EventNotifier`]: synchronous change notifications
//!
//! **Lock order:** a queue lock is always taken before the exclusion lock,
//! never the other way around.

pub mod catalog;
pub mod context;
pub mod exclusion;
pub mod model;
pub mod persistence;
pub mod queue_manager;
pub mod selector;

pub use context::EngineContext;
pub use pce_common::{Error, Result};

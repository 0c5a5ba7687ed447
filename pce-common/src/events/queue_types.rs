//! Queue-related supporting types for events

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which queue an event or entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum MediaKind {
    Song,
    Video,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Song => write!(f, "Song"),
            MediaKind::Video => write!(f, "Video"),
        }
    }
}

/// Why the queue changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum QueueChangeTrigger {
    AutomaticReplenishment,
    UserEnqueue,
    UserDequeue,
    UserMove,
    EntryCompletion,
}

impl std::fmt::Display for QueueChangeTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueChangeTrigger::AutomaticReplenishment => write!(f, "AutomaticReplenishment"),
            QueueChangeTrigger::UserEnqueue => write!(f, "UserEnqueue"),
            QueueChangeTrigger::UserDequeue => write!(f, "UserDequeue"),
            QueueChangeTrigger::UserMove => write!(f, "UserMove"),
            QueueChangeTrigger::EntryCompletion => write!(f, "EntryCompletion"),
        }
    }
}

/// Queue entry information carried by events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntryInfo {
    /// Queue entry UUID
    pub entry_id: Uuid,
    /// Catalog song or video id
    pub media_id: i64,
    /// Whether the entry was chosen by the random selector
    pub is_random: bool,
}

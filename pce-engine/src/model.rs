//! Core data types shared by the engine components

use pce_common::config::EngineConfig;
use pce_common::events::QueueEntryInfo;
use pce_common::{uuid_utils, Error};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;
use uuid::Uuid;

pub use pce_common::events::MediaKind;

/// Catalog identifier of a song, video, album or artist
pub type MediaId = i64;

/// Catalog identifier of a genre or sub-genre tag
pub type TagId = i64;

/// One scheduled unit of playback
///
/// Index 0 of a queue is the entry currently playing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Unique per insertion, never reused
    pub entry_id: Uuid,

    /// Catalog song or video id
    pub media_id: MediaId,

    /// Set when the random selector chose this entry
    pub is_random: bool,
}

impl QueueEntry {
    /// Create an entry with a freshly generated id
    pub fn new(media_id: MediaId, is_random: bool) -> Self {
        Self {
            entry_id: uuid_utils::generate(),
            media_id,
            is_random,
        }
    }
}

impl From<&QueueEntry> for QueueEntryInfo {
    fn from(entry: &QueueEntry) -> Self {
        QueueEntryInfo {
            entry_id: entry.entry_id,
            media_id: entry.media_id,
            is_random: entry.is_random,
        }
    }
}

/// Where a new entry goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueuePosition {
    /// Directly after the current entry (index 1)
    Next,
    /// At the end of the queue
    #[default]
    Last,
    /// Directly after the entry with this id
    After(Uuid),
}

impl FromStr for QueuePosition {
    type Err = Error;

    /// Accepts `"next"`, `"last"` or a queue entry UUID
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "next" => Ok(QueuePosition::Next),
            "last" => Ok(QueuePosition::Last),
            other => uuid_utils::parse(other)
                .map(QueuePosition::After)
                .map_err(|_| {
                    Error::InvalidInput(format!(
                        "position must be \"next\", \"last\" or a queue entry id, got \"{}\"",
                        other
                    ))
                }),
        }
    }
}

impl std::fmt::Display for QueuePosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueuePosition::Next => write!(f, "next"),
            QueuePosition::Last => write!(f, "last"),
            QueuePosition::After(id) => write!(f, "{}", id),
        }
    }
}

/// Catalog view of a song
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    pub id: MediaId,
    pub album_id: MediaId,
    pub artist_id: MediaId,
    pub duration_secs: u32,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub hated: bool,
    #[serde(default)]
    pub bad_audio: bool,
    #[serde(default)]
    pub live_recording: bool,
}

/// Catalog view of a video
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Video {
    pub id: MediaId,
    pub artist_id: MediaId,
    pub duration_secs: u32,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub hated: bool,
}

/// A genre tag attached to a song
///
/// Unconfirmed tags were assigned automatically and may be wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenreTag {
    pub tag_id: TagId,
    pub confirmed: bool,
}

/// Declarative constraints for one selection attempt
///
/// Built fresh from the reloaded configuration and the active tag filter
/// before every top-level selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionConstraints {
    pub exclude_disabled: bool,
    pub exclude_hated: bool,
    pub exclude_bad_audio: bool,
    pub exclude_live_recordings: bool,
    pub min_duration_secs: u32,
    pub max_duration_secs: u32,
    pub max_tries: u32,
    pub active_tag_ids: BTreeSet<TagId>,
}

impl SelectionConstraints {
    pub fn from_config(config: &EngineConfig, active_tag_ids: BTreeSet<TagId>) -> Self {
        let c = &config.constraints;
        Self {
            exclude_disabled: c.no_disabled,
            exclude_hated: c.no_hated,
            exclude_bad_audio: c.no_bad_audio,
            exclude_live_recordings: c.no_live_music,
            min_duration_secs: c.min_song_length,
            max_duration_secs: c.max_song_length,
            max_tries: config.limits.max_tries,
            active_tag_ids,
        }
    }

    /// Whether a song passes the flag and duration constraints
    ///
    /// Tag filtering is the catalog's concern and is not checked here.
    pub fn admits_song(&self, song: &Song) -> bool {
        !(self.exclude_disabled && song.disabled)
            && !(self.exclude_hated && song.hated)
            && !(self.exclude_bad_audio && song.bad_audio)
            && !(self.exclude_live_recordings && song.live_recording)
            && self.admits_duration(song.duration_secs)
    }

    /// Whether a video passes the flag and duration constraints
    pub fn admits_video(&self, video: &Video) -> bool {
        !(self.exclude_disabled && video.disabled)
            && !(self.exclude_hated && video.hated)
            && self.admits_duration(video.duration_secs)
    }

    fn admits_duration(&self, duration_secs: u32) -> bool {
        duration_secs >= self.min_duration_secs && duration_secs <= self.max_duration_secs
    }
}

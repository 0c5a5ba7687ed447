//! Exclusion List Manager
//!
//! Remembers, per category, the most recently played identifiers for a
//! configured time so the next random choice does not repeat them.
//!
//! There are four FIFO lists: songs, albums, artists and videos. Each list has
//! a fixed number of slots (its capacity). Adding an id pushes it onto the
//! tail and drops the head, so the length never changes. Entries older than
//! `max_age_hours` are expired in place: the slot stays, its id and timestamp
//! become `None`. A capacity of `0` disables a category.
//!
//! All four lists share one lock. Compound operations (record a song into
//! three lists, validate, persist) run under a single acquisition.

use crate::model::{MediaId, Song, Video};
use crate::persistence::StateStore;
use parking_lot::Mutex;
use pce_common::config::ExclusionConfig;
use pce_common::time::Clock;
use pce_common::Error;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

/// One exclusion list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExclusionCategory {
    Song,
    Album,
    Artist,
    Video,
}

impl ExclusionCategory {
    pub const ALL: [ExclusionCategory; 4] = [
        ExclusionCategory::Song,
        ExclusionCategory::Album,
        ExclusionCategory::Artist,
        ExclusionCategory::Video,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ExclusionCategory::Song => "song",
            ExclusionCategory::Album => "album",
            ExclusionCategory::Artist => "artist",
            ExclusionCategory::Video => "video",
        }
    }
}

impl std::fmt::Display for ExclusionCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ExclusionCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "song" | "songs" => Ok(ExclusionCategory::Song),
            "album" | "albums" => Ok(ExclusionCategory::Album),
            "artist" | "artists" => Ok(ExclusionCategory::Artist),
            "video" | "videos" => Ok(ExclusionCategory::Video),
            other => Err(Error::InvalidInput(format!(
                "exclusion category must be \"song\", \"album\", \"artist\" or \"video\", got \"{}\"",
                other
            ))),
        }
    }
}

/// One slot of an exclusion list
///
/// Both fields are `None` for an unfilled or expired slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExclusionEntry {
    pub id: Option<MediaId>,
    /// Unix seconds when the id was added
    pub timestamp: Option<i64>,
}

impl ExclusionEntry {
    pub fn new(id: MediaId, timestamp: i64) -> Self {
        Self {
            id: Some(id),
            timestamp: Some(timestamp),
        }
    }
}

/// Number of slots per list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExclusionCapacities {
    pub song: usize,
    pub album: usize,
    pub artist: usize,
    pub video: usize,
}

impl ExclusionCapacities {
    pub fn from_config(config: &ExclusionConfig) -> Self {
        Self {
            song: config.song_list_length,
            album: config.album_list_length,
            artist: config.artist_list_length,
            video: config.video_list_length,
        }
    }

    pub fn get(&self, category: ExclusionCategory) -> usize {
        match category {
            ExclusionCategory::Song => self.song,
            ExclusionCategory::Album => self.album,
            ExclusionCategory::Artist => self.artist,
            ExclusionCategory::Video => self.video,
        }
    }
}

/// The four lists, oldest entry first
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExclusionLists {
    #[serde(default)]
    pub songs: VecDeque<ExclusionEntry>,
    #[serde(default)]
    pub albums: VecDeque<ExclusionEntry>,
    #[serde(default)]
    pub artists: VecDeque<ExclusionEntry>,
    #[serde(default)]
    pub videos: VecDeque<ExclusionEntry>,
}

impl ExclusionLists {
    /// Lists with every slot unfilled
    pub fn empty(capacities: ExclusionCapacities) -> Self {
        let slots = |n: usize| VecDeque::from(vec![ExclusionEntry::default(); n]);
        Self {
            songs: slots(capacities.song),
            albums: slots(capacities.album),
            artists: slots(capacities.artist),
            videos: slots(capacities.video),
        }
    }

    pub fn list(&self, category: ExclusionCategory) -> &VecDeque<ExclusionEntry> {
        match category {
            ExclusionCategory::Song => &self.songs,
            ExclusionCategory::Album => &self.albums,
            ExclusionCategory::Artist => &self.artists,
            ExclusionCategory::Video => &self.videos,
        }
    }

    fn list_mut(&mut self, category: ExclusionCategory) -> &mut VecDeque<ExclusionEntry> {
        match category {
            ExclusionCategory::Song => &mut self.songs,
            ExclusionCategory::Album => &mut self.albums,
            ExclusionCategory::Artist => &mut self.artists,
            ExclusionCategory::Video => &mut self.videos,
        }
    }

    /// Fit stored lists to the configured capacities
    ///
    /// Keeps the newest entries when a list is too long and pads with
    /// unfilled slots at the head (oldest end) when it is too short.
    pub fn resized(mut self, capacities: ExclusionCapacities) -> Self {
        for category in ExclusionCategory::ALL {
            let capacity = capacities.get(category);
            let list = self.list_mut(category);
            while list.len() > capacity {
                list.pop_front();
            }
            while list.len() < capacity {
                list.push_front(ExclusionEntry::default());
            }
        }
        self
    }

    /// Push onto the tail, dropping the head. No-op for a zero-length list.
    fn push(&mut self, category: ExclusionCategory, id: MediaId, now: i64) {
        let list = self.list_mut(category);
        if list.is_empty() {
            return;
        }
        list.pop_front();
        list.push_back(ExclusionEntry::new(id, now));
    }

    /// Null out entries older than `cutoff`, returning how many expired
    fn expire(&mut self, category: ExclusionCategory, cutoff: i64) -> usize {
        let mut expired = 0;
        for entry in self.list_mut(category).iter_mut() {
            match entry.timestamp {
                Some(timestamp) if timestamp < cutoff => {
                    *entry = ExclusionEntry::default();
                    expired += 1;
                }
                _ => {}
            }
        }
        expired
    }

    fn ids(&self, category: ExclusionCategory) -> Vec<MediaId> {
        self.list(category).iter().filter_map(|entry| entry.id).collect()
    }
}

/// Shared owner of the four exclusion lists
pub struct ExclusionListManager {
    lists: Mutex<ExclusionLists>,
    capacities: ExclusionCapacities,
    max_age_hours: u32,
    clock: Arc<dyn Clock>,
    store: Arc<dyn StateStore>,
}

impl ExclusionListManager {
    /// Create the manager, restoring lists from the store
    ///
    /// A failing load is logged and the lists start out empty.
    pub fn new(config: &ExclusionConfig, store: Arc<dyn StateStore>, clock: Arc<dyn Clock>) -> Self {
        let capacities = ExclusionCapacities::from_config(config);
        let lists = match store.load_exclusion_lists(capacities) {
            Ok(lists) => lists,
            Err(e) => {
                warn!(
                    "Loading exclusion lists failed: {}. Starting with empty lists",
                    e
                );
                ExclusionLists::empty(capacities)
            }
        };
        Self::with_lists(config, lists, store, clock)
    }

    /// Create the manager from explicit lists (resized to the configured capacities)
    pub fn with_lists(
        config: &ExclusionConfig,
        lists: ExclusionLists,
        store: Arc<dyn StateStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let capacities = ExclusionCapacities::from_config(config);
        Self {
            lists: Mutex::new(lists.resized(capacities)),
            capacities,
            max_age_hours: config.max_age_hours,
            clock,
            store,
        }
    }

    pub fn capacity(&self, category: ExclusionCategory) -> usize {
        self.capacities.get(category)
    }

    pub fn max_age_hours(&self) -> u32 {
        self.max_age_hours
    }

    fn is_enabled(&self, category: ExclusionCategory) -> bool {
        self.capacity(category) > 0
    }

    fn cutoff(&self) -> i64 {
        self.clock.unix_now() - i64::from(self.max_age_hours) * 3600
    }

    /// Push one id onto a list, validate it and persist all lists
    pub fn add_entry(&self, category: ExclusionCategory, id: MediaId) {
        if !self.is_enabled(category) {
            return;
        }
        let mut lists = self.lists.lock();
        lists.push(category, id, self.clock.unix_now());
        self.validate_locked(&mut lists, category);
        self.persist_locked(&lists);
    }

    /// Expire entries older than the configured maximum age
    pub fn validate(&self, category: ExclusionCategory) {
        let mut lists = self.lists.lock();
        self.validate_locked(&mut lists, category);
    }

    fn validate_locked(&self, lists: &mut ExclusionLists, category: ExclusionCategory) {
        let expired = lists.expire(category, self.cutoff());
        if expired > 0 {
            debug!(
                "{} entries from exclusion list \"{}\" expired",
                expired, category
            );
        }
    }

    /// Ids currently on a list (validated first)
    pub fn active_ids(&self, category: ExclusionCategory) -> Vec<MediaId> {
        let mut lists = self.lists.lock();
        self.validate_locked(&mut lists, category);
        lists.ids(category)
    }

    pub fn contains(&self, category: ExclusionCategory, id: MediaId) -> bool {
        self.active_ids(category).contains(&id)
    }

    /// Put a played song onto the artist, album and song lists
    pub fn record_song(&self, song: &Song) {
        debug!("Putting song {} onto the exclusion lists", song.id);
        let now = self.clock.unix_now();
        let mut lists = self.lists.lock();

        let pushes = [
            (ExclusionCategory::Artist, song.artist_id),
            (ExclusionCategory::Album, song.album_id),
            (ExclusionCategory::Song, song.id),
        ];
        for (category, id) in pushes {
            if self.is_enabled(category) {
                lists.push(category, id, now);
            }
        }
        for category in [
            ExclusionCategory::Song,
            ExclusionCategory::Album,
            ExclusionCategory::Artist,
        ] {
            self.validate_locked(&mut lists, category);
        }
        self.persist_locked(&lists);
    }

    /// Put a played video onto the video list
    ///
    /// The video's artist is not recorded.
    pub fn record_video(&self, video_id: MediaId) {
        debug!("Putting video {} onto the exclusion list", video_id);
        self.add_entry(ExclusionCategory::Video, video_id);
    }

    /// Whether a song, its album or its artist was played recently
    pub fn is_song_excluded(&self, song: &Song) -> bool {
        let mut lists = self.lists.lock();
        let checks = [
            (ExclusionCategory::Artist, song.artist_id),
            (ExclusionCategory::Album, song.album_id),
            (ExclusionCategory::Song, song.id),
        ];
        for (category, id) in checks {
            if !self.is_enabled(category) {
                continue;
            }
            self.validate_locked(&mut lists, category);
            if lists.ids(category).contains(&id) {
                debug!("{} {} is on the exclusion list", category, id);
                return true;
            }
        }
        false
    }

    /// Whether a song id is on the song list (album and artist ignored)
    pub fn is_song_id_excluded(&self, song_id: MediaId) -> bool {
        self.is_enabled(ExclusionCategory::Song)
            && self.contains(ExclusionCategory::Song, song_id)
    }

    /// Whether a video was played recently
    ///
    /// An artist hit is only logged: videos do not take part in artist
    /// exclusion.
    pub fn is_video_excluded(&self, video: &Video) -> bool {
        let mut lists = self.lists.lock();
        if self.is_enabled(ExclusionCategory::Artist) {
            self.validate_locked(&mut lists, ExclusionCategory::Artist);
            if lists.ids(ExclusionCategory::Artist).contains(&video.artist_id) {
                debug!(
                    "Artist {} of video {} is on the artist exclusion list, ignored for videos",
                    video.artist_id, video.id
                );
            }
        }
        if self.is_enabled(ExclusionCategory::Video) {
            self.validate_locked(&mut lists, ExclusionCategory::Video);
            if lists.ids(ExclusionCategory::Video).contains(&video.id) {
                debug!("video {} is on the exclusion list", video.id);
                return true;
            }
        }
        false
    }

    /// Copy of all four lists
    pub fn snapshot(&self) -> ExclusionLists {
        self.lists.lock().clone()
    }

    fn persist_locked(&self, lists: &ExclusionLists) {
        if let Err(e) = self.store.save_exclusion_lists(lists) {
            warn!(
                "Saving exclusion lists failed: {}. Continuing without saving",
                e
            );
        }
    }
}

impl std::fmt::Debug for ExclusionListManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExclusionListManager")
            .field("capacities", &self.capacities)
            .field("max_age_hours", &self.max_age_hours)
            .finish()
    }
}

//! Catalog and tag filter contracts
//!
//! The catalog itself is external state. The engine only needs random
//! candidate lookup under constraints plus a few by-id lookups.
//! [`MemoryCatalog`] is a complete in-memory implementation, used by embedding
//! applications without a database and by the tests.

use crate::model::{GenreTag, MediaId, SelectionConstraints, Song, TagId, Video};
use parking_lot::RwLock;
use pce_common::Result;
use rand::seq::SliceRandom;
use std::collections::{BTreeSet, HashMap};

/// Catalog query contract
pub trait Catalog: Send + Sync {
    /// One random song matching the constraints
    ///
    /// `active_tag_ids` filters by album genre (empty = whole collection).
    /// `album_id` restricts the choice to a single album.
    /// `Ok(None)` means no song satisfies the query at all.
    fn random_song(
        &self,
        active_tag_ids: &BTreeSet<TagId>,
        constraints: &SelectionConstraints,
        album_id: Option<MediaId>,
    ) -> Result<Option<Song>>;

    /// One random video matching the constraints
    fn random_video(
        &self,
        active_tag_ids: &BTreeSet<TagId>,
        constraints: &SelectionConstraints,
    ) -> Result<Option<Video>>;

    fn song(&self, id: MediaId) -> Result<Option<Song>>;

    /// Genre tags attached directly to a song
    fn song_genre_tags(&self, song_id: MediaId) -> Result<Vec<GenreTag>>;
}

/// Source of the user-selected genre/sub-genre filter
pub trait TagFilter: Send + Sync {
    fn active_tag_ids(&self) -> BTreeSet<TagId>;
}

/// Tag filter held in memory
#[derive(Debug, Default)]
pub struct StaticTagFilter {
    tags: RwLock<BTreeSet<TagId>>,
}

impl StaticTagFilter {
    pub fn new(tags: impl IntoIterator<Item = TagId>) -> Self {
        Self {
            tags: RwLock::new(tags.into_iter().collect()),
        }
    }

    pub fn enable(&self, tag_id: TagId) {
        self.tags.write().insert(tag_id);
    }

    pub fn disable(&self, tag_id: TagId) {
        self.tags.write().remove(&tag_id);
    }
}

impl TagFilter for StaticTagFilter {
    fn active_tag_ids(&self) -> BTreeSet<TagId> {
        self.tags.read().clone()
    }
}

#[derive(Debug, Default)]
struct CatalogData {
    songs: HashMap<MediaId, Song>,
    videos: HashMap<MediaId, Video>,
    album_tags: HashMap<MediaId, BTreeSet<TagId>>,
    video_tags: HashMap<MediaId, BTreeSet<TagId>>,
    song_tags: HashMap<MediaId, Vec<GenreTag>>,
}

/// In-memory catalog
///
/// Genre filtering follows the album: a song matches the active filter when
/// its album carries one of the active tags. Song-level tags are only
/// reported through [`Catalog::song_genre_tags`].
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    data: RwLock<CatalogData>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_song(&self, song: Song) {
        self.data.write().songs.insert(song.id, song);
    }

    pub fn insert_video(&self, video: Video) {
        self.data.write().videos.insert(video.id, video);
    }

    pub fn set_album_tags(&self, album_id: MediaId, tags: impl IntoIterator<Item = TagId>) {
        self.data
            .write()
            .album_tags
            .insert(album_id, tags.into_iter().collect());
    }

    pub fn set_video_tags(&self, video_id: MediaId, tags: impl IntoIterator<Item = TagId>) {
        self.data
            .write()
            .video_tags
            .insert(video_id, tags.into_iter().collect());
    }

    pub fn set_song_tags(&self, song_id: MediaId, tags: Vec<GenreTag>) {
        self.data.write().song_tags.insert(song_id, tags);
    }

    fn matches_filter(tags: Option<&BTreeSet<TagId>>, active: &BTreeSet<TagId>) -> bool {
        if active.is_empty() {
            return true;
        }
        tags.map_or(false, |tags| !tags.is_disjoint(active))
    }
}

impl Catalog for MemoryCatalog {
    fn random_song(
        &self,
        active_tag_ids: &BTreeSet<TagId>,
        constraints: &SelectionConstraints,
        album_id: Option<MediaId>,
    ) -> Result<Option<Song>> {
        let data = self.data.read();
        let candidates: Vec<&Song> = data
            .songs
            .values()
            .filter(|song| album_id.map_or(true, |album| song.album_id == album))
            .filter(|song| constraints.admits_song(song))
            .filter(|song| {
                Self::matches_filter(data.album_tags.get(&song.album_id), active_tag_ids)
            })
            .collect();

        Ok(candidates
            .choose(&mut rand::thread_rng())
            .map(|song| (*song).clone()))
    }

    fn random_video(
        &self,
        active_tag_ids: &BTreeSet<TagId>,
        constraints: &SelectionConstraints,
    ) -> Result<Option<Video>> {
        let data = self.data.read();
        let candidates: Vec<&Video> = data
            .videos
            .values()
            .filter(|video| constraints.admits_video(video))
            .filter(|video| Self::matches_filter(data.video_tags.get(&video.id), active_tag_ids))
            .collect();

        Ok(candidates
            .choose(&mut rand::thread_rng())
            .map(|video| (*video).clone()))
    }

    fn song(&self, id: MediaId) -> Result<Option<Song>> {
        Ok(self.data.read().songs.get(&id).cloned())
    }

    fn song_genre_tags(&self, song_id: MediaId) -> Result<Vec<GenreTag>> {
        Ok(self
            .data
            .read()
            .song_tags
            .get(&song_id)
            .cloned()
            .unwrap_or_default())
    }
}

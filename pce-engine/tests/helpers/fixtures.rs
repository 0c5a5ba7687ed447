//! Test engine construction and stub collaborators

use parking_lot::Mutex;
use pce_common::config::{EngineConfig, StaticSettings};
use pce_common::events::QueueEvent;
use pce_common::time::ManualClock;
use pce_common::{Error, Result};
use pce_engine::catalog::{Catalog, MemoryCatalog, StaticTagFilter};
use pce_engine::exclusion::{ExclusionCapacities, ExclusionLists};
use pce_engine::model::{GenreTag, MediaId, MediaKind, QueueEntry, SelectionConstraints, Song, TagId, Video};
use pce_engine::persistence::{NullStateStore, StateStore};
use pce_engine::queue_manager::PlaybackQueue;
use pce_engine::EngineContext;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const START: i64 = 1_700_000_000;

pub fn song(id: MediaId, album_id: MediaId, artist_id: MediaId) -> Song {
    Song {
        id,
        album_id,
        artist_id,
        duration_secs: 240,
        disabled: false,
        hated: false,
        bad_audio: false,
        live_recording: false,
    }
}

pub fn video(id: MediaId, artist_id: MediaId) -> Video {
    Video {
        id,
        artist_id,
        duration_secs: 240,
        disabled: false,
        hated: false,
    }
}

/// In-memory catalog that counts random lookups
#[derive(Debug, Default)]
pub struct CountingCatalog {
    pub inner: MemoryCatalog,
    song_queries: AtomicUsize,
    video_queries: AtomicUsize,
}

impl CountingCatalog {
    /// Catalog with one song per id, each on its own album and artist
    pub fn with_songs(ids: impl IntoIterator<Item = MediaId>) -> Self {
        let catalog = Self::default();
        for id in ids {
            catalog.inner.insert_song(song(id, id * 10, id * 100));
        }
        catalog
    }

    pub fn song_queries(&self) -> usize {
        self.song_queries.load(Ordering::SeqCst)
    }

    pub fn video_queries(&self) -> usize {
        self.video_queries.load(Ordering::SeqCst)
    }
}

impl Catalog for CountingCatalog {
    fn random_song(
        &self,
        active_tag_ids: &BTreeSet<TagId>,
        constraints: &SelectionConstraints,
        album_id: Option<MediaId>,
    ) -> Result<Option<Song>> {
        self.song_queries.fetch_add(1, Ordering::SeqCst);
        self.inner.random_song(active_tag_ids, constraints, album_id)
    }

    fn random_video(
        &self,
        active_tag_ids: &BTreeSet<TagId>,
        constraints: &SelectionConstraints,
    ) -> Result<Option<Video>> {
        self.video_queries.fetch_add(1, Ordering::SeqCst);
        self.inner.random_video(active_tag_ids, constraints)
    }

    fn song(&self, id: MediaId) -> Result<Option<Song>> {
        self.inner.song(id)
    }

    fn song_genre_tags(&self, song_id: MediaId) -> Result<Vec<GenreTag>> {
        self.inner.song_genre_tags(song_id)
    }
}

/// Store whose every operation fails
#[derive(Debug, Default)]
pub struct FailingStateStore {
    pub saves: AtomicUsize,
}

impl FailingStateStore {
    fn failure() -> Error {
        Error::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only state folder",
        ))
    }
}

impl StateStore for FailingStateStore {
    fn load_queue(&self, _kind: MediaKind) -> Result<Vec<QueueEntry>> {
        Err(Self::failure())
    }

    fn save_queue(&self, _kind: MediaKind, _entries: &[QueueEntry]) -> Result<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        Err(Self::failure())
    }

    fn load_exclusion_lists(&self, _capacities: ExclusionCapacities) -> Result<ExclusionLists> {
        Err(Self::failure())
    }

    fn save_exclusion_lists(&self, _lists: &ExclusionLists) -> Result<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        Err(Self::failure())
    }
}

/// Engine wired to test collaborators
pub struct TestEngine {
    pub context: EngineContext,
    pub catalog: Arc<CountingCatalog>,
    pub settings: Arc<StaticSettings>,
    pub tags: Arc<StaticTagFilter>,
    pub clock: Arc<ManualClock>,
}

impl TestEngine {
    pub fn new(config: EngineConfig, catalog: CountingCatalog) -> Self {
        Self::with_store(config, catalog, Arc::new(NullStateStore))
    }

    pub fn with_store(config: EngineConfig, catalog: CountingCatalog, store: Arc<dyn StateStore>) -> Self {
        let catalog = Arc::new(catalog);
        let settings = Arc::new(StaticSettings::new(config));
        let tags = Arc::new(StaticTagFilter::default());
        let clock = Arc::new(ManualClock::new(START));
        let context = EngineContext::new(
            settings.clone(),
            catalog.clone(),
            tags.clone(),
            store,
            clock.clone(),
        )
        .expect("engine context");

        Self {
            context,
            catalog,
            settings,
            tags,
            clock,
        }
    }

    pub fn songs(&self) -> &PlaybackQueue {
        &self.context.song_queue
    }

    pub fn videos(&self) -> &PlaybackQueue {
        &self.context.video_queue
    }
}

pub fn media_ids(queue: &PlaybackQueue) -> Vec<MediaId> {
    queue.list().iter().map(|entry| entry.media_id).collect()
}

/// Record the names of all events a queue emits
pub fn record_events(queue: &PlaybackQueue) -> Arc<Mutex<Vec<QueueEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    queue.register_listener(move |event: &QueueEvent| {
        sink.lock().push(event.clone());
        Ok(())
    });
    events
}

pub fn event_names(events: &Mutex<Vec<QueueEvent>>) -> Vec<&'static str> {
    events.lock().iter().map(|event| event.event_name()).collect()
}

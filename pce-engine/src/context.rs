//! Engine context
//!
//! Owns the shared exclusion lists, the selector and both playback queues.
//! Everything is constructed explicitly and injected; there is no global state.

use crate::catalog::{Catalog, TagFilter};
use crate::exclusion::ExclusionListManager;
use crate::model::MediaKind;
use crate::persistence::{JsonStateStore, StateStore};
use crate::queue_manager::PlaybackQueue;
use crate::selector::RandomSelector;
use pce_common::config::{resolve_state_dir, SettingsSource, TomlSettingsFile};
use pce_common::time::{Clock, SystemClock};
use pce_common::Result;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Application-level owner of all engine components
#[derive(Debug)]
pub struct EngineContext {
    pub exclusions: Arc<ExclusionListManager>,
    pub selector: Arc<RandomSelector>,
    pub song_queue: PlaybackQueue,
    pub video_queue: PlaybackQueue,
}

impl EngineContext {
    /// Wire up the engine from its collaborators
    ///
    /// Exclusion list capacities and maximum age are read once from the
    /// settings; constraints and `max_tries` are reloaded on every selection.
    pub fn new(
        settings: Arc<dyn SettingsSource>,
        catalog: Arc<dyn Catalog>,
        tags: Arc<dyn TagFilter>,
        store: Arc<dyn StateStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let config = settings.reload()?;

        let exclusions = Arc::new(ExclusionListManager::new(
            &config.exclusion,
            store.clone(),
            clock,
        ));
        let selector = Arc::new(RandomSelector::new(
            catalog.clone(),
            exclusions.clone(),
            settings,
            tags,
        ));

        let song_queue = PlaybackQueue::new(
            MediaKind::Song,
            selector.clone(),
            exclusions.clone(),
            catalog.clone(),
            store.clone(),
        );
        let video_queue = PlaybackQueue::new(
            MediaKind::Video,
            selector.clone(),
            exclusions.clone(),
            catalog,
            store,
        );

        Ok(Self {
            exclusions,
            selector,
            song_queue,
            video_queue,
        })
    }

    /// Engine backed by a TOML settings file and JSON state files
    ///
    /// `state_dir` overrides the state folder; otherwise it is resolved from
    /// the environment, the settings file, then the OS default.
    pub fn open(
        config_path: &Path,
        state_dir: Option<&Path>,
        catalog: Arc<dyn Catalog>,
        tags: Arc<dyn TagFilter>,
    ) -> Result<Self> {
        let settings = TomlSettingsFile::new(config_path);
        let config = settings.reload()?;
        let state_dir = resolve_state_dir(state_dir, Some(&config));
        info!("Using state folder {}", state_dir.display());

        let store = JsonStateStore::new(state_dir)?;
        Self::new(
            Arc::new(settings),
            catalog,
            tags,
            Arc::new(store),
            Arc::new(SystemClock),
        )
    }

    /// Queue for the given media kind
    pub fn queue(&self, kind: MediaKind) -> &PlaybackQueue {
        match kind {
            MediaKind::Song => &self.song_queue,
            MediaKind::Video => &self.video_queue,
        }
    }
}

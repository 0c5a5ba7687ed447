//! Random Candidate Selector
//!
//! Chooses a random song or video in a two-stage process:
//!
//! 1. **Constrained lookup:** the catalog proposes one random candidate that
//!    satisfies the configured constraints and the active genre filter.
//! 2. **Anti-repetition check:** candidates found on the exclusion lists are
//!    discarded and the lookup is repeated.
//!
//! Every catalog query consumes one of `max_tries` attempts, so a selection
//! never runs unbounded even when the constraints are too tight. Running out
//! of attempts is an expected outcome and is reported as `Ok(None)`; only
//! unexpected catalog or configuration failures are errors.

use crate::catalog::{Catalog, TagFilter};
use crate::exclusion::ExclusionListManager;
use crate::model::{MediaId, MediaKind, SelectionConstraints, Song, TagId, Video};
use pce_common::config::SettingsSource;
use pce_common::{Error, Result};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, warn};

/// A selected song or video
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
    Song(Song),
    Video(Video),
}

impl Candidate {
    pub fn media_id(&self) -> MediaId {
        match self {
            Candidate::Song(song) => song.id,
            Candidate::Video(video) => video.id,
        }
    }

    pub fn kind(&self) -> MediaKind {
        match self {
            Candidate::Song(_) => MediaKind::Song,
            Candidate::Video(_) => MediaKind::Video,
        }
    }
}

/// Bounded-retry random selection under constraints
pub struct RandomSelector {
    catalog: Arc<dyn Catalog>,
    exclusions: Arc<ExclusionListManager>,
    settings: Arc<dyn SettingsSource>,
    tags: Arc<dyn TagFilter>,
}

impl RandomSelector {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        exclusions: Arc<ExclusionListManager>,
        settings: Arc<dyn SettingsSource>,
        tags: Arc<dyn TagFilter>,
    ) -> Self {
        Self {
            catalog,
            exclusions,
            settings,
            tags,
        }
    }

    /// Reload settings and the tag filter for a new top-level selection
    fn load_constraints(&self) -> Result<SelectionConstraints> {
        let config = self.settings.reload()?;
        let active_tag_ids = self.tags.active_tag_ids();
        Ok(SelectionConstraints::from_config(&config, active_tag_ids))
    }

    /// Select a song or video for the given queue kind
    ///
    /// `album_id` forces an album-scoped song selection and is invalid for videos.
    pub fn select(&self, kind: MediaKind, album_id: Option<MediaId>) -> Result<Option<Candidate>> {
        match (kind, album_id) {
            (MediaKind::Song, None) => Ok(self.select_song()?.map(Candidate::Song)),
            (MediaKind::Song, Some(album_id)) => {
                Ok(self.select_song_from_album(album_id)?.map(Candidate::Song))
            }
            (MediaKind::Video, None) => Ok(self.select_video()?.map(Candidate::Video)),
            (MediaKind::Video, Some(album_id)) => Err(Error::InvalidInput(format!(
                "videos cannot be selected from an album (album id {})",
                album_id
            ))),
        }
    }

    /// Random song from the active genres that was not played recently
    pub fn select_song(&self) -> Result<Option<Song>> {
        debug!("Looking for a random song");
        let started = Instant::now();
        let constraints = self.load_constraints()?;
        log_filter(&constraints.active_tag_ids);

        for attempt in 1..=constraints.max_tries {
            // Stage 1: constrained candidate lookup
            let song = match self.catalog.random_song(
                &constraints.active_tag_ids,
                &constraints,
                None,
            )? {
                Some(song) => song,
                None => {
                    error!("There is no song fulfilling the constraints, check the selection constraints");
                    return Ok(None);
                }
            };
            debug!("Candidate for next song: {} (attempt {})", song.id, attempt);

            if !self.song_genre_matches(&song, &constraints.active_tag_ids)? {
                continue;
            }

            // Stage 2: anti-repetition check
            if self.exclusions.is_song_excluded(&song) {
                continue;
            }

            debug!(
                "Found song {} after {} attempts in {:?}",
                song.id,
                attempt,
                started.elapsed()
            );
            return Ok(Some(song));
        }

        error!(
            "There was no valid song found within {} tries, check the constraints",
            constraints.max_tries
        );
        Ok(None)
    }

    /// Confirmed song-level genres must overlap the active filter
    ///
    /// The catalog filters by album genre; a song may carry a different genre
    /// of its own. Only user-confirmed tags count, automatically assigned tags
    /// never block a candidate.
    fn song_genre_matches(&self, song: &Song, active: &BTreeSet<TagId>) -> Result<bool> {
        if active.is_empty() {
            return Ok(true);
        }
        let confirmed: BTreeSet<TagId> = self
            .catalog
            .song_genre_tags(song.id)?
            .into_iter()
            .filter(|tag| tag.confirmed)
            .map(|tag| tag.tag_id)
            .collect();

        if confirmed.is_empty() {
            debug!("Song {} has no confirmed genre, assuming the album genre", song.id);
            return Ok(true);
        }
        if confirmed.is_disjoint(active) {
            debug!(
                "Song {} genres {:?} are not among the active genres",
                song.id, confirmed
            );
            return Ok(false);
        }
        Ok(true)
    }

    /// Random song from a specific album
    ///
    /// The genre filter and the album/artist exclusion lists are ignored
    /// because the user picked the album. An album has few songs, so when every
    /// attempt hits the song exclusion list the last rejected candidate is
    /// returned anyway. `Ok(None)` only if the album yielded no candidate at all.
    pub fn select_song_from_album(&self, album_id: MediaId) -> Result<Option<Song>> {
        debug!("Looking for a random song from album {}", album_id);
        let constraints = self.load_constraints()?;
        let no_filter = BTreeSet::new();
        let mut fallback: Option<Song> = None;

        for attempt in 1..=constraints.max_tries {
            let song = match self
                .catalog
                .random_song(&no_filter, &constraints, Some(album_id))?
            {
                Some(song) => song,
                None => break,
            };
            debug!("Candidate for next song: {} (attempt {})", song.id, attempt);

            if self.exclusions.is_song_id_excluded(song.id) {
                fallback = Some(song);
                continue;
            }

            debug!("Found song {} from album {} after {} attempts", song.id, album_id, attempt);
            return Ok(Some(song));
        }

        match fallback {
            Some(song) => {
                warn!(
                    "All tried songs of album {} were played recently, using song {} anyway",
                    album_id, song.id
                );
                Ok(Some(song))
            }
            None => {
                error!(
                    "Album {} has no song fulfilling the constraints",
                    album_id
                );
                Ok(None)
            }
        }
    }

    /// Random video from the active genres that was not played recently
    pub fn select_video(&self) -> Result<Option<Video>> {
        debug!("Looking for a random video");
        let started = Instant::now();
        let constraints = self.load_constraints()?;
        log_filter(&constraints.active_tag_ids);

        for attempt in 1..=constraints.max_tries {
            let video = match self
                .catalog
                .random_video(&constraints.active_tag_ids, &constraints)?
            {
                Some(video) => video,
                None => {
                    error!("There is no video fulfilling the constraints, check the selection constraints");
                    return Ok(None);
                }
            };
            debug!("Candidate for next video: {} (attempt {})", video.id, attempt);

            if self.exclusions.is_video_excluded(&video) {
                continue;
            }

            debug!(
                "Found video {} after {} attempts in {:?}",
                video.id,
                attempt,
                started.elapsed()
            );
            return Ok(Some(video));
        }

        error!(
            "There was no valid video found within {} tries, check the constraints",
            constraints.max_tries
        );
        Ok(None)
    }
}

fn log_filter(active: &BTreeSet<TagId>) {
    if active.is_empty() {
        warn!("No genre selected, selecting from the whole collection");
    } else {
        debug!("Genre filter: {:?}", active);
    }
}

impl std::fmt::Debug for RandomSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RandomSelector")
            .field("exclusions", &self.exclusions)
            .finish()
    }
}

//! Persistence of queues and exclusion lists
//!
//! Saving is best effort: callers log a failed save and keep going, the
//! in-memory state stays authoritative.

use crate::exclusion::{ExclusionCapacities, ExclusionLists};
use crate::model::{MediaKind, QueueEntry};
use pce_common::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// Persistence contract
pub trait StateStore: Send + Sync {
    /// Stored queue for `kind`, empty if nothing was stored yet
    fn load_queue(&self, kind: MediaKind) -> Result<Vec<QueueEntry>>;

    fn save_queue(&self, kind: MediaKind, entries: &[QueueEntry]) -> Result<()>;

    /// Stored exclusion lists, fitted to `capacities`
    fn load_exclusion_lists(&self, capacities: ExclusionCapacities) -> Result<ExclusionLists>;

    fn save_exclusion_lists(&self, lists: &ExclusionLists) -> Result<()>;
}

/// Store that keeps nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStateStore;

impl StateStore for NullStateStore {
    fn load_queue(&self, _kind: MediaKind) -> Result<Vec<QueueEntry>> {
        Ok(Vec::new())
    }

    fn save_queue(&self, _kind: MediaKind, _entries: &[QueueEntry]) -> Result<()> {
        Ok(())
    }

    fn load_exclusion_lists(&self, capacities: ExclusionCapacities) -> Result<ExclusionLists> {
        Ok(ExclusionLists::empty(capacities))
    }

    fn save_exclusion_lists(&self, _lists: &ExclusionLists) -> Result<()> {
        Ok(())
    }
}

/// JSON files in the state folder
///
/// | File                 | Content             |
/// |----------------------|---------------------|
/// | `songqueue.json`     | song queue entries  |
/// | `videoqueue.json`    | video queue entries |
/// | `exclusionlists.json`| all four lists      |
#[derive(Debug, Clone)]
pub struct JsonStateStore {
    dir: PathBuf,
}

impl JsonStateStore {
    /// Create the store, creating the folder if needed
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn queue_file(kind: MediaKind) -> &'static str {
        match kind {
            MediaKind::Song => "songqueue.json",
            MediaKind::Video => "videoqueue.json",
        }
    }

    fn read<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        let path = self.dir.join(name);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("State file {} does not exist yet", path.display());
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Write through a temporary file so a crash never leaves a torn file
    fn write<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.dir.join(name);
        let tmp = self.dir.join(format!("{}.tmp", name));
        let json = serde_json::to_vec_pretty(value)?;
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

impl StateStore for JsonStateStore {
    fn load_queue(&self, kind: MediaKind) -> Result<Vec<QueueEntry>> {
        Ok(self.read(Self::queue_file(kind))?.unwrap_or_default())
    }

    fn save_queue(&self, kind: MediaKind, entries: &[QueueEntry]) -> Result<()> {
        self.write(Self::queue_file(kind), entries)
    }

    fn load_exclusion_lists(&self, capacities: ExclusionCapacities) -> Result<ExclusionLists> {
        Ok(self
            .read::<ExclusionLists>("exclusionlists.json")?
            .unwrap_or_default()
            .resized(capacities))
    }

    fn save_exclusion_lists(&self, lists: &ExclusionLists) -> Result<()> {
        self.write("exclusionlists.json", lists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exclusion::{ExclusionCategory, ExclusionEntry};

    fn capacities() -> ExclusionCapacities {
        ExclusionCapacities {
            song: 3,
            album: 2,
            artist: 1,
            video: 0,
        }
    }

    #[test]
    fn test_missing_files_load_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStateStore::new(dir.path()).unwrap();

        assert!(store.load_queue(MediaKind::Song).unwrap().is_empty());
        let lists = store.load_exclusion_lists(capacities()).unwrap();
        assert_eq!(lists, ExclusionLists::empty(capacities()));
    }

    #[test]
    fn test_queue_saved_per_kind() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStateStore::new(dir.path()).unwrap();
        let songs = vec![QueueEntry::new(1, false), QueueEntry::new(2, true)];

        store.save_queue(MediaKind::Song, &songs).unwrap();
        assert_eq!(store.load_queue(MediaKind::Song).unwrap(), songs);
        assert!(store.load_queue(MediaKind::Video).unwrap().is_empty());
        assert!(dir.path().join("songqueue.json").exists());
        assert!(!dir.path().join("songqueue.json.tmp").exists());
    }

    #[test]
    fn test_exclusion_lists_refit_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStateStore::new(dir.path()).unwrap();

        let mut lists = ExclusionLists::empty(capacities());
        lists.songs = vec![
            ExclusionEntry::new(1, 100),
            ExclusionEntry::new(2, 200),
            ExclusionEntry::new(3, 300),
        ]
        .into();
        store.save_exclusion_lists(&lists).unwrap();

        let smaller = ExclusionCapacities { song: 2, ..capacities() };
        let loaded = store.load_exclusion_lists(smaller).unwrap();
        let ids: Vec<_> = loaded
            .list(ExclusionCategory::Song)
            .iter()
            .filter_map(|e| e.id)
            .collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStateStore::new(dir.path()).unwrap();
        fs::write(dir.path().join("songqueue.json"), "{ not json").unwrap();

        assert!(store.load_queue(MediaKind::Song).is_err());
    }
}

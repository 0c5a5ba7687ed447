//! Playback Queue Manager
//!
//! Keeps the ordered queue of songs or videos. Index 0 is the entry currently
//! playing, index 1 is "on deck". Whenever the queue drops below two entries
//! it is refilled from the [`RandomSelector`], so playback never runs dry as
//! long as the catalog can supply candidates.
//!
//! **Locking:** every operation holds the queue lock for its whole duration.
//! Refill, selection and exclusion recording run on the already-locked entries
//! through the `*_locked` helpers; the exclusion lock is only taken inside
//! those helpers (queue lock first, exclusion lock second). Events are
//! collected while locked and dispatched after the lock is released, so
//! listeners may call back into the queue.

use crate::catalog::Catalog;
use crate::exclusion::{ExclusionCategory, ExclusionListManager};
use crate::model::{MediaId, MediaKind, QueueEntry, QueuePosition};
use crate::persistence::StateStore;
use crate::selector::{Candidate, RandomSelector};
use parking_lot::Mutex;
use pce_common::events::{
    EventNotifier, ListenerId, QueueChangeTrigger, QueueEntryInfo, QueueEvent,
};
use pce_common::{time, Result};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Events raised by one operation, each kind at most once
#[derive(Debug, Default)]
struct PendingEvents {
    current: Option<Option<QueueEntryInfo>>,
    queue: Option<QueueChangeTrigger>,
}

impl PendingEvents {
    /// The first trigger of an operation names the change
    fn queue_changed(&mut self, trigger: QueueChangeTrigger) {
        if self.queue.is_none() {
            self.queue = Some(trigger);
        }
    }

    fn current_changed(&mut self, head: Option<&QueueEntry>) {
        self.current = Some(head.map(QueueEntryInfo::from));
    }
}

/// One playback queue (songs or videos)
pub struct PlaybackQueue {
    kind: MediaKind,
    entries: Mutex<Vec<QueueEntry>>,
    selector: Arc<RandomSelector>,
    exclusions: Arc<ExclusionListManager>,
    catalog: Arc<dyn Catalog>,
    store: Arc<dyn StateStore>,
    notifier: EventNotifier,
    auto_refill: bool,
}

impl PlaybackQueue {
    /// Create a queue, restoring its stored contents
    ///
    /// A failing load is logged and the queue starts out empty.
    pub fn new(
        kind: MediaKind,
        selector: Arc<RandomSelector>,
        exclusions: Arc<ExclusionListManager>,
        catalog: Arc<dyn Catalog>,
        store: Arc<dyn StateStore>,
    ) -> Self {
        let entries = match store.load_queue(kind) {
            Ok(entries) => {
                info!("Loaded {} entries into the {} queue", entries.len(), kind);
                entries
            }
            Err(e) => {
                warn!("Loading the {} queue failed: {}. Starting empty", kind, e);
                Vec::new()
            }
        };

        Self {
            kind,
            entries: Mutex::new(entries),
            selector,
            exclusions,
            catalog,
            store,
            notifier: EventNotifier::new(),
            auto_refill: true,
        }
    }

    /// Switch automatic refill on or off (on by default)
    pub fn with_auto_refill(mut self, auto_refill: bool) -> Self {
        self.auto_refill = auto_refill;
        self
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    /// Entry currently playing
    ///
    /// An empty queue always gets one random entry first, even with automatic
    /// refill switched off; the top-up to two entries follows the refill
    /// setting. `None` means nothing can be played.
    pub fn current(&self) -> Option<QueueEntry> {
        let mut pending = PendingEvents::default();
        let head = {
            let mut entries = self.entries.lock();
            if entries.is_empty() && self.try_add_random_locked(&mut entries, &mut pending) {
                self.refill_locked(&mut entries, &mut pending);
                pending.current_changed(entries.first());
                self.persist_locked(&entries);
            }
            if entries.is_empty() {
                error!("The {} queue ran empty, there is nothing to play", self.kind);
            }
            entries.first().cloned()
        };
        self.dispatch(pending);
        head
    }

    /// Finish the current entry and move on to the next
    ///
    /// Returns the new head, refilling first if fewer than two entries remain.
    pub fn advance(&self) -> Option<QueueEntry> {
        let mut pending = PendingEvents::default();
        let head = {
            let mut entries = self.entries.lock();
            if entries.is_empty() {
                warn!("Advancing the empty {} queue", self.kind);
            } else {
                let finished = entries.remove(0);
                debug!(
                    "Entry {} (media {}) left the {} queue",
                    finished.entry_id, finished.media_id, self.kind
                );
                pending.queue_changed(QueueChangeTrigger::EntryCompletion);
            }

            self.refill_locked(&mut entries, &mut pending);

            if pending.queue.is_some() {
                pending.current_changed(entries.first());
                self.persist_locked(&entries);
            }
            if entries.is_empty() {
                error!("The {} queue ran empty, there is nothing to play", self.kind);
            }
            entries.first().cloned()
        };
        self.dispatch(pending);
        head
    }

    /// Snapshot of the whole queue
    pub fn list(&self) -> Vec<QueueEntry> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Media id of a queue entry
    pub fn media_id_of(&self, entry_id: Uuid) -> Option<MediaId> {
        self.entries
            .lock()
            .iter()
            .find(|entry| entry.entry_id == entry_id)
            .map(|entry| entry.media_id)
    }

    /// Put a media item into the queue
    ///
    /// Returns the new entry id, or `None` if `position` names an entry that
    /// is not in the queue.
    pub fn enqueue(&self, media_id: MediaId, position: QueuePosition, is_random: bool) -> Option<Uuid> {
        let mut pending = PendingEvents::default();
        let entry_id = {
            let mut entries = self.entries.lock();
            let entry_id = self.enqueue_locked(
                &mut entries,
                media_id,
                position,
                is_random,
                None,
                &mut pending,
                QueueChangeTrigger::UserEnqueue,
            );
            if entry_id.is_some() {
                self.persist_locked(&entries);
            }
            entry_id
        };
        self.dispatch(pending);
        entry_id
    }

    /// Select a random candidate and put it into the queue
    ///
    /// `album_id` restricts the choice to one album (songs only).
    /// `Ok(false)` if no candidate was found; the queue is unchanged then.
    pub fn add_random(&self, position: QueuePosition, album_id: Option<MediaId>) -> Result<bool> {
        let mut pending = PendingEvents::default();
        let added = {
            let mut entries = self.entries.lock();
            let added = self.add_random_locked(
                &mut entries,
                position,
                album_id,
                &mut pending,
                QueueChangeTrigger::UserEnqueue,
            )?;
            if added {
                self.persist_locked(&entries);
            }
            added
        };
        self.dispatch(pending);
        Ok(added)
    }

    /// Take an entry out of the queue
    ///
    /// The current entry can only leave through [`advance`](Self::advance).
    pub fn remove(&self, entry_id: Uuid) -> bool {
        let mut pending = PendingEvents::default();
        let removed = {
            let mut entries = self.entries.lock();
            if entries.len() < 2 {
                warn!(
                    "Cannot remove {} from the {} queue, it holds fewer than 2 entries",
                    entry_id, self.kind
                );
                return false;
            }
            if entries[0].entry_id == entry_id {
                warn!("Cannot remove the current entry {} from the {} queue", entry_id, self.kind);
                return false;
            }
            let Some(index) = entries.iter().position(|entry| entry.entry_id == entry_id) else {
                warn!("Entry {} to remove is not in the {} queue", entry_id, self.kind);
                return false;
            };

            let removed = entries.remove(index);
            debug!("Removed entry {} (media {}) from the {} queue", entry_id, removed.media_id, self.kind);
            pending.queue_changed(QueueChangeTrigger::UserDequeue);
            self.refill_locked(&mut entries, &mut pending);
            self.persist_locked(&entries);
            true
        };
        self.dispatch(pending);
        removed
    }

    /// Move an entry directly behind another one
    pub fn move_entry(&self, entry_id: Uuid, after_id: Uuid) -> bool {
        if entry_id == after_id {
            debug!("Entry {} is already where it should go", entry_id);
            return false;
        }

        let mut pending = PendingEvents::default();
        {
            let mut entries = self.entries.lock();
            if entries.first().map(|entry| entry.entry_id) == Some(entry_id) {
                warn!("Cannot move the current entry {} of the {} queue", entry_id, self.kind);
                return false;
            }
            let Some(from) = entries.iter().position(|entry| entry.entry_id == entry_id) else {
                warn!("Entry {} to move is not in the {} queue", entry_id, self.kind);
                return false;
            };
            let Some(mut to) = entries.iter().position(|entry| entry.entry_id == after_id) else {
                warn!("Target entry {} is not in the {} queue", after_id, self.kind);
                return false;
            };

            // Removing `from` shifts everything behind it one slot to the front
            if to < from {
                to += 1;
            }
            let entry = entries.remove(from);
            entries.insert(to, entry);

            debug!("Moved entry {} behind {} in the {} queue", entry_id, after_id, self.kind);
            pending.queue_changed(QueueChangeTrigger::UserMove);
            self.persist_locked(&entries);
        }
        self.dispatch(pending);
        true
    }

    /// Register a listener for this queue's events
    pub fn register_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&QueueEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.notifier.register(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.notifier.remove(id)
    }

    /// Insert and record one entry on the locked queue
    #[allow(clippy::too_many_arguments)]
    fn enqueue_locked(
        &self,
        entries: &mut Vec<QueueEntry>,
        media_id: MediaId,
        position: QueuePosition,
        is_random: bool,
        selected: Option<&Candidate>,
        pending: &mut PendingEvents,
        trigger: QueueChangeTrigger,
    ) -> Option<Uuid> {
        let index = match position {
            QueuePosition::Next => entries.len().min(1),
            QueuePosition::Last => entries.len(),
            QueuePosition::After(after_id) => {
                match entries.iter().position(|entry| entry.entry_id == after_id) {
                    Some(index) => index + 1,
                    None => {
                        warn!(
                            "Cannot enqueue media {} after {}, that entry is not in the {} queue",
                            media_id, after_id, self.kind
                        );
                        return None;
                    }
                }
            }
        };

        let entry = QueueEntry::new(media_id, is_random);
        let entry_id = entry.entry_id;
        entries.insert(index, entry);
        debug!(
            "Enqueued media {} as {} at index {} of the {} queue",
            media_id, entry_id, index, self.kind
        );

        self.record_locked(media_id, selected);
        pending.queue_changed(trigger);
        Some(entry_id)
    }

    /// Put an enqueued item onto the exclusion lists
    fn record_locked(&self, media_id: MediaId, selected: Option<&Candidate>) {
        match (self.kind, selected) {
            (_, Some(Candidate::Song(song))) => self.exclusions.record_song(song),
            (_, Some(Candidate::Video(video))) => self.exclusions.record_video(video.id),
            (MediaKind::Song, None) => match self.catalog.song(media_id) {
                Ok(Some(song)) => self.exclusions.record_song(&song),
                Ok(None) => {
                    warn!("Song {} is not in the catalog, only the song itself is excluded", media_id);
                    self.exclusions.add_entry(ExclusionCategory::Song, media_id);
                }
                Err(e) => {
                    warn!(
                        "Looking up song {} failed: {}. Only the song itself is excluded",
                        media_id, e
                    );
                    self.exclusions.add_entry(ExclusionCategory::Song, media_id);
                }
            },
            (MediaKind::Video, None) => self.exclusions.record_video(media_id),
        }
    }

    fn add_random_locked(
        &self,
        entries: &mut Vec<QueueEntry>,
        position: QueuePosition,
        album_id: Option<MediaId>,
        pending: &mut PendingEvents,
        trigger: QueueChangeTrigger,
    ) -> Result<bool> {
        let Some(candidate) = self.selector.select(self.kind, album_id)? else {
            return Ok(false);
        };
        let media_id = candidate.media_id();
        Ok(self
            .enqueue_locked(entries, media_id, position, true, Some(&candidate), pending, trigger)
            .is_some())
    }

    /// Top the queue up to two entries if automatic refill is on
    ///
    /// Stops at the first selection that yields nothing.
    fn refill_locked(&self, entries: &mut Vec<QueueEntry>, pending: &mut PendingEvents) {
        if !self.auto_refill {
            return;
        }
        while entries.len() < 2 {
            if !self.try_add_random_locked(entries, pending) {
                break;
            }
        }
    }

    /// Append one random entry as replenishment
    ///
    /// Selection errors are logged and treated as no candidate.
    fn try_add_random_locked(&self, entries: &mut Vec<QueueEntry>, pending: &mut PendingEvents) -> bool {
        match self.add_random_locked(
            entries,
            QueuePosition::Last,
            None,
            pending,
            QueueChangeTrigger::AutomaticReplenishment,
        ) {
            Ok(true) => true,
            Ok(false) => {
                warn!("Refilling the {} queue found no candidate", self.kind);
                false
            }
            Err(e) => {
                error!("Refilling the {} queue failed: {}", self.kind, e);
                false
            }
        }
    }

    fn persist_locked(&self, entries: &[QueueEntry]) {
        if let Err(e) = self.store.save_queue(self.kind, entries) {
            warn!("Saving the {} queue failed: {}. Continuing without saving", self.kind, e);
        }
    }

    /// Notify listeners; must be called without holding the queue lock
    fn dispatch(&self, pending: PendingEvents) {
        let timestamp = time::now();
        if let Some(current) = pending.current {
            self.notifier.emit(&QueueEvent::CurrentChanged {
                kind: self.kind,
                current,
                timestamp,
            });
        }
        if let Some(trigger) = pending.queue {
            self.notifier.emit(&QueueEvent::QueueChanged {
                kind: self.kind,
                trigger,
                timestamp,
            });
        }
    }
}

impl std::fmt::Debug for PlaybackQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackQueue")
            .field("kind", &self.kind)
            .field("auto_refill", &self.auto_refill)
            .field("notifier", &self.notifier)
            .finish()
    }
}

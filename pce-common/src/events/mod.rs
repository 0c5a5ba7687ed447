//! Event types for the playback continuity engine
//!
//! Provides the queue event definitions and the synchronous EventNotifier.

mod queue_types;

pub use queue_types::{MediaKind, QueueChangeTrigger, QueueEntryInfo};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{error, warn};

/// Queue event types
///
/// Emitted by a playback queue after each state-changing operation.
/// Serializable so a transport layer can forward them as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum QueueEvent {
    /// Queue contents or order changed
    ///
    /// Triggers:
    /// - UI: Refresh queue display
    /// - Transport: Push new queue to clients
    QueueChanged {
        /// Which queue changed
        kind: MediaKind,
        /// Why the queue changed
        trigger: QueueChangeTrigger,
        /// When the queue changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The head entry (now playing) changed
    ///
    /// Triggers:
    /// - Streaming: Start serving the new head
    /// - UI: Update now playing information
    CurrentChanged {
        /// Which queue advanced
        kind: MediaKind,
        /// New head entry, None if the queue ran empty
        current: Option<QueueEntryInfo>,
        /// When the head changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl QueueEvent {
    /// Event name as seen by listeners
    pub fn event_name(&self) -> &'static str {
        match self {
            QueueEvent::QueueChanged { kind: MediaKind::Song, .. } => "SongQueueChanged",
            QueueEvent::QueueChanged { kind: MediaKind::Video, .. } => "VideoQueueChanged",
            QueueEvent::CurrentChanged { kind: MediaKind::Song, .. } => "SongChanged",
            QueueEvent::CurrentChanged { kind: MediaKind::Video, .. } => "VideoChanged",
        }
    }

    /// Queue the event originates from
    pub fn kind(&self) -> MediaKind {
        match self {
            QueueEvent::QueueChanged { kind, .. } | QueueEvent::CurrentChanged { kind, .. } => {
                *kind
            }
        }
    }
}

/// Callback invoked for every emitted event
pub type Listener = Arc<dyn Fn(&QueueEvent) -> anyhow::Result<()> + Send + Sync>;

/// Handle returned by [`EventNotifier::register`], used to remove the listener again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Synchronous event distribution to registered listeners
///
/// Listeners are called on the emitting thread, in registration order, before
/// `emit` returns. A listener that returns an error or panics is logged and
/// skipped; the remaining listeners still run.
///
/// # Examples
///
/// ```
/// use pce_common::events::{EventNotifier, MediaKind, QueueChangeTrigger, QueueEvent};
///
/// let notifier = EventNotifier::new();
/// let id = notifier.register(|event: &QueueEvent| {
///     println!("{}", event.event_name());
///     Ok(())
/// });
///
/// notifier.emit(&QueueEvent::QueueChanged {
///     kind: MediaKind::Song,
///     trigger: QueueChangeTrigger::UserEnqueue,
///     timestamp: chrono::Utc::now(),
/// });
/// assert!(notifier.remove(id));
/// ```
#[derive(Default)]
pub struct EventNotifier {
    listeners: RwLock<Vec<(ListenerId, Listener)>>,
    next_id: AtomicU64,
}

impl EventNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener, returning the handle needed to remove it
    pub fn register<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&QueueEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((id, Arc::new(listener)));
        id
    }

    /// Remove a previously registered listener
    ///
    /// Returns false (and logs a warning) if the listener is unknown.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        match listeners.iter().position(|(lid, _)| *lid == id) {
            Some(index) => {
                listeners.remove(index);
                true
            }
            None => {
                warn!("Listener {:?} should be removed but is not registered", id);
                false
            }
        }
    }

    /// Call every listener with the event
    ///
    /// Returns how many listeners completed without error.
    pub fn emit(&self, event: &QueueEvent) -> usize {
        // Snapshot so listeners may (un)register while being called
        let listeners: Vec<(ListenerId, Listener)> = self.listeners.read().clone();

        let mut delivered = 0;
        for (id, listener) in listeners {
            match catch_unwind(AssertUnwindSafe(|| listener(event))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => {
                    error!(
                        "Listener {:?} failed handling {}: {:#}",
                        id,
                        event.event_name(),
                        e
                    );
                }
                Err(_) => {
                    error!("Listener {:?} panicked handling {}", id, event.event_name());
                }
            }
        }
        delivered
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }
}

impl std::fmt::Debug for EventNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventNotifier")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn queue_changed() -> QueueEvent {
        QueueEvent::QueueChanged {
            kind: MediaKind::Song,
            trigger: QueueChangeTrigger::UserEnqueue,
            timestamp: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_event_names_per_kind() {
        let now = chrono::Utc::now();
        let song_current = QueueEvent::CurrentChanged {
            kind: MediaKind::Song,
            current: None,
            timestamp: now,
        };
        let video_queue = QueueEvent::QueueChanged {
            kind: MediaKind::Video,
            trigger: QueueChangeTrigger::AutomaticReplenishment,
            timestamp: now,
        };
        assert_eq!(queue_changed().event_name(), "SongQueueChanged");
        assert_eq!(song_current.event_name(), "SongChanged");
        assert_eq!(video_queue.event_name(), "VideoQueueChanged");
        assert_eq!(video_queue.kind(), MediaKind::Video);
    }

    #[test]
    fn test_listeners_called_in_registration_order() {
        let notifier = EventNotifier::new();
        let calls = Arc::new(Mutex::new(Vec::new()));

        for n in 0..3 {
            let calls = calls.clone();
            notifier.register(move |_event: &QueueEvent| {
                calls.lock().push(n);
                Ok(())
            });
        }

        assert_eq!(notifier.emit(&queue_changed()), 3);
        assert_eq!(*calls.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn test_failing_listener_does_not_block_others() {
        let notifier = EventNotifier::new();
        let reached = Arc::new(Mutex::new(0));

        notifier.register(|_event: &QueueEvent| anyhow::bail!("listener broke"));
        notifier.register(|_event: &QueueEvent| panic!("listener exploded"));
        let r = reached.clone();
        notifier.register(move |_event: &QueueEvent| {
            *r.lock() += 1;
            Ok(())
        });

        assert_eq!(notifier.emit(&queue_changed()), 1);
        assert_eq!(*reached.lock(), 1);
    }

    #[test]
    fn test_removed_listener_no_longer_called() {
        let notifier = EventNotifier::new();
        let count = Arc::new(Mutex::new(0));
        let c = count.clone();
        let id = notifier.register(move |_event: &QueueEvent| {
            *c.lock() += 1;
            Ok(())
        });

        notifier.emit(&queue_changed());
        assert!(notifier.remove(id));
        assert!(!notifier.remove(id));
        notifier.emit(&queue_changed());

        assert_eq!(*count.lock(), 1);
        assert_eq!(notifier.listener_count(), 0);
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let json = serde_json::to_value(queue_changed()).unwrap();
        assert_eq!(json["type"], "QueueChanged");
        assert_eq!(json["kind"], "Song");
        assert_eq!(json["trigger"], "UserEnqueue");
    }
}

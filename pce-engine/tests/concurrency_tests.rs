//! Queue access from several threads at once

mod helpers;

use helpers::fixtures::{CountingCatalog, TestEngine};
use pce_common::config::EngineConfig;
use pce_engine::exclusion::ExclusionCategory;
use pce_engine::model::{MediaKind, QueuePosition};
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

#[test]
fn test_concurrent_enqueue_loses_nothing() {
    let engine = Arc::new(TestEngine::new(EngineConfig::default(), CountingCatalog::default()));

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let engine = engine.clone();
            thread::spawn(move || {
                for i in 0..25 {
                    let position = if i % 2 == 0 {
                        QueuePosition::Last
                    } else {
                        QueuePosition::Next
                    };
                    engine.songs().enqueue(t * 1000 + i, position, false).unwrap();
                    let _ = engine.songs().list();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let entries = engine.songs().list();
    assert_eq!(entries.len(), 200);
    let ids: HashSet<_> = entries.iter().map(|e| e.entry_id).collect();
    assert_eq!(ids.len(), 200);
}

#[test]
fn test_concurrent_advance_and_refill() {
    let engine = Arc::new(TestEngine::new(
        EngineConfig::default(),
        CountingCatalog::with_songs(1..=50),
    ));
    engine.songs().current().unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let engine = engine.clone();
            thread::spawn(move || {
                for _ in 0..20 {
                    engine.context.queue(MediaKind::Song).advance();
                    engine.context.exclusions.active_ids(ExclusionCategory::Song);
                    let _ = engine.context.queue(MediaKind::Video).current();
                    assert!(engine.songs().len() >= 2);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert!(engine.songs().len() >= 2);
}

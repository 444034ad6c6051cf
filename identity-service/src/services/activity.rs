//! In-memory activity tracking.
//!
//! Process-local last-seen bookkeeping per staff member. Each touch
//! replaces the pending expiry timer for that id; entries self-remove
//! after the idle window. Nothing here is persisted.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::task::JoinHandle;

struct ActivityEntry {
    last_seen: DateTime<Utc>,
    generation: u64,
    expiry: JoinHandle<()>,
}

#[derive(Clone)]
pub struct ActivityTracker {
    entries: Arc<DashMap<i64, ActivityEntry>>,
    generations: Arc<AtomicU64>,
    idle_window: Duration,
}

impl ActivityTracker {
    pub fn new(idle_window: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            generations: Arc::new(AtomicU64::new(0)),
            idle_window,
        }
    }

    /// Record activity for a staff member, replacing (not stacking) any
    /// pending expiry timer for that id.
    pub fn touch(&self, staff_id: i64) {
        let generation = self.generations.fetch_add(1, Ordering::Relaxed);
        let entries = Arc::clone(&self.entries);
        let idle_window = self.idle_window;

        let expiry = tokio::spawn(async move {
            tokio::time::sleep(idle_window).await;
            // Only remove the entry this timer belongs to; a newer touch
            // owns the id by now if the generations differ.
            entries.remove_if(&staff_id, |_, entry| entry.generation == generation);
        });

        if let Some(previous) = self.entries.insert(
            staff_id,
            ActivityEntry {
                last_seen: Utc::now(),
                generation,
                expiry,
            },
        ) {
            previous.expiry.abort();
        }
    }

    pub fn last_seen(&self, staff_id: i64) -> Option<DateTime<Utc>> {
        self.entries.get(&staff_id).map(|entry| entry.last_seen)
    }

    /// Drop the entry immediately, cancelling its pending timer.
    pub fn force_logout(&self, staff_id: i64) -> bool {
        match self.entries.remove(&staff_id) {
            Some((_, entry)) => {
                entry.expiry.abort();
                tracing::info!(staff_id = %staff_id, "Forced logout");
                true
            }
            None => false,
        }
    }

    pub fn tracked_count(&self) -> usize {
        self.entries.len()
    }

    /// Cancel every pending timer and clear the map.
    pub fn shutdown(&self) {
        self.entries.retain(|_, entry| {
            entry.expiry.abort();
            false
        });
    }
}

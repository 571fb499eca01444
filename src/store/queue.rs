//! A single-flight write queue with one lane per storage key.
//!
//! Each mutation of the ledger produces a complete new value for a key. The value is *staged*
//! while the caller still holds the ledger state lock, which gives every staged value a generation
//! number in mutation order. The staged value is then *committed* without the state lock. Within a
//! lane only one commit talks to the store at a time, and a commit whose generation is no longer the
//! newest is skipped because a newer complete value is on its way.
//!
//! A write counts as in flight from the moment it is staged until its commit has finished or it
//! has been dropped.

use crate::store::KeyValueStore;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, trace, warn};

/// What happened to a staged write.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Commit {
    /// The value reached the store.
    Written,
    /// A newer value for the same key was staged, so this one was dropped.
    Superseded,
    /// The store returned an error. It has been logged.
    Failed,
}

pub(crate) struct WriteQueue {
    store: Arc<dyn KeyValueStore>,
    lanes: Mutex<HashMap<String, Arc<Lane>>>,
    in_flight: Arc<AtomicUsize>,
}

#[derive(Default)]
struct Lane {
    /// The generation of the newest staged write.
    staged: AtomicU64,
    /// Held while a write for this key is in flight.
    flight: tokio::sync::Mutex<()>,
}

#[derive(Debug)]
enum Op {
    Set(String),
    Remove,
}

/// A write that has been given its place in line but has not been sent to the store.
#[must_use = "a staged write does nothing until it is committed"]
pub(crate) struct Pending {
    store: Arc<dyn KeyValueStore>,
    lane: Arc<Lane>,
    key: String,
    generation: u64,
    op: Op,
    in_flight: Arc<AtomicUsize>,
}

impl WriteQueue {
    pub(crate) fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            lanes: Mutex::new(HashMap::new()),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// The number of staged writes that have not finished.
    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Stages `value` as the next value of `key`.
    pub(crate) fn stage_set(&self, key: &str, value: String) -> Pending {
        self.stage(key, Op::Set(value))
    }

    /// Stages the deletion of `key`.
    pub(crate) fn stage_remove(&self, key: &str) -> Pending {
        self.stage(key, Op::Remove)
    }

    fn stage(&self, key: &str, op: Op) -> Pending {
        let lane = {
            // A poisoned map is still a usable map.
            let mut lanes = self.lanes.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(lanes.entry(key.to_string()).or_default())
        };
        let generation = lane.staged.fetch_add(1, Ordering::SeqCst) + 1;
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        trace!("Staged generation {generation} of {key}");
        Pending {
            store: Arc::clone(&self.store),
            lane,
            key: key.to_string(),
            generation,
            op,
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

impl Pending {
    pub(crate) fn key(&self) -> &str {
        &self.key
    }

    pub(crate) async fn commit(self) -> Commit {
        let _flight = self.lane.flight.lock().await;
        let newest = self.lane.staged.load(Ordering::SeqCst);
        if newest != self.generation {
            debug!(
                "Skipping generation {} of {}, generation {newest} replaces it",
                self.generation, self.key
            );
            return Commit::Superseded;
        }
        let result = match &self.op {
            Op::Set(value) => self.store.set(&self.key, value).await,
            Op::Remove => self.store.remove(&self.key).await,
        };
        match result {
            Ok(()) => {
                trace!("Committed generation {} of {}", self.generation, self.key);
                Commit::Written
            }
            Err(e) => {
                warn!("Unable to save {}: {e:#}", self.key);
                Commit::Failed
            }
        }
    }
}

impl Drop for Pending {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn queue() -> (Arc<MemoryStore>, WriteQueue) {
        let store = Arc::new(MemoryStore::default());
        let queue = WriteQueue::new(store.clone());
        (store, queue)
    }

    #[tokio::test]
    async fn test_commit_in_order() {
        let (store, queue) = queue();
        assert_eq!(
            queue.stage_set("k", "1".into()).commit().await,
            Commit::Written
        );
        assert_eq!(
            queue.stage_set("k", "2".into()).commit().await,
            Commit::Written
        );
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_older_commit_is_superseded() {
        let (store, queue) = queue();
        let old = queue.stage_set("k", "old".into());
        let new = queue.stage_set("k", "new".into());
        assert_eq!(new.commit().await, Commit::Written);
        assert_eq!(old.commit().await, Commit::Superseded);
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_lanes_are_independent() {
        let (store, queue) = queue();
        let a = queue.stage_set("a", "1".into());
        let b = queue.stage_set("b", "2".into());
        assert_eq!(b.commit().await, Commit::Written);
        assert_eq!(a.commit().await, Commit::Written);
        assert_eq!(store.dump().await.len(), 2);
    }

    #[tokio::test]
    async fn test_remove() {
        let (store, queue) = queue();
        queue.stage_set("k", "1".into()).commit().await;
        assert_eq!(queue.stage_remove("k").commit().await, Commit::Written);
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_failed_write() {
        let store = Arc::new(crate::test::FailingStore);
        let queue = WriteQueue::new(store);
        assert_eq!(
            queue.stage_set("k", "1".into()).commit().await,
            Commit::Failed
        );
    }

    #[tokio::test]
    async fn test_concurrent_commits_land_newest() {
        let (store, queue) = queue();
        let pending: Vec<Pending> = (0..20)
            .map(|i| queue.stage_set("k", i.to_string()))
            .collect();
        let handles: Vec<_> = pending
            .into_iter()
            .rev()
            .map(|p| tokio::spawn(p.commit()))
            .collect();
        let mut written = 0;
        for handle in handles {
            if handle.await.unwrap() == Commit::Written {
                written += 1;
            }
        }
        assert_eq!(written, 1);
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("19"));
        assert_eq!(queue.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_in_flight_until_committed_or_dropped() {
        let (_, queue) = queue();
        let a = queue.stage_set("a", "1".into());
        let b = queue.stage_remove("b");
        assert_eq!(queue.in_flight(), 2);
        assert_eq!(a.commit().await, Commit::Written);
        assert_eq!(queue.in_flight(), 1);
        drop(b);
        assert_eq!(queue.in_flight(), 0);
    }
}

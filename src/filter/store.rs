//! Page-scoped holder of the current filter snapshot

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use tracing::debug;

use super::state::FilterState;

/// Callback invoked with the new snapshot and its version on every replace
pub type FilterCallback = dyn Fn(&Arc<FilterState>, u64) + Send + Sync;

/// Handle returned by [`FilterStore::subscribe`], used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Snapshot {
    state: Arc<FilterState>,
    version: u64,
}

struct Subscriber {
    id: SubscriptionId,
    callback: Arc<FilterCallback>,
}

/// Holds the latest [`FilterState`] and notifies subscribers on replacement
///
/// Replacement is an atomic snapshot swap: readers always see a complete
/// state, and the version increases monotonically so consumers can detect
/// stale computation results. Notification is synchronous and in
/// registration order.
pub struct FilterStore {
    current: RwLock<Snapshot>,
    subscribers: Mutex<Vec<Subscriber>>,
    next_id: AtomicU64,
}

impl FilterStore {
    /// Create a store holding an empty snapshot (version 0)
    pub fn new() -> Self {
        Self::with_initial(FilterState::empty())
    }

    /// Create a store primed with persisted or query-string defaults
    pub fn with_initial(state: FilterState) -> Self {
        Self {
            current: RwLock::new(Snapshot {
                state: Arc::new(state),
                version: 0,
            }),
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// The latest snapshot
    pub fn current(&self) -> Arc<FilterState> {
        self.current.read().unwrap().state.clone()
    }

    /// Version of the latest snapshot; increases by one on every replace
    pub fn version(&self) -> u64 {
        self.current.read().unwrap().version
    }

    /// The latest snapshot together with its version
    pub fn current_versioned(&self) -> (Arc<FilterState>, u64) {
        let snapshot = self.current.read().unwrap();
        (snapshot.state.clone(), snapshot.version)
    }

    /// Swap in a new snapshot and synchronously notify all subscribers in
    /// registration order. Returns the new version.
    ///
    /// The notification pass iterates a copy of the subscriber list taken
    /// before dispatch, so unsubscribing from inside a callback does not
    /// affect callbacks already scheduled for this pass.
    pub fn replace(&self, state: FilterState) -> u64 {
        let (state, version) = {
            let mut snapshot = self.current.write().unwrap();
            snapshot.version += 1;
            snapshot.state = Arc::new(state);
            (snapshot.state.clone(), snapshot.version)
        };
        debug!(version, filters = state.len(), "filter snapshot replaced");

        let callbacks: Vec<Arc<FilterCallback>> = {
            let subscribers = self.subscribers.lock().unwrap();
            subscribers.iter().map(|s| s.callback.clone()).collect()
        };
        for callback in callbacks {
            callback(&state, version);
        }
        version
    }

    /// Register a callback; it fires on every subsequent replace
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Arc<FilterState>, u64) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.lock().unwrap().push(Subscriber {
            id,
            callback: Arc::new(callback),
        });
        id
    }

    /// Remove a subscription; returns false if the id was not registered
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.lock().unwrap();
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        subscribers.len() != before
    }
}

impl Default for FilterStore {
    fn default() -> Self {
        Self::new()
    }
}

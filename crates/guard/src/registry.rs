// crates/guard/src/registry.rs
//! Concurrent key-to-breaker-unit registry

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::sync::mpsc;

use crate::unit::{self, BreakerHandle};

/// The registry instance has been shut down or its state is unrecoverable
#[derive(Debug, Error)]
#[error("breaker registry is shut down")]
pub struct RegistryClosed;

/// Key-to-unit map with exactly-once creation and eviction on termination
///
/// A `Registry` is an owned, injectable value with explicit teardown, so
/// tests can spin up isolated instances. Creation must happen inside a tokio
/// runtime: both the eviction listener and the per-key units are spawned
/// tasks.
///
/// The map lock is a std `Mutex` held only for map operations, never across
/// an `.await` and never while a guarded operation runs.
#[derive(Debug)]
pub struct Registry<K> {
    entries: Arc<Mutex<HashMap<K, BreakerHandle>>>,
    evict_tx: mpsc::UnboundedSender<(K, u64)>,
    closed: AtomicBool,
}

impl<K> Registry<K>
where
    K: Eq + Hash + Clone + Send + 'static,
{
    /// Creates an empty registry and starts its eviction listener
    pub fn new() -> Self {
        let entries = Arc::new(Mutex::new(HashMap::new()));
        let (evict_tx, mut evict_rx) = mpsc::unbounded_channel::<(K, u64)>();

        let listener_entries = Arc::clone(&entries);
        tokio::spawn(async move {
            while let Some((key, id)) = evict_rx.recv().await {
                let Ok(mut map) = listener_entries.lock() else {
                    return;
                };
                // A terminated unit may already have been replaced under its
                // key; only evict the generation that actually died.
                if map.get(&key).map(BreakerHandle::id) == Some(id) {
                    map.remove(&key);
                    log::debug!("evicted breaker unit {id} from registry");
                }
            }
        });

        Self {
            entries,
            evict_tx,
            closed: AtomicBool::new(false),
        }
    }

    /// Returns the live handle for `key`, creating its unit on first use
    ///
    /// Racing first-time lookups are serialized by the map lock: exactly one
    /// unit is created and every caller converges on its handle. A dead
    /// entry found before the eviction notice lands is replaced in place.
    pub fn get_or_create(&self, key: &K) -> Result<BreakerHandle, RegistryClosed> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(RegistryClosed);
        }

        let mut map = self.entries.lock().map_err(|_| RegistryClosed)?;
        if let Some(handle) = map.get(key) {
            if !handle.is_closed() {
                return Ok(handle.clone());
            }
        }

        let handle = unit::spawn(key.clone(), self.evict_tx.clone());
        map.insert(key.clone(), handle.clone());
        Ok(handle)
    }

    /// Looks up the live handle for `key` without creating one
    pub fn find(&self, key: &K) -> Option<BreakerHandle> {
        let map = self.entries.lock().ok()?;
        map.get(key).filter(|handle| !handle.is_closed()).cloned()
    }

    /// Tears down the unit for `key`, if any
    ///
    /// A later `get_or_create` for the same key starts from a fresh breaker.
    pub fn remove(&self, key: &K) {
        let removed = match self.entries.lock() {
            Ok(mut map) => map.remove(key),
            Err(_) => None,
        };
        if let Some(handle) = removed {
            handle.shutdown();
        }
    }

    /// Shuts the registry down, terminating every unit
    ///
    /// Subsequent `get_or_create` calls fail with [`RegistryClosed`].
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
        if let Ok(mut map) = self.entries.lock() {
            for (_, handle) in map.drain() {
                handle.shutdown();
            }
        }
    }

    /// Returns the number of live entries
    pub fn len(&self) -> usize {
        self.entries.lock().map(|map| map.len()).unwrap_or(0)
    }

    /// Returns true when no entries are registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K> Default for Registry<K>
where
    K: Eq + Hash + Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

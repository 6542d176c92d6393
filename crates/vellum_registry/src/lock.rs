//! Keyed async locks.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};
use vellum_core::MediaId;

/// Prune idle entries once the table grows past this many.
const PRUNE_THRESHOLD: usize = 256;

/// Table of async mutexes, one per key.
///
/// Entries are created on first use and dropped once nobody holds or waits
/// on them.
#[derive(Debug)]
pub struct LockTable<K> {
    table: Arc<Mutex<HashMap<K, Arc<tokio::sync::Mutex<()>>>>>,
}

/// Per-media lock table.
pub type MediaLocks = LockTable<MediaId>;

/// Exclusive hold on one media ID.
pub type MediaLock = KeyLock<MediaId>;

impl<K> Clone for LockTable<K> {
    fn clone(&self) -> Self {
        Self {
            table: Arc::clone(&self.table),
        }
    }
}

impl<K> Default for LockTable<K> {
    fn default() -> Self {
        Self {
            table: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<K: Eq + Hash + Clone> LockTable<K> {
    /// Create an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`.
    pub async fn lock(&self, key: K) -> KeyLock<K> {
        let entry = {
            let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
            if table.len() > PRUNE_THRESHOLD {
                table.retain(|_, m| Arc::strong_count(m) > 1);
            }
            table.entry(key.clone()).or_default().clone()
        };
        KeyLock {
            key,
            _guard: entry.lock_owned().await,
        }
    }

    /// Number of tracked entries, including idle ones not yet pruned.
    pub fn len(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no entries are tracked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exclusive hold on one key of a [`LockTable`]; released on drop.
#[derive(Debug)]
pub struct KeyLock<K> {
    key: K,
    _guard: tokio::sync::OwnedMutexGuard<()>,
}

impl<K> KeyLock<K> {
    /// The locked key.
    pub fn key(&self) -> &K {
        &self.key
    }
}

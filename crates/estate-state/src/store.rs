//! # Keyed Record Store
//!
//! Thread-safe, cloneable in-memory store with one lock per key.
//!
//! Each key owns a *slot*: an `Arc<tokio::sync::Mutex<Option<V>>>` held in a
//! `DashMap`. Operations on different keys never contend; operations on the
//! same key are serialized for as long as the caller holds the slot guard,
//! including across `.await` points (the escrow release holds its slot while
//! the loan ledger is consulted).
//!
//! The `DashMap` shard lock is only held long enough to clone the slot `Arc`
//! out, never across an `.await`.
//!
//! A slot whose value is `None` is indistinguishable from a missing key to
//! readers. Slots are never removed, so a guard obtained for a key always
//! refers to the slot every later caller will see.

use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

type Slot<V> = Arc<Mutex<Option<V>>>;

/// Exclusive access to one key's record. `None` means no record yet.
pub type SlotGuard<V> = OwnedMutexGuard<Option<V>>;

#[derive(Debug)]
pub struct KeyedStore<K, V>
where
    K: Eq + Hash,
{
    slots: Arc<DashMap<K, Slot<V>>>,
}

impl<K: Eq + Hash, V> Clone for KeyedStore<K, V> {
    fn clone(&self) -> Self {
        Self {
            slots: Arc::clone(&self.slots),
        }
    }
}

impl<K, V> KeyedStore<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            slots: Arc::new(DashMap::new()),
        }
    }

    /// Lock the slot for `key`, creating an empty slot if none exists.
    pub async fn lock_or_create(&self, key: K) -> SlotGuard<V> {
        let slot = self
            .slots
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .value()
            .clone();
        slot.lock_owned().await
    }

    /// Lock the slot for `key` only if a record exists.
    ///
    /// Returns `None` both when the key was never seen and when its slot is
    /// empty.
    pub async fn lock_existing(&self, key: &K) -> Option<SlotGuard<V>> {
        let slot = self.slots.get(key).map(|entry| entry.value().clone())?;
        let guard = slot.lock_owned().await;
        if guard.is_some() {
            Some(guard)
        } else {
            None
        }
    }

    /// Snapshot of the record for `key`.
    ///
    /// Waits for any in-flight operation on the same key to finish.
    pub async fn get(&self, key: &K) -> Option<V> {
        let slot = self.slots.get(key).map(|entry| entry.value().clone())?;
        let guard = slot.lock().await;
        guard.clone()
    }

    /// Number of keys holding a record.
    ///
    /// Slots currently locked by another operation are counted as occupied.
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|entry| match entry.value().try_lock() {
                Ok(guard) => guard.is_some(),
                Err(_) => true,
            })
            .count()
    }

    /// Whether no key holds a record.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> Default for KeyedStore<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn missing_key_reads_as_none() {
        let store: KeyedStore<u64, String> = KeyedStore::new();
        assert!(store.get(&1).await.is_none());
        assert!(store.lock_existing(&1).await.is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn empty_slot_reads_as_missing() {
        let store: KeyedStore<u64, String> = KeyedStore::new();
        drop(store.lock_or_create(1).await);
        assert!(store.get(&1).await.is_none());
        assert!(store.lock_existing(&1).await.is_none());
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn write_through_guard_is_visible() {
        let store: KeyedStore<u64, String> = KeyedStore::new();
        {
            let mut guard = store.lock_or_create(7).await;
            *guard = Some("seven".to_string());
        }
        assert_eq!(store.get(&7).await.as_deref(), Some("seven"));
        assert_eq!(store.len(), 1);

        let mut guard = store.lock_existing(&7).await.unwrap();
        if let Some(v) = (*guard).as_mut() {
            v.push('!');
        }
        drop(guard);
        assert_eq!(store.get(&7).await.as_deref(), Some("seven!"));
    }

    #[tokio::test]
    async fn clones_share_data() {
        let store: KeyedStore<u64, u32> = KeyedStore::new();
        let other = store.clone();
        *store.lock_or_create(1).await = Some(10);
        assert_eq!(other.get(&1).await, Some(10));
    }

    #[tokio::test]
    async fn same_key_is_serialized_across_await() {
        let store: KeyedStore<u64, u32> = KeyedStore::new();
        *store.lock_or_create(1).await = Some(0);

        let mut handles = Vec::new();
        for _ in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let mut guard = store.lock_existing(&1).await.unwrap();
                let current = guard.unwrap_or(0);
                // Yield while holding the slot; a non-exclusive store would lose updates.
                tokio::time::sleep(Duration::from_millis(1)).await;
                *guard = Some(current + 1);
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(store.get(&1).await, Some(20));
    }

    #[tokio::test]
    async fn different_keys_do_not_contend() {
        let store: KeyedStore<u64, u32> = KeyedStore::new();
        let held = store.lock_or_create(1).await;
        // Key 2 is lockable while key 1 is held.
        let other = tokio::time::timeout(Duration::from_millis(100), store.lock_or_create(2)).await;
        assert!(other.is_ok());
        drop(held);
    }
}

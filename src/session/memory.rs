//! In-Process Session Store
//!
//! Expiring map used for tests and single-node development runs. Entries
//! expire lazily on read and can be swept with [`MemorySessionStore::purge_expired`].

use super::store::{SessionStore, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Session store backed by a process-local map
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of unexpired entries
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.read().await;
        entries.values().filter(|entry| !entry.is_expired(now)).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop every expired entry, returning how many were removed
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - entries.len();
        if removed > 0 {
            debug!("Purged {} expired session entries", removed);
        }
        removed
    }

    /// Purge expired entries every `every` until the store is dropped
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.tick().await;

            loop {
                interval.tick().await;
                let Some(store) = weak.upgrade() else {
                    break;
                };
                store.purge_expired().await;
            }
        })
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // Expired: remove it unless a writer replaced it in the meantime
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let entry = Entry {
            value: value.to_string(),
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = MemorySessionStore::new();
        assert_eq!(store.get("token:abc").await.unwrap(), None);

        store
            .set_with_ttl("token:abc", "alice", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(store.get("token:abc").await.unwrap().as_deref(), Some("alice"));

        store.delete("token:abc").await.unwrap();
        assert_eq!(store.get("token:abc").await.unwrap(), None);

        // Deleting again is fine
        store.delete("token:abc").await.unwrap();
    }

    #[tokio::test]
    async fn test_set_replaces_value_and_ttl() {
        let store = MemorySessionStore::new();
        store.set_with_ttl("k", "one", Duration::from_secs(1)).await.unwrap();
        store.set_with_ttl("k", "two", Duration::from_secs(60)).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("two"));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_after_ttl() {
        let store = MemorySessionStore::new();
        store.set_with_ttl("short", "a", Duration::from_secs(5)).await.unwrap();
        store.set_with_ttl("long", "b", Duration::from_secs(60)).await.unwrap();

        tokio::time::advance(Duration::from_secs(4)).await;
        assert_eq!(store.get("short").await.unwrap().as_deref(), Some("a"));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(store.get("short").await.unwrap(), None);
        assert_eq!(store.get("long").await.unwrap().as_deref(), Some("b"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let store = MemorySessionStore::new();
        store.set_with_ttl("a", "1", Duration::from_secs(1)).await.unwrap();
        store.set_with_ttl("b", "2", Duration::from_secs(1)).await.unwrap();
        store.set_with_ttl("c", "3", Duration::from_secs(30)).await.unwrap();

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(store.purge_expired().await, 2);
        assert_eq!(store.len().await, 1);
        assert!(!store.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_purges_and_stops_with_store() {
        let store = Arc::new(MemorySessionStore::new());
        store.set_with_ttl("a", "1", Duration::from_secs(1)).await.unwrap();
        let sweeper = store.spawn_sweeper(Duration::from_secs(10));

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(store.entries.read().await.len(), 0);

        drop(store);
        tokio::time::sleep(Duration::from_secs(11)).await;
        assert!(sweeper.is_finished());
    }
}

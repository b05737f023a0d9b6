//! In-memory cache store with LRU eviction.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lru::LruCache;
use tokio::sync::RwLock;

use quill_core::cache::{pattern_matches, CacheConnector, CacheStore, Result};

/// A single cache entry with its expiry deadline.
#[derive(Debug, Clone)]
struct CacheEntry {
    value: Vec<u8>,
    expires_at: Instant,
}

impl CacheEntry {
    fn new(value: Vec<u8>, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// In-memory cache store with LRU eviction.
///
/// Thread-safe store using `Arc<RwLock<LruCache>>` for concurrent access.
/// Expired entries are removed when they are next touched.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    entries: Arc<RwLock<LruCache<String, CacheEntry>>>,
}

impl MemoryStore {
    /// Creates a store holding at most `max_entries` keys. A capacity of 0
    /// is treated as 1.
    pub fn new(max_entries: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Arc::new(RwLock::new(LruCache::new(capacity))),
        }
    }

    /// Number of live (unexpired) entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.read().await;
        entries.iter().filter(|(_, e)| !e.is_expired(now)).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.pop(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.put(key.to_string(), CacheEntry::new(value.to_vec(), ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.pop(key);
        Ok(())
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<u64> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        // Full scan; expired keys go too but are not counted.
        let matching: Vec<(String, bool)> = entries
            .iter()
            .filter(|(key, _)| pattern_matches(pattern, key))
            .map(|(key, entry)| (key.clone(), entry.is_expired(now)))
            .collect();

        let mut deleted = 0;
        for (key, expired) in matching {
            entries.pop(&key);
            if !expired {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// Hands out the same [`MemoryStore`] on every connect, so entries survive
/// a reconnect the way they would on a real server.
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    store: MemoryStore,
}

impl MemoryConnector {
    pub fn new(max_entries: usize) -> Self {
        Self::with_store(MemoryStore::new(max_entries))
    }

    pub fn with_store(store: MemoryStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }
}

#[async_trait]
impl CacheConnector for MemoryConnector {
    async fn connect(&self) -> Result<Arc<dyn CacheStore>> {
        Ok(Arc::new(self.store.clone()))
    }

    fn target(&self) -> String {
        "memory".to_string()
    }
}

//! Failure injection for cache tests.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use quill_core::cache::{CacheConnector, CacheError, CacheStore, Result};

use super::memory::MemoryStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailMode {
    /// The store answers with an error that does not mean it is down.
    Operation,
    /// The store behaves as if the connection dropped.
    Connection,
    /// The store never answers.
    Hang,
}

/// A memory store that can be told to fail.
pub struct FlakyStore {
    inner: MemoryStore,
    mode: Mutex<Option<FailMode>>,
    calls: AtomicUsize,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(1000),
            mode: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn fail_with(&self, mode: FailMode) {
        *self.mode.lock().unwrap() = Some(mode);
    }

    pub fn recover(&self) {
        *self.mode.lock().unwrap() = None;
    }

    /// Data operations that reached the store (PINGs are not counted).
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    async fn check(&self) -> Result<()> {
        let mode = *self.mode.lock().unwrap();
        match mode {
            None => Ok(()),
            Some(FailMode::Operation) => Err(CacheError::OperationFailed("WRONGTYPE".into())),
            Some(FailMode::Connection) => {
                Err(CacheError::ConnectionFailed("connection reset".into()))
            }
            Some(FailMode::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            }
        }
    }

    async fn call(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.check().await
    }
}

#[async_trait]
impl CacheStore for FlakyStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.call().await?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        self.call().await?;
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.call().await?;
        self.inner.delete(key).await
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<u64> {
        self.call().await?;
        self.inner.delete_pattern(pattern).await
    }

    async fn ping(&self) -> Result<()> {
        self.check().await
    }
}

/// Connector that hands out one shared [`FlakyStore`] and can refuse
/// connections.
pub struct ScriptedConnector {
    store: Arc<FlakyStore>,
    available: AtomicBool,
    attempts: AtomicU32,
    connect_delay_ms: AtomicU64,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self {
            store: Arc::new(FlakyStore::new()),
            available: AtomicBool::new(true),
            attempts: AtomicU32::new(0),
            connect_delay_ms: AtomicU64::new(0),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Makes every connect take `delay` before answering.
    pub fn set_connect_delay(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.connect_delay_ms.store(millis, Ordering::SeqCst);
    }

    pub fn connect_attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn store(&self) -> &FlakyStore {
        &self.store
    }
}

#[async_trait]
impl CacheConnector for ScriptedConnector {
    async fn connect(&self) -> Result<Arc<dyn CacheStore>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let delay = self.connect_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if !self.available.load(Ordering::SeqCst) {
            return Err(CacheError::ConnectionFailed("connection refused".into()));
        }
        Ok(self.store.clone())
    }

    fn target(&self) -> String {
        "scripted".to_string()
    }
}

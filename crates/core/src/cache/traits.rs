use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::Result;

/// Raw key-value operations against a cache store.
///
/// Implementations report every failure; deciding what a failure means for
/// the application is the cache client's job.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Gets the bytes stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Stores `value` under `key`, expiring after `ttl`.
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()>;

    /// Deletes `key`. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Deletes every key matching `pattern` (`*` wildcards) and returns how
    /// many were removed.
    async fn delete_pattern(&self, pattern: &str) -> Result<u64>;

    /// Round-trips to the store to prove it is answering.
    async fn ping(&self) -> Result<()>;
}

/// Opens connections to a cache store.
#[async_trait]
pub trait CacheConnector: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn CacheStore>>;

    /// Human-readable target for log lines (credentials stripped).
    fn target(&self) -> String;
}

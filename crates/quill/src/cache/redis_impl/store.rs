//! Redis cache store.
//!
//! Values are stored with `SET key value EX ttl`. Pattern deletion walks the
//! keyspace with `SCAN MATCH` and deletes each batch with `DEL`, so it never
//! blocks the server the way `KEYS` would.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use quill_core::cache::{to_redis_glob, CacheConnector, CacheStore, Result};

use super::error::map_redis_error;

const SCAN_BATCH: usize = 100;

/// Opens multiplexed connections to a Redis server.
pub struct RedisConnector {
    client: redis::Client,
    url: String,
}

impl RedisConnector {
    /// Parses the URL. No connection is made until [`CacheConnector::connect`].
    ///
    /// # Errors
    ///
    /// Returns `CacheError::ConnectionFailed` if the URL is invalid.
    pub fn new(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).map_err(map_redis_error)?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl CacheConnector for RedisConnector {
    async fn connect(&self) -> Result<Arc<dyn CacheStore>> {
        let conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(map_redis_error)?;
        Ok(Arc::new(RedisStore { conn }))
    }

    fn target(&self) -> String {
        redact_credentials(&self.url)
    }
}

/// Strips `user:password@` from a connection URL.
fn redact_credentials(url: &str) -> String {
    match (url.split_once("://"), url.rfind('@')) {
        (Some((scheme, _)), Some(at)) => format!("{scheme}://{}", &url[at + 1..]),
        _ => url.to_string(),
    }
}

/// Redis cache store over a multiplexed connection.
pub struct RedisStore {
    conn: MultiplexedConnection,
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let result: Option<Vec<u8>> = conn.get(key).await.map_err(map_redis_error)?;
        Ok(result)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        let seconds = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value, seconds)
            .await
            .map_err(map_redis_error)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key).await.map_err(map_redis_error)
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<u64> {
        let mut conn = self.conn.clone();
        let glob = to_redis_glob(pattern);
        let mut cursor: u64 = 0;
        let mut deleted: u64 = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&glob)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(map_redis_error)?;

            if !keys.is_empty() {
                let removed: u64 = conn.del(&keys).await.map_err(map_redis_error)?;
                deleted += removed;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(deleted)
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(map_redis_error)?;
        Ok(())
    }
}

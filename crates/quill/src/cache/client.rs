//! Resilient cache client.
//!
//! [`CacheClient`] owns the connection to a [`CacheStore`] and hides every
//! store failure from its callers: reads fall back to a miss, writes to
//! `false`, pattern clears to 0. Behind that contract it tracks the
//! connection lifecycle, reconnects with exponential backoff and keeps a
//! circuit breaker so a dead store is not hammered on every request.
//!
//! Connection-class errors move the client to `Disconnected` and start a
//! single background reconnect loop. When the loop runs out of attempts it
//! trips the breaker. Once the cooldown has passed, the next operation on a
//! disconnected client makes one connection attempt in the background; if
//! that fails the breaker reopens at once.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::{Duration, Instant};

use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use quill_core::cache::{
    decode, encode, BreakerSnapshot, BreakerTransition, CacheConnector, CacheError, CacheStore,
    CircuitBreaker, ConnectionState, ReconnectPolicy, Result,
};

/// Tunables for [`CacheClient`].
#[derive(Debug, Clone, Copy)]
pub struct CacheSettings {
    pub reconnect: ReconnectPolicy,
    pub breaker_threshold: u32,
    pub breaker_cooldown: Duration,
    pub connect_timeout: Duration,
    pub operation_timeout: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            reconnect: ReconnectPolicy::default(),
            breaker_threshold: 5,
            breaker_cooldown: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            operation_timeout: Duration::from_secs(2),
        }
    }
}

struct ClientInner {
    /// `None` when caching is disabled.
    connector: Option<Arc<dyn CacheConnector>>,
    settings: CacheSettings,
    state: RwLock<ConnectionState>,
    store: RwLock<Option<Arc<dyn CacheStore>>>,
    breaker: Mutex<CircuitBreaker>,
    reconnecting: AtomicBool,
    reconnect_task: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
    pending: AtomicUsize,
    idle: Notify,
}

/// Handle to the cache. Cloning is cheap and every clone shares the same
/// connection, breaker and pending-work counter.
#[derive(Clone)]
pub struct CacheClient {
    inner: Arc<ClientInner>,
}

impl CacheClient {
    pub fn new(connector: Arc<dyn CacheConnector>, settings: CacheSettings) -> Self {
        Self::build(Some(connector), settings)
    }

    /// A client that never connects. Every read misses and every write is
    /// skipped.
    pub fn disabled() -> Self {
        Self::build(None, CacheSettings::default())
    }

    fn build(connector: Option<Arc<dyn CacheConnector>>, settings: CacheSettings) -> Self {
        let breaker = CircuitBreaker::new(settings.breaker_threshold, settings.breaker_cooldown);
        Self {
            inner: Arc::new(ClientInner {
                connector,
                settings,
                state: RwLock::new(ConnectionState::Disconnected),
                store: RwLock::new(None),
                breaker: Mutex::new(breaker),
                reconnecting: AtomicBool::new(false),
                reconnect_task: Mutex::new(None),
                closed: AtomicBool::new(false),
                pending: AtomicUsize::new(0),
                idle: Notify::new(),
            }),
        }
    }

    /// Connects to the store and verifies it with a PING.
    ///
    /// Returns `true` if the client is ready afterwards. Returns `false`
    /// without touching the store while the breaker is open.
    pub async fn connect(&self) -> bool {
        if self.inner.closed.load(Ordering::SeqCst) {
            return false;
        }
        let Some(target) = self.target() else {
            tracing::info!("Cache disabled, running without a cache");
            return false;
        };
        match self.connection_state() {
            ConnectionState::Ready => return true,
            ConnectionState::Connecting | ConnectionState::Connected => {
                tracing::debug!(endpoint = %target, "Cache connection already in progress");
                return false;
            }
            _ => {}
        }
        if self.breaker().is_open(Instant::now()) {
            tracing::warn!(endpoint = %target, "Cache circuit breaker open, not connecting");
            return false;
        }

        match self.inner.establish().await {
            Ok(()) => {
                self.inner.on_success();
                true
            }
            Err(e) => {
                tracing::error!(endpoint = %target, error = %e, "Cache connection failed");
                self.inner.on_breaker_failure();
                false
            }
        }
    }

    /// Reads and decodes `key`. Any failure reads as a miss.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.try_get(key).await.ok().flatten()
    }

    /// Like [`get`](Self::get), but store errors are returned.
    ///
    /// A skipped read (breaker open, not ready) and an undecodable payload
    /// are both `Ok(None)`.
    pub async fn try_get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let bytes = match self.execute("get", key, |store| async move { store.get(key).await }).await? {
            Some(Some(bytes)) => bytes,
            _ => return Ok(None),
        };

        match decode(&bytes) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!(key, error = %e, "Discarding undecodable cache entry");
                Ok(None)
            }
        }
    }

    /// Encodes `value` as JSON and stores it for `ttl_seconds`.
    ///
    /// Returns `false` if the value could not be encoded or the write was
    /// skipped or failed.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl_seconds: u64) -> bool {
        let bytes = match encode(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!(key, error = %e, "Skipping cache write for unencodable value");
                return false;
            }
        };
        let ttl = Duration::from_secs(ttl_seconds.max(1));

        matches!(
            self.execute("set", key, |store| async move { store.set(key, &bytes, ttl).await })
                .await,
            Ok(Some(()))
        )
    }

    /// Removes `key`. Same contract as [`set`](Self::set).
    pub async fn delete(&self, key: &str) -> bool {
        matches!(
            self.execute("delete", key, |store| async move { store.delete(key).await })
                .await,
            Ok(Some(()))
        )
    }

    /// Deletes every key matching `pattern` and returns how many went.
    /// Failures count as 0.
    pub async fn clear_by_pattern(&self, pattern: &str) -> u64 {
        self.try_clear_by_pattern(pattern).await.unwrap_or(0)
    }

    /// Like [`clear_by_pattern`](Self::clear_by_pattern), but store errors
    /// are returned. A skipped clear is `Ok(0)`.
    pub async fn try_clear_by_pattern(&self, pattern: &str) -> Result<u64> {
        let result = self
            .execute("clear_by_pattern", pattern, |store| async move {
                store.delete_pattern(pattern).await
            })
            .await;

        match result {
            Ok(Some(0)) => {
                tracing::debug!(pattern, "No cache keys matched pattern");
                Ok(0)
            }
            Ok(Some(deleted)) => {
                tracing::debug!(pattern, deleted, "Cleared cache keys");
                Ok(deleted)
            }
            Ok(None) => Ok(0),
            Err(e) => {
                tracing::error!(pattern, error = %e, "Failed to clear cache pattern");
                Err(e)
            }
        }
    }

    /// True only while the connection is up.
    pub fn is_ready(&self) -> bool {
        !self.inner.closed.load(Ordering::SeqCst) && self.connection_state().is_usable()
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self
            .inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn breaker_snapshot(&self) -> BreakerSnapshot {
        self.breaker().snapshot(Instant::now())
    }

    /// Connection target for logs and health output, `None` if disabled.
    pub fn target(&self) -> Option<String> {
        self.inner.connector.as_ref().map(|c| c.target())
    }

    /// Runs `fut` in the background without anyone waiting for it.
    ///
    /// The task is counted until it finishes so [`flush_pending`] and
    /// [`shutdown`] can wait for it.
    ///
    /// [`flush_pending`]: Self::flush_pending
    /// [`shutdown`]: Self::shutdown
    pub fn spawn_detached<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.inner.pending.fetch_add(1, Ordering::SeqCst);
        let guard = PendingGuard(self.inner.clone());
        tokio::spawn(async move {
            let _guard = guard;
            fut.await;
        });
    }

    /// Waits until every detached task has finished.
    pub async fn flush_pending(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.inner.pending.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Drains detached work, stops reconnecting and drops the connection.
    /// Every operation afterwards is a no-op.
    pub async fn shutdown(&self) {
        if self.inner.closed.load(Ordering::SeqCst) {
            return;
        }
        self.flush_pending().await;

        self.inner.closed.store(true, Ordering::SeqCst);
        self.inner.set_state(ConnectionState::Ending);

        let task = self
            .inner
            .reconnect_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.abort();
        }

        self.inner
            .store
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.inner.set_state(ConnectionState::Disconnected);
        tracing::info!("Cache client shut down");
    }

    fn breaker(&self) -> MutexGuard<'_, CircuitBreaker> {
        self.inner.breaker()
    }

    /// Returns the store if an operation may run now.
    ///
    /// A disconnected client with a closed or half-open breaker starts a
    /// background reconnect and skips this operation.
    fn acquire(&self) -> Option<Arc<dyn CacheStore>> {
        if self.inner.closed.load(Ordering::SeqCst) || self.inner.connector.is_none() {
            return None;
        }
        if self.breaker().is_open(Instant::now()) {
            return None;
        }

        match self.connection_state() {
            state if state.is_usable() => self
                .inner
                .store
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
            ConnectionState::Disconnected => {
                ClientInner::spawn_reconnect(&self.inner);
                None
            }
            _ => None,
        }
    }

    /// Runs one store operation under the operation timeout and feeds the
    /// outcome to the breaker. `Ok(None)` means the operation was skipped.
    async fn execute<T, F, Fut>(&self, op: &'static str, key: &str, f: F) -> Result<Option<T>>
    where
        F: FnOnce(Arc<dyn CacheStore>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let Some(store) = self.acquire() else {
            tracing::trace!(op, key, "Cache unavailable, skipping");
            return Ok(None);
        };

        let timeout = self.inner.settings.operation_timeout;
        let outcome = match tokio::time::timeout(timeout, f(store)).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout(timeout)),
        };

        match outcome {
            Ok(value) => {
                self.inner.on_success();
                Ok(Some(value))
            }
            Err(e) => {
                tracing::warn!(op, key, error = %e, "Cache operation failed");
                self.inner.on_breaker_failure();
                if e.is_connection_error() {
                    ClientInner::on_connection_lost(&self.inner);
                }
                Err(e)
            }
        }
    }
}

impl ClientInner {
    fn breaker(&self) -> MutexGuard<'_, CircuitBreaker> {
        self.breaker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, next: ConnectionState) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if *state != next {
            tracing::debug!(from = %*state, to = %next, "Cache connection state changed");
            *state = next;
        }
    }

    fn target(&self) -> String {
        self.connector
            .as_ref()
            .map_or_else(|| "disabled".to_string(), |c| c.target())
    }

    /// Connecting -> Connected -> Ready, or back to Disconnected on failure.
    async fn establish(&self) -> Result<()> {
        let result = self.try_establish().await;
        if result.is_err() {
            self.store.write().unwrap_or_else(PoisonError::into_inner).take();
            if !self.closed.load(Ordering::SeqCst) {
                self.set_state(ConnectionState::Disconnected);
            }
        }
        result
    }

    async fn try_establish(&self) -> Result<()> {
        let connector = self.connector.as_ref().ok_or(CacheError::NotConnected)?;
        let target = connector.target();

        self.set_state(ConnectionState::Connecting);
        tracing::info!(endpoint = %target, "Connecting to cache");

        let connect_timeout = self.settings.connect_timeout;
        let store = tokio::time::timeout(connect_timeout, connector.connect())
            .await
            .map_err(|_| CacheError::Timeout(connect_timeout))??;
        self.set_state(ConnectionState::Connected);

        let op_timeout = self.settings.operation_timeout;
        tokio::time::timeout(op_timeout, store.ping())
            .await
            .map_err(|_| CacheError::Timeout(op_timeout))??;

        if self.closed.load(Ordering::SeqCst) {
            return Err(CacheError::NotConnected);
        }
        *self.store.write().unwrap_or_else(PoisonError::into_inner) = Some(store);
        self.set_state(ConnectionState::Ready);
        tracing::info!(endpoint = %target, "Cache ready");
        Ok(())
    }

    fn on_success(&self) {
        let transition = self.breaker().record_success();
        if transition == BreakerTransition::Closed {
            tracing::info!("Cache circuit breaker closed");
        }
    }

    fn on_breaker_failure(&self) {
        let (transition, failures, threshold) = {
            let mut breaker = self.breaker();
            let transition = breaker.record_failure(Instant::now());
            (transition, breaker.failure_count(), breaker.threshold())
        };
        if transition == BreakerTransition::Opened {
            tracing::warn!(failures, threshold, "Cache circuit breaker opened");
        }
    }

    fn on_connection_lost(inner: &Arc<Self>) {
        let was_usable = {
            let state = inner.state.read().unwrap_or_else(PoisonError::into_inner);
            state.is_usable()
        };
        if was_usable {
            inner.store.write().unwrap_or_else(PoisonError::into_inner).take();
            inner.set_state(ConnectionState::Disconnected);
            tracing::warn!(endpoint = %inner.target(), "Cache connection lost");
        }
        Self::spawn_reconnect(inner);
    }

    /// Starts the reconnect loop unless one is already running.
    fn spawn_reconnect(inner: &Arc<Self>) {
        if inner.closed.load(Ordering::SeqCst) || inner.connector.is_none() {
            return;
        }
        if inner
            .reconnecting
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        let task = tokio::spawn(Self::reconnect(inner.clone()));
        *inner
            .reconnect_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(task);
    }

    async fn reconnect(inner: Arc<Self>) {
        if inner.breaker().is_half_open(Instant::now()) {
            Self::probe(&inner).await;
        } else {
            Self::reconnect_loop(&inner).await;
        }
        inner.reconnecting.store(false, Ordering::SeqCst);
    }

    /// One connection attempt once the cooldown has passed. A failure
    /// reopens the breaker straight away.
    async fn probe(inner: &Arc<Self>) {
        tracing::info!(endpoint = %inner.target(), "Probing cache after breaker cooldown");
        match inner.establish().await {
            Ok(()) => inner.on_success(),
            Err(e) => {
                tracing::warn!(error = %e, "Cache probe failed");
                inner.open_breaker();
            }
        }
    }

    async fn reconnect_loop(inner: &Arc<Self>) {
        let policy = inner.settings.reconnect;
        let mut attempt = 0;

        while let Some(delay) = policy.delay_for(attempt) {
            tracing::info!(attempt = attempt + 1, ?delay, "Reconnecting to cache");
            tokio::time::sleep(delay).await;

            if inner.closed.load(Ordering::SeqCst) {
                return;
            }
            match inner.establish().await {
                Ok(()) => {
                    inner.on_success();
                    return;
                }
                Err(e) => {
                    tracing::warn!(attempt = attempt + 1, error = %e, "Cache reconnect failed");
                    attempt += 1;
                }
            }
        }

        tracing::error!(
            attempts = attempt,
            endpoint = %inner.target(),
            "Giving up reconnecting to cache"
        );
        inner.open_breaker();
    }

    fn open_breaker(&self) {
        if self.breaker().trip(Instant::now()) == BreakerTransition::Opened {
            tracing::warn!("Cache circuit breaker opened");
        }
    }
}

/// Decrements the pending counter when a detached task ends, even if it
/// panicked.
struct PendingGuard(Arc<ClientInner>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.0.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

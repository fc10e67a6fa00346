//! Time-limited result cache
//!
//! `TtlCache` stores `(value, inserted_at)` pairs in a pluggable
//! [`CacheBackend`] and reads time through an injectable [`Clock`], so expiry
//! can be tested without sleeping.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Default time-to-live for cached leaderboards
pub const DEFAULT_CACHE_TTL_SECS: i64 = 300;

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub inserted_at: DateTime<Utc>,
}

#[async_trait]
pub trait CacheBackend<V>: Send + Sync {
    async fn get(&self, key: &str) -> Option<CacheEntry<V>>;
    async fn put(&self, key: String, entry: CacheEntry<V>);
    async fn remove(&self, key: &str);
    async fn clear(&self);
    async fn len(&self) -> usize;
    /// Drop entries inserted before `cutoff`; returns how many were dropped.
    async fn remove_older_than(&self, cutoff: DateTime<Utc>) -> usize;
}

/// Process-local backend
pub struct InMemoryBackend<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
}

impl<V> InMemoryBackend<V> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<V> Default for InMemoryBackend<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<V: Clone + Send + Sync> CacheBackend<V> for InMemoryBackend<V> {
    async fn get(&self, key: &str) -> Option<CacheEntry<V>> {
        self.entries.read().await.get(key).cloned()
    }

    async fn put(&self, key: String, entry: CacheEntry<V>) {
        self.entries.write().await.insert(key, entry);
    }

    async fn remove(&self, key: &str) {
        self.entries.write().await.remove(key);
    }

    async fn clear(&self) {
        self.entries.write().await.clear();
    }

    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    async fn remove_older_than(&self, cutoff: DateTime<Utc>) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| e.inserted_at > cutoff);
        before - entries.len()
    }
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

pub struct TtlCache<V> {
    backend: Arc<dyn CacheBackend<V>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl<V: Clone + Send + Sync + 'static> TtlCache<V> {
    /// In-memory cache on the system clock
    pub fn new(ttl: Duration) -> Self {
        Self::with_parts(Arc::new(InMemoryBackend::new()), Arc::new(SystemClock), ttl)
    }

    pub fn with_parts(
        backend: Arc<dyn CacheBackend<V>>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
    ) -> Self {
        Self {
            backend,
            clock,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh value for `key`; stale entries are evicted on read.
    pub async fn get(&self, key: &str) -> Option<V> {
        let entry = self.backend.get(key).await?;
        if self.clock.now() - entry.inserted_at < self.ttl {
            Some(entry.value)
        } else {
            self.backend.remove(key).await;
            None
        }
    }

    /// Store `value`, pruning every expired entry first.
    pub async fn insert(&self, key: impl Into<String>, value: V) {
        self.prune_expired().await;
        let entry = CacheEntry {
            value,
            inserted_at: self.clock.now(),
        };
        self.backend.put(key.into(), entry).await;
    }

    /// Evict every expired entry; returns how many were dropped.
    pub async fn prune_expired(&self) -> usize {
        self.backend
            .remove_older_than(self.clock.now() - self.ttl)
            .await
    }

    pub async fn invalidate(&self, key: &str) {
        self.backend.remove(key).await;
    }

    pub async fn clear(&self) {
        self.backend.clear().await;
    }

    pub async fn len(&self) -> usize {
        self.backend.len().await
    }
}

impl<V: Clone + Send + Sync + 'static> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_CACHE_TTL_SECS))
    }
}

/// Key for a wallet set, independent of wallet order and case.
pub fn cache_key(wallets: &[String], max_traders: Option<usize>) -> String {
    let mut normalized: Vec<String> = wallets.iter().map(|w| w.trim().to_lowercase()).collect();
    normalized.sort();
    normalized.dedup();

    let mut hasher = Sha256::new();
    for w in &normalized {
        hasher.update(w.as_bytes());
        hasher.update(b"\n");
    }
    let limit = max_traders.map(|n| n.to_string()).unwrap_or_else(|| "all".into());
    hasher.update(limit.as_bytes());
    format!("{:x}", hasher.finalize())
}

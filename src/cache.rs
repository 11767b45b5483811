//! Key-value cache backends holding visitor records.
//!
//! - **Memory**: `DashMap` with per-entry expiry, single instance only
//! - **Redis**: shared across instances, behind the `redis` feature

#[cfg(feature = "redis")]
mod redis_cache;

#[cfg(feature = "redis")]
pub use redis_cache::RedisCache;

use crate::error::CacheError;
use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Storage capability used by the rate limiter.
///
/// `get` returns `Ok(None)` for a missing or expired key; every `Err` is a
/// real backend failure.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Backend name for logs
    fn name(&self) -> &'static str;
}

// Cache entry with expiry deadline
#[derive(Clone)]
struct CacheEntry {
    value: String,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// In-process cache. Expired entries read as missing and are dropped lazily
/// or by [`MemoryCache::purge_expired`].
#[derive(Default)]
pub struct MemoryCache {
    entries: DashMap<String, CacheEntry>,
}

impl MemoryCache {
    pub fn new() -> Self {
        debug!("Creating in-memory cache");
        Self::default()
    }

    /// Remove every expired entry, returning how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live(now));
        let purged = before.saturating_sub(self.entries.len());
        if purged > 0 {
            debug!(purged, "Purged expired cache entries");
        }
        purged
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if entry.is_live(now) {
                trace!(key = %key, "Cache hit");
                return Ok(Some(entry.value.clone()));
            }
        }
        // expired entries are reclaimed on read
        self.entries.remove_if(key, |_, entry| !entry.is_live(now));
        trace!(key = %key, "Cache miss");
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let expires_at = Instant::now()
            .checked_add(ttl)
            .ok_or_else(|| CacheError::backend(format!("ttl {ttl:?} is out of range")))?;
        self.entries
            .insert(key.to_string(), CacheEntry { value, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.remove(key);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Spawn a task that purges expired entries every `every`.
pub fn spawn_purger(
    cache: std::sync::Arc<MemoryCache>,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        debug!(interval = ?every, "Cache purger started");
        loop {
            interval.tick().await;
            cache.purge_expired();
        }
    })
}

// tests/gateway/fixtures/scripted_cache.rs

use async_trait::async_trait;
use quota_gate::{Cache, CacheError, MemoryCache};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

// One recorded call against the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheOp {
    Get(String),
    Set { key: String, value: String, ttl: Duration },
    Delete(String),
}

// Cache fake backed by MemoryCache with failure and latency injection
#[derive(Default)]
pub struct ScriptedCache {
    inner: MemoryCache,
    ops: Mutex<Vec<CacheOp>>,
    fail_get: AtomicBool,
    fail_set: AtomicBool,
    latency_ms: AtomicU64,
}

impl ScriptedCache {
    pub fn new() -> Self {
        Self::default()
    }

    // Every get fails with a connection error until cleared
    pub fn fail_gets(&self, fail: bool) {
        self.fail_get.store(fail, Ordering::Relaxed);
    }

    pub fn fail_sets(&self, fail: bool) {
        self.fail_set.store(fail, Ordering::Relaxed);
    }

    // Delay applied before every get and set
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    // Put a raw value in place without recording it
    pub async fn seed(&self, key: &str, value: &str) {
        self.inner
            .set(key, value.to_string(), Duration::from_secs(3600))
            .await
            .unwrap();
    }

    pub async fn raw(&self, key: &str) -> Option<String> {
        self.inner.get(key).await.unwrap()
    }

    pub fn ops(&self) -> Vec<CacheOp> {
        self.ops.lock().unwrap().clone()
    }

    pub fn writes(&self) -> Vec<CacheOp> {
        self.ops()
            .into_iter()
            .filter(|op| matches!(op, CacheOp::Set { .. }))
            .collect()
    }

    fn record(&self, op: CacheOp) {
        self.ops.lock().unwrap().push(op);
    }

    async fn delay(&self) {
        let ms = self.latency_ms.load(Ordering::Relaxed);
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }
}

#[async_trait]
impl Cache for ScriptedCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.record(CacheOp::Get(key.to_string()));
        self.delay().await;
        if self.fail_get.load(Ordering::Relaxed) {
            return Err(CacheError::unavailable("connection refused"));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        self.record(CacheOp::Set {
            key: key.to_string(),
            value: value.clone(),
            ttl,
        });
        self.delay().await;
        if self.fail_set.load(Ordering::Relaxed) {
            return Err(CacheError::backend("write rejected"));
        }
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.record(CacheOp::Delete(key.to_string()));
        self.inner.delete(key).await
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

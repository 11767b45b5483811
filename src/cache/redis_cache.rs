//! Redis cache backend
//!
//! Lets several gateway instances share visitor records. Requires the
//! `redis` feature.

use super::Cache;
use crate::error::CacheError;
use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::time::Duration;
use tracing::{debug, trace};

/// Redis-backed cache
pub struct RedisCache {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisCache {
    /// Connect to Redis, e.g. `redis://localhost:6379`.
    pub async fn new(url: &str) -> Result<Self, CacheError> {
        debug!(url = %url, "Connecting to Redis cache");

        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| CacheError::unavailable(e.to_string()))?;

        Ok(Self {
            conn,
            prefix: "quota-gate".to_string(),
        })
    }

    /// Connect with a custom key prefix
    pub async fn with_prefix(url: &str, prefix: impl Into<String>) -> Result<Self, CacheError> {
        let mut cache = Self::new(url).await?;
        cache.prefix = prefix.into();
        Ok(cache)
    }

    fn key(&self, suffix: &str) -> String {
        format!("{}:{}", self.prefix, suffix)
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        trace!(key = %key, "Redis GET");
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(self.key(key)).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        trace!(key = %key, ttl = ?ttl, "Redis SET EX");
        // SET EX rejects a zero expiry
        let seconds = ttl.as_secs().max(1);
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(self.key(key), value, seconds).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        trace!(key = %key, "Redis DEL");
        let mut conn = self.conn.clone();
        let _: () = conn.del(self.key(key)).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

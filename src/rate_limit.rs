//! Fixed-window admission control backed by a shared cache.
//!
//! Each client identifier maps to one [`Visitor`] record in the cache. A
//! window opens on the first request after the previous one expired and
//! stays open while requests keep arriving within `interval` of the last
//! admitted one. Inside an open window at most `limit` requests are admitted.

use crate::cache::Cache;
use crate::clock::Clock;
use crate::config::Config;
use crate::error::{CacheError, ConfigError, DecisionError};
use crate::key_lock::KeyLocks;
use crate::visitor::{self, Visitor};
use chrono::{DateTime, TimeDelta, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

/// Limits applied to every client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    /// Max admitted requests per window
    pub limit: u32,
    /// Window length
    pub interval: Duration,
    /// How long the cache keeps a record. Independent of `interval`.
    pub record_ttl: Duration,
}

impl Policy {
    pub fn new(limit: u32, interval: Duration, record_ttl: Duration) -> Result<Self, ConfigError> {
        if limit == 0 {
            return Err(ConfigError::invalid("limit must be positive"));
        }
        if interval.is_zero() {
            return Err(ConfigError::invalid("interval must be positive"));
        }
        if record_ttl.is_zero() {
            return Err(ConfigError::invalid("cache ttl must be positive"));
        }
        Ok(Self {
            limit,
            interval,
            record_ttl,
        })
    }

    /// Apply the fixed-window rule to the stored record.
    ///
    /// Expiry is checked before the limit, so an expired window always resets.
    pub fn evaluate(&self, stored: Option<Visitor>, now: DateTime<Utc>) -> Verdict {
        let Some(visitor) = stored else {
            return Verdict::Reset(Visitor::first(now));
        };

        let elapsed = now.signed_duration_since(visitor.last_seen);
        let interval = TimeDelta::from_std(self.interval).unwrap_or(TimeDelta::MAX);
        if elapsed > interval {
            return Verdict::Reset(Visitor::first(now));
        }

        if visitor.count < self.limit {
            return Verdict::Increment(visitor.admit(now));
        }

        // elapsed is negative when last_seen lies ahead of this clock
        let retry_after = interval
            .checked_sub(&elapsed)
            .and_then(|left| left.to_std().ok())
            .unwrap_or(self.interval);
        Verdict::Reject { retry_after }
    }
}

/// Outcome of [`Policy::evaluate`] before anything is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// No live window: start a new one with this record
    Reset(Visitor),
    /// Live window with quota left: store this record
    Increment(Visitor),
    /// Live window with no quota left; nothing is written
    Reject { retry_after: Duration },
}

/// Admission outcome for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Admitted {
        /// Requests admitted in the window, this one included
        count: u32,
        /// Requests still allowed in the window
        remaining: u32,
    },
    Rejected {
        /// Time until the window closes
        retry_after: Duration,
    },
}

impl Decision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Decision::Admitted { .. })
    }
}

/// The admission decision engine.
pub struct RateLimiter {
    cache: Arc<dyn Cache>,
    clock: Arc<dyn Clock>,
    policy: Policy,
    store_timeout: Duration,
    locks: KeyLocks,
}

impl RateLimiter {
    pub fn new(
        cache: Arc<dyn Cache>,
        clock: Arc<dyn Clock>,
        policy: Policy,
        store_timeout: Duration,
    ) -> Self {
        debug!(
            cache = cache.name(),
            limit = policy.limit,
            interval = ?policy.interval,
            record_ttl = ?policy.record_ttl,
            "Creating rate limiter"
        );
        Self {
            cache,
            clock,
            policy,
            store_timeout,
            locks: KeyLocks::new(),
        }
    }

    pub fn from_config(
        config: &Config,
        cache: Arc<dyn Cache>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        Ok(Self::new(
            cache,
            clock,
            config.policy()?,
            config.rate_limiter.store_timeout(),
        ))
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Decide for `identifier` at the injected clock's current time.
    pub async fn check(&self, identifier: &str) -> Result<Decision, DecisionError> {
        let now = self.clock.now();
        self.decide(identifier, now).await
    }

    /// Decide for `identifier` at `now`. The deadline for the cache calls is
    /// the configured store timeout from this call, so time spent waiting
    /// behind another request for the same key counts against it.
    pub async fn decide(
        &self,
        identifier: &str,
        now: DateTime<Utc>,
    ) -> Result<Decision, DecisionError> {
        let deadline = Instant::now() + self.store_timeout;
        self.decide_by(identifier, now, deadline).await
    }

    /// Decide for `identifier` at `now`. Cache calls that have not finished by
    /// `deadline` fail with [`CacheError::Timeout`]; nothing is retried.
    pub async fn decide_by(
        &self,
        identifier: &str,
        now: DateTime<Utc>,
        deadline: Instant,
    ) -> Result<Decision, DecisionError> {
        if identifier.is_empty() {
            return Err(DecisionError::InvalidIdentifier);
        }

        let _guard = self.locks.lock(identifier).await;

        let raw = bounded(deadline, self.cache.get(identifier))
            .await
            .inspect_err(|e| warn!(key = %identifier, error = %e, "Cache read failed"))?;

        let stored = raw
            .as_deref()
            .map(visitor::decode)
            .transpose()
            .map_err(|source| DecisionError::Decode {
                key: identifier.to_string(),
                source,
            })?;

        let visitor = match self.policy.evaluate(stored, now) {
            Verdict::Reset(visitor) => {
                trace!(key = %identifier, "Starting new window");
                visitor
            }
            Verdict::Increment(visitor) => visitor,
            Verdict::Reject { retry_after } => {
                debug!(key = %identifier, retry_after = ?retry_after, "Request rejected");
                return Ok(Decision::Rejected { retry_after });
            }
        };

        let encoded = visitor::encode(&visitor).map_err(|source| DecisionError::Encode {
            key: identifier.to_string(),
            source,
        })?;

        bounded(
            deadline,
            self.cache.set(identifier, encoded, self.policy.record_ttl),
        )
        .await
        .inspect_err(|e| warn!(key = %identifier, error = %e, "Cache write failed"))?;

        trace!(key = %identifier, count = visitor.count, "Request admitted");
        Ok(Decision::Admitted {
            count: visitor.count,
            remaining: self.policy.limit.saturating_sub(visitor.count),
        })
    }

    /// Drop the stored record for `identifier`, reopening its quota.
    pub async fn reset(&self, identifier: &str) -> Result<(), DecisionError> {
        if identifier.is_empty() {
            return Err(DecisionError::InvalidIdentifier);
        }
        debug!(key = %identifier, "Resetting rate limit");

        let deadline = Instant::now() + self.store_timeout;
        let _guard = self.locks.lock(identifier).await;
        bounded(deadline, self.cache.delete(identifier)).await?;
        Ok(())
    }
}

async fn bounded<T>(
    deadline: Instant,
    op: impl Future<Output = Result<T, CacheError>>,
) -> Result<T, CacheError> {
    tokio::time::timeout_at(deadline, op)
        .await
        .unwrap_or(Err(CacheError::Timeout))
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("cache", &self.cache.name())
            .field("policy", &self.policy)
            .field("store_timeout", &self.store_timeout)
            .finish()
    }
}

// tests/gateway/fixtures/mod.rs

pub mod scripted_cache;

use chrono::{DateTime, TimeZone, Utc};
use quota_gate::{Cache, ManualClock, Policy, RateLimiter};
use std::sync::Arc;
use std::time::Duration;

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 27, 18, 0, 0).unwrap()
}

// limit / interval seconds / ttl minutes, store timeout of one second
pub fn limiter_with(
    cache: Arc<dyn Cache>,
    clock: ManualClock,
    limit: u32,
    interval_secs: u64,
    ttl_minutes: u64,
) -> RateLimiter {
    let policy = Policy::new(
        limit,
        Duration::from_secs(interval_secs),
        Duration::from_secs(ttl_minutes * 60),
    )
    .unwrap();
    RateLimiter::new(cache, Arc::new(clock), policy, Duration::from_secs(1))
}

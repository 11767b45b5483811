//! # quota-gate
//!
//! Per-client fixed-window rate limiting over a shared key-value cache.
//!
//! A [`RateLimiter`] keeps one [`Visitor`] record per client identifier in a
//! [`Cache`]. The record is read, checked against the [`Policy`] and written
//! back inside a per-key critical section, so concurrent requests from the
//! same client cannot both take the last slot of a window.
//!
//! ```rust,no_run
//! use quota_gate::{MemoryCache, Policy, RateLimiter, SystemClock};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let policy = Policy::new(3, Duration::from_secs(30), Duration::from_secs(300))?;
//! let limiter = RateLimiter::new(
//!     Arc::new(MemoryCache::new()),
//!     Arc::new(SystemClock),
//!     policy,
//!     Duration::from_millis(500),
//! );
//!
//! if limiter.check("192.168.1.1").await?.is_admitted() {
//!     println!("Request allowed");
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod key_lock;
pub mod metrics;
pub mod rate_limit;
pub mod server;
pub mod state;
pub mod visitor;

pub use cache::{Cache, MemoryCache};
#[cfg(feature = "redis")]
pub use cache::RedisCache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Args, Config};
pub use error::{CacheError, CodecError, ConfigError, DecisionError};
pub use identity::{ClientIdentity, ForwardedOrPeer};
pub use key_lock::KeyLocks;
pub use rate_limit::{Decision, Policy, RateLimiter, Verdict};
pub use state::AppState;
pub use visitor::Visitor;

//! Error types for the gateway

use std::path::PathBuf;
use thiserror::Error;

/// Failures reported by a cache backend.
///
/// A missing key is not an error: `Cache::get` returns `Ok(None)` for it.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The operation did not finish before its deadline
    #[error("cache operation did not finish before its deadline")]
    Timeout,

    /// The backend could not be reached
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),

    /// The backend answered with a failure
    #[error("cache backend error: {0}")]
    Backend(String),

    /// Redis client error
    #[cfg(feature = "redis")]
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

impl CacheError {
    pub fn unavailable<S: Into<String>>(msg: S) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn backend<S: Into<String>>(msg: S) -> Self {
        Self::Backend(msg.into())
    }
}

/// Visitor record (de)serialization failures.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed visitor record: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("failed to encode visitor record: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Errors surfaced by an admission decision.
///
/// None of these is a rate-limit rejection; callers map them to a server error.
#[derive(Debug, Error)]
pub enum DecisionError {
    #[error("client identifier must not be empty")]
    InvalidIdentifier,

    #[error(transparent)]
    Cache(#[from] CacheError),

    /// The stored value for an existing key could not be read back
    #[error("stored visitor record for `{key}` is malformed")]
    Decode {
        key: String,
        #[source]
        source: CodecError,
    },

    #[error("visitor record for `{key}` could not be encoded")]
    Encode {
        key: String,
        #[source]
        source: CodecError,
    },
}

impl DecisionError {
    /// True when the failure came from the cache backend rather than from the data.
    pub fn is_cache_failure(&self) -> bool {
        matches!(self, Self::Cache(_))
    }
}

/// Startup configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn invalid<S: Into<String>>(msg: S) -> Self {
        Self::Invalid(msg.into())
    }
}

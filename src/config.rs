use crate::error::ConfigError;
use crate::rate_limit::Policy;
use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

// CLI argument structure
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "quota-gate")]
#[command(about = "Per-client fixed-window rate limiter backed by a shared cache")]
pub struct Args {
    // YAML config file; flags below override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    // Port to run the server on
    #[arg(short, long)]
    pub port: Option<u16>,

    // Max admitted requests per window
    #[arg(long)]
    pub limit: Option<u32>,

    // Window length in seconds
    #[arg(long)]
    pub interval: Option<u64>,

    // Cache record TTL in minutes
    #[arg(long)]
    pub cache_ttl: Option<u64>,

    // Deadline for each cache call in milliseconds
    #[arg(long)]
    pub store_timeout_ms: Option<u64>,

    // Redis URL; the in-memory cache is used when absent
    #[arg(long)]
    pub redis_url: Option<String>,

    // Header carrying the client address when behind a proxy
    #[arg(long)]
    pub forwarded_header: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub forwarded_header: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            forwarded_header: "X-Forwarded-For".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RateLimiterConfig {
    /// Max admitted requests per window
    pub limit: u32,
    /// Window length in seconds
    pub interval: u64,
    /// Deadline for each cache call in milliseconds
    pub store_timeout_ms: u64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            limit: 10,
            interval: 60,
            store_timeout_ms: 500,
        }
    }
}

impl RateLimiterConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CacheConfig {
    /// Record TTL in minutes
    pub ttl: u64,
    pub redis_url: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: 5,
            redis_url: None,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl.saturating_mul(60))
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub rate_limiter: RateLimiterConfig,
    pub cache: CacheConfig,
}

impl Config {
    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&raw)
    }

    /// Build the effective config: file (if any), then CLI overrides, then validation.
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mut config = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply(args);
        config.validate()?;
        Ok(config)
    }

    fn apply(&mut self, args: &Args) {
        if let Some(port) = args.port {
            self.server.port = port;
        }
        if let Some(header) = &args.forwarded_header {
            self.server.forwarded_header = header.clone();
        }
        if let Some(limit) = args.limit {
            self.rate_limiter.limit = limit;
        }
        if let Some(interval) = args.interval {
            self.rate_limiter.interval = interval;
        }
        if let Some(timeout) = args.store_timeout_ms {
            self.rate_limiter.store_timeout_ms = timeout;
        }
        if let Some(ttl) = args.cache_ttl {
            self.cache.ttl = ttl;
        }
        if let Some(url) = &args.redis_url {
            self.cache.redis_url = Some(url.clone());
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.policy()?;
        if self.rate_limiter.store_timeout_ms == 0 {
            return Err(ConfigError::invalid("store_timeout_ms must be positive"));
        }
        if self.server.forwarded_header.trim().is_empty() {
            return Err(ConfigError::invalid("forwarded_header must not be empty"));
        }
        axum::http::HeaderName::try_from(self.server.forwarded_header.as_str()).map_err(|_| {
            ConfigError::invalid(format!(
                "forwarded_header `{}` is not a valid header name",
                self.server.forwarded_header
            ))
        })?;
        Ok(())
    }

    pub fn policy(&self) -> Result<Policy, ConfigError> {
        Policy::new(
            self.rate_limiter.limit,
            self.rate_limiter.interval(),
            self.cache.ttl(),
        )
    }
}

use axum::http::HeaderName;
use clap::Parser; // for cli
use quota_gate::cache::{self, Cache, MemoryCache};
use quota_gate::{AppState, Args, Config, ForwardedOrPeer, RateLimiter, SystemClock, server};
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

// this is main async function with tokio
#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // parse cli arguments
    let args = Args::parse();
    if let Err(e) = run(args).await {
        error!(error = %e, "Gateway stopped");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let config = Config::load(&args)?;
    info!("Configuration loaded");

    let cache = build_cache(&config).await?;
    let limiter = RateLimiter::from_config(&config, cache, Arc::new(SystemClock))?;
    let header = HeaderName::try_from(config.server.forwarded_header.as_str())?;

    // creating shared state
    let state = Arc::new(AppState::new(
        Arc::new(limiter),
        Arc::new(ForwardedOrPeer::new(header)),
    ));

    let addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        port = config.server.port,
        "Rate limiter running on http://localhost:{}/rate-limiter",
        config.server.port
    );
    info!(
        "Rate limit: {} requests per {} seconds",
        config.rate_limiter.limit, config.rate_limiter.interval
    );
    info!("Cache TTL: {} minutes", config.cache.ttl);

    server::serve(listener, state, shutdown_signal()).await?;
    info!("Shutdown complete");
    Ok(())
}

async fn build_cache(config: &Config) -> Result<Arc<dyn Cache>, Box<dyn Error>> {
    #[cfg(feature = "redis")]
    if let Some(url) = &config.cache.redis_url {
        let redis = quota_gate::RedisCache::new(url).await?;
        info!("Using Redis cache");
        return Ok(Arc::new(redis));
    }

    #[cfg(not(feature = "redis"))]
    if config.cache.redis_url.is_some() {
        return Err("redis_url is set but the binary was built without the `redis` feature".into());
    }

    let memory = Arc::new(MemoryCache::new());
    // sweep at least once per record lifetime
    let sweep = config.cache.ttl().min(Duration::from_secs(60));
    cache::spawn_purger(Arc::clone(&memory), sweep);
    info!("Using in-memory cache");
    Ok(memory)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

//! Startup orchestration: ordered initialization of every subsystem.
//!
//! Order: load + validate configuration, build the pool and policy,
//! optionally build the rate limiter, bind the listener, spawn
//! background tasks (config watcher, signal handler, refill loop),
//! then start serving. Any failure before "start serving" is fatal —
//! the caller (`main.rs`) exits non-zero.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::config::loader::load_config;
use crate::config::watcher::{default_on_error, ConfigWatcher};
use crate::dispatcher::Dispatcher;
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::load_balancer::pool::DynamicPool;
use crate::load_balancer::round_robin::RoundRobin;
use crate::observability::metrics;
use crate::security::rate_limit::Limiter;
use crate::security::registry::SqliteClientStore;

/// Parameters derived from CLI flags — see `main.rs`.
pub struct StartupOptions {
    pub host: String,
    pub port: u16,
    pub config_path: PathBuf,
    pub rate_limit_enabled: bool,
    pub rate_limit_store: PathBuf,
    pub metrics_addr: String,
}

/// Bring the proxy up and serve until a shutdown signal arrives.
pub async fn run(opts: StartupOptions) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&opts.config_path)?;
    tracing::info!(servers = config.servers.len(), "configuration loaded");

    match opts.metrics_addr.parse::<SocketAddr>() {
        Ok(addr) => metrics::init_metrics(addr),
        Err(e) => tracing::error!(addr = %opts.metrics_addr, "failed to parse metrics address: {e}"),
    }

    let pool = Arc::new(DynamicPool::with_default_factory());
    pool.update(config.servers.clone())?;
    metrics::record_pool_size(pool.alive().map(|s| s.len()).unwrap_or(0), pool.len());

    let policy = Arc::new(RoundRobin::new());
    let shutdown = Shutdown::new();

    let limiter = if opts.rate_limit_enabled {
        tracing::info!(store = %opts.rate_limit_store.display(), "rate limiter enabled");
        let store = Arc::new(SqliteClientStore::connect(&opts.rate_limit_store).await?);
        let limiter = Arc::new(Limiter::new(config.rate_limiter, store).await?);
        limiter
            .clone()
            .spawn_refill_loop(config.rate_limiter.default_refill_rate, shutdown.subscribe());
        Some(limiter)
    } else {
        None
    };

    let dispatcher = Arc::new(Dispatcher::new(pool.clone(), policy, limiter.clone()));

    ConfigWatcher::new(opts.config_path.clone()).spawn(pool, default_on_error, shutdown.subscribe())?;
    signals::spawn(shutdown.clone());

    let bind_addr: SocketAddr = format!("{}:{}", opts.host, opts.port).parse()?;
    let listener = TcpListener::bind(bind_addr).await?;
    tracing::info!(address = %bind_addr, "listening");

    HttpServer::new(dispatcher, limiter).run(listener, shutdown.subscribe()).await?;

    tracing::info!("shutdown complete");
    Ok(())
}

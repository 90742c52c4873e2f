//! Rust reverse-proxy load balancer — entry point.

use std::path::PathBuf;

use clap::Parser;

use reverse_proxy::lifecycle::startup::{self, StartupOptions};
use reverse_proxy::observability::logging;

/// HTTP reverse-proxy load balancer.
#[derive(Parser, Debug)]
#[command(name = "reverse-proxy", version, about)]
struct Cli {
    /// Bind interface.
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Listen port.
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Path to the configuration document.
    #[arg(long, default_value = "./config/config.yaml")]
    config: PathBuf,

    /// Enable the per-client rate limiter.
    #[arg(long)]
    rlimit: bool,

    /// Path to the rate-limiter client registry.
    #[arg(long, default_value = "ratelimiter.db")]
    rlstore: PathBuf,

    /// Bind address for the Prometheus metrics exporter.
    #[arg(long, default_value = "127.0.0.1:9091")]
    metrics_addr: String,
}

#[tokio::main]
async fn main() {
    logging::init();

    let cli = Cli::parse();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "reverse-proxy starting");

    let opts = StartupOptions {
        host: cli.host,
        port: cli.port,
        config_path: cli.config,
        rate_limit_enabled: cli.rlimit,
        rate_limit_store: cli.rlstore,
        metrics_addr: cli.metrics_addr,
    };

    if let Err(e) = startup::run(opts).await {
        tracing::error!("fatal startup error: {e}");
        std::process::exit(1);
    }
}

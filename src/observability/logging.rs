//! Structured logging setup.
//!
//! One `tracing-subscriber` registry for the whole process: an
//! `EnvFilter` (default `reverse_proxy=info,tower_http=info`, override
//! via `RUST_LOG`) plus the default formatting layer.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber. Must be called once, before
/// any other subsystem logs.
pub fn init() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reverse_proxy=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

//! OS signal handling: `SIGINT`/`SIGTERM` trigger graceful shutdown.
//! `SIGHUP` is handled separately, by the Config Watcher.

use tokio::signal::unix::{signal, SignalKind};

use crate::lifecycle::Shutdown;

/// Spawn a task that waits for `SIGINT` or `SIGTERM` and triggers
/// `shutdown` exactly once.
pub fn spawn(shutdown: Shutdown) {
    tokio::spawn(async move {
        let mut sigint = signal(SignalKind::interrupt()).expect("failed to register SIGINT handler");
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to register SIGTERM handler");

        tokio::select! {
            _ = sigint.recv() => tracing::info!("received SIGINT, shutting down"),
            _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
        }

        shutdown.trigger();
    });
}

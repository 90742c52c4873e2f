//! Configuration watcher for SIGHUP-triggered hot reload.
//!
//! # Design Decisions
//! - One trigger source in the core: `SIGHUP`. Other out-of-band
//!   notification mechanisms can be wired in by sending on the same
//!   channel this watcher listens on.
//! - A failed reload is reported via `on_error` and never disarms
//!   future reloads — the previous pool state remains in force.
//! - Triggers are processed strictly sequentially on the watcher's own
//!   task; nothing here attempts to coalesce concurrent reloads itself.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::loader::{load_backend_urls, ConfigError};
use crate::error::PoolError;

/// Capability the watcher needs from the pool: apply a new URL set.
pub trait PoolUpdater: Send + Sync {
    fn update(&self, urls: Vec<String>) -> Result<(), PoolError>;
}

/// A watcher that reloads the backend list on `SIGHUP` and applies it
/// to the pool.
pub struct ConfigWatcher {
    path: PathBuf,
}

impl ConfigWatcher {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Spawn the watcher loop. `on_error` is invoked (never fatally) for
    /// a failed load or a failed pool update.
    pub fn spawn<P, F>(
        self,
        pool: Arc<P>,
        on_error: F,
        mut shutdown: broadcast::Receiver<()>,
    ) -> std::io::Result<JoinHandle<()>>
    where
        P: PoolUpdater + 'static,
        F: Fn(ConfigWatchError) + Send + Sync + 'static,
    {
        let mut hangup = signal(SignalKind::hangup())?;
        let path = self.path;

        Ok(tokio::spawn(async move {
            loop {
                tokio::select! {
                    signal = hangup.recv() => {
                        if signal.is_none() {
                            break;
                        }
                        tracing::info!("SIGHUP received, reloading backend configuration");
                        match load_backend_urls(&path) {
                            Ok(urls) => match pool.update(urls) {
                                Ok(()) => tracing::info!("pool updated"),
                                Err(e) => on_error(ConfigWatchError::Update(e)),
                            },
                            Err(e) => on_error(ConfigWatchError::Load(e)),
                        }
                    }
                    _ = shutdown.recv() => {
                        tracing::info!("config watcher received shutdown signal, exiting");
                        break;
                    }
                }
            }
        }))
    }
}

/// Error observed by a reload attempt.
#[derive(Debug)]
pub enum ConfigWatchError {
    Load(ConfigError),
    Update(PoolError),
}

impl std::fmt::Display for ConfigWatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWatchError::Load(e) => write!(f, "failed to load config: {e}"),
            ConfigWatchError::Update(e) => write!(f, "failed to update server pool: {e}"),
        }
    }
}

/// Default error callback: log and continue.
pub fn default_on_error(err: ConfigWatchError) {
    tracing::error!("{err}");
}

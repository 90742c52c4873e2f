//! Graceful shutdown orchestration.
//!
//! A single broadcast channel fans a shutdown signal out to the HTTP
//! server, the config watcher, and the rate limiter's refill loop. The
//! HTTP server itself enforces the drain deadline (5s) around its own
//! graceful-shutdown future; this handle only delivers the signal.

use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 1;

/// Handle shared by every subsystem that needs to stop on shutdown.
#[derive(Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Signal every subscriber to stop. Idempotent: calling this more
    /// than once, or with no subscribers left, is harmless.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

//! Backend Entry: a thin holder pairing a Backend Proxy with an atomic
//! liveness flag.
//!
//! # Responsibilities
//! - Hold the canonical URL that identifies this backend.
//! - Track whether the backend is currently considered alive.
//! - Delegate `Serve` to the inner proxy, flipping the liveness flag to
//!   false on any forwarding failure.
//!
//! # Design Decisions
//! - Liveness never self-heals here: the only way a dead entry returns
//!   to service is to disappear and reappear across a pool reconfigure
//!   (spec §9). There is no active probe in the core.

use std::sync::atomic::{AtomicBool, Ordering};

use axum::body::Body;
use axum::http::{Request, Response};

use crate::proxy::{BackendProxy, ProxyFailure};

/// A single backend server: its URL, liveness, and forwarder.
pub struct BackendEntry {
    url: String,
    alive: AtomicBool,
    proxy: BackendProxy,
}

impl BackendEntry {
    pub fn new(url: String, proxy: BackendProxy) -> Self {
        Self {
            url,
            alive: AtomicBool::new(true),
            proxy,
        }
    }

    /// Canonical URL identifying this backend.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    pub fn set_alive(&self, alive: bool) {
        self.alive.store(alive, Ordering::Release);
    }

    /// Forward `request` through the inner proxy. On failure, the entry
    /// is marked not-alive before the failure is handed back.
    pub async fn serve(&self, request: Request<Body>) -> Result<Response<Body>, ProxyFailure> {
        match self.proxy.forward(request).await {
            Ok(response) => Ok(response),
            Err(failure) => {
                self.set_alive(false);
                Err(failure)
            }
        }
    }
}

impl std::fmt::Debug for BackendEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendEntry")
            .field("url", &self.url)
            .field("alive", &self.is_alive())
            .finish()
    }
}

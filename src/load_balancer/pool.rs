//! Dynamic Pool: owns the set of Backend Entries and supports online
//! reconfiguration without dropping in-flight traffic.
//!
//! # Responsibilities
//! - Expose a live snapshot of alive entries to the Dispatcher.
//! - Apply `Update` atomically with respect to concurrent readers.
//!
//! # Invariants
//! - (I1) every key in the map appears in the URL set and vice versa —
//!   enforced structurally by keying directly off the map, no separate
//!   set is kept.
//! - (I2) no two entries share a URL — enforced by the map itself.
//! - (I3) concurrent readers never observe a partially-applied
//!   reconfigure: `Alive` takes the shared lock, `Update` takes the
//!   exclusive lock, and the whole replacement happens under that one
//!   lock acquisition.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::config::watcher::PoolUpdater;
use crate::error::PoolError;
use crate::load_balancer::backend::BackendEntry;
use crate::proxy::BackendProxy;

/// Constructs a `BackendEntry` for a URL. The seam `Update` uses to
/// build new entries, so tests can inject a factory that fails for
/// specific URLs without touching the pool's locking logic.
pub trait BackendFactory: Send + Sync {
    fn create(&self, url: &str) -> Result<BackendEntry, PoolError>;
}

/// Default factory: parses the URL and wraps it in a real `BackendProxy`.
pub struct DefaultBackendFactory;

impl BackendFactory for DefaultBackendFactory {
    fn create(&self, url: &str) -> Result<BackendEntry, PoolError> {
        let parsed = url::Url::parse(url).map_err(|e| PoolError::BrokenUrl(format!("{url}: {e}")))?;
        Ok(BackendEntry::new(parsed.to_string(), BackendProxy::new(parsed)))
    }
}

/// The dynamic backend pool.
pub struct DynamicPool {
    entries: RwLock<HashMap<String, Arc<BackendEntry>>>,
    factory: Box<dyn BackendFactory>,
}

impl DynamicPool {
    pub fn new(factory: Box<dyn BackendFactory>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            factory,
        }
    }

    pub fn with_default_factory() -> Self {
        Self::new(Box::new(DefaultBackendFactory))
    }

    /// Every entry whose liveness flag is currently true. `Err(NoServers)`
    /// if the resulting list would be empty.
    pub fn alive(&self) -> Result<Vec<Arc<BackendEntry>>, PoolError> {
        let entries = self.entries.read().expect("pool lock poisoned");
        let snapshot: Vec<Arc<BackendEntry>> = entries
            .values()
            .filter(|e| e.is_alive())
            .cloned()
            .collect();

        if snapshot.is_empty() {
            Err(PoolError::NoServers)
        } else {
            Ok(snapshot)
        }
    }

    /// Reconfigure the pool to exactly the given URL set. URLs already
    /// present are preserved with their current liveness — a reconfigure
    /// does not resurrect a dead entry, only explicit add/remove does.
    pub fn update(&self, urls: Vec<String>) -> Result<(), PoolError> {
        let mut entries = self.entries.write().expect("pool lock poisoned");

        let mut wanted: HashMap<String, ()> = HashMap::new();
        for raw in &urls {
            let canonical = match url::Url::parse(raw) {
                Ok(u) => u.to_string(),
                Err(_) => raw.clone(),
            };
            wanted.insert(canonical, ());
        }

        for url in wanted.keys() {
            if entries.contains_key(url) {
                continue;
            }
            let entry = self
                .factory
                .create(url)
                .map_err(|e| PoolError::UnableToUpdate(e.to_string()))?;
            entries.insert(url.clone(), Arc::new(entry));
        }

        entries.retain(|url, _| wanted.contains_key(url));

        Ok(())
    }

    /// Total number of entries tracked (alive or not), for observability.
    pub fn len(&self) -> usize {
        self.entries.read().expect("pool lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PoolUpdater for DynamicPool {
    fn update(&self, urls: Vec<String>) -> Result<(), PoolError> {
        DynamicPool::update(self, urls)
    }
}
